//! Glob matching over repository-relative paths.

use globset::{Glob, GlobSet, GlobSetBuilder};

/// A glob that failed to parse.
#[derive(Debug)]
pub struct InvalidGlob {
    /// The offending pattern as given.
    pub pattern: String,
    /// Parse error.
    pub source: globset::Error,
}

/// Set of globs; an empty set matches every path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    set: Option<GlobSet>,
}

impl PathMatcher {
    /// Compiles `patterns`, ignoring blank entries.
    ///
    /// `dir/` matches everything below `dir`, and a pattern without glob
    /// metacharacters matches both the path itself and anything below it.
    /// `*` crosses directory separators, so `*.ts` matches `src/a.ts`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, InvalidGlob> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0;

        for raw in patterns {
            let raw = raw.as_ref();
            let pattern = raw.trim().trim_start_matches("./");
            if pattern.is_empty() {
                continue;
            }

            for expanded in expand(pattern) {
                let glob = Glob::new(&expanded).map_err(|source| InvalidGlob {
                    pattern: raw.to_string(),
                    source,
                })?;
                builder.add(glob);
                count += 1;
            }
        }

        if count == 0 {
            return Ok(Self::any());
        }

        let set = builder.build().map_err(|source| InvalidGlob {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;
        Ok(Self { set: Some(set) })
    }

    /// Matcher that accepts every path.
    pub fn any() -> Self {
        Self { set: None }
    }

    /// Returns `true` when no pattern was given.
    pub fn is_unrestricted(&self) -> bool {
        self.set.is_none()
    }

    /// Returns `true` if `path` matches at least one pattern.
    pub fn matches(&self, path: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(path),
            None => true,
        }
    }
}

fn expand(pattern: &str) -> Vec<String> {
    if let Some(dir) = pattern.strip_suffix('/') {
        return vec![format!("{dir}/**")];
    }
    if pattern.contains(['*', '?', '[', '{']) {
        vec![pattern.to_string()]
    } else {
        vec![pattern.to_string(), format!("{pattern}/**")]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_patterns_match_everything() {
        let matcher = PathMatcher::new::<&str>(&[]).unwrap();
        assert!(matcher.is_unrestricted());
        assert!(matcher.matches("anything/at/all.rs"));

        let blanks = PathMatcher::new(&["", "  "]).unwrap();
        assert!(blanks.is_unrestricted());
    }

    #[test]
    fn star_crosses_directories() {
        let matcher = PathMatcher::new(&["*.ts"]).unwrap();
        assert!(matcher.matches("a.ts"));
        assert!(matcher.matches("src/deep/b.ts"));
        assert!(!matcher.matches("src/c.rs"));
    }

    #[test]
    fn directory_patterns() {
        let slash = PathMatcher::new(&["infra/"]).unwrap();
        assert!(slash.matches("infra/main.tf"));
        assert!(!slash.matches("src/infra.rs"));

        let literal = PathMatcher::new(&["./src"]).unwrap();
        assert!(literal.matches("src"));
        assert!(literal.matches("src/lib.rs"));
        assert!(!literal.matches("srcs/lib.rs"));
    }

    #[test]
    fn any_of_several_patterns() {
        let matcher = PathMatcher::new(&["*.tf", "Dockerfile"]).unwrap();
        assert!(matcher.matches("modules/vpc.tf"));
        assert!(matcher.matches("Dockerfile"));
        assert!(!matcher.matches("README.md"));
    }

    #[test]
    fn invalid_glob_reports_pattern() {
        let err = PathMatcher::new(&["src/[abc"]).unwrap_err();
        assert_eq!(err.pattern, "src/[abc");
    }
}
