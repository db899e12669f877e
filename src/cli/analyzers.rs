//! Analyzers command: lists the built-in analyzers.

use anyhow::Result;
use clap::Parser;

use crate::analyzer::builtin::builtin_rules;

/// Analyzers command options.
#[derive(Parser)]
pub struct AnalyzersCommand {}

impl AnalyzersCommand {
    /// Prints one line per built-in analyzer.
    pub fn execute(self) -> Result<()> {
        print!("{}", listing());
        Ok(())
    }
}

fn listing() -> String {
    let mut out = String::new();
    for rule in builtin_rules() {
        let globs = if rule.globs.is_empty() {
            "all files".to_string()
        } else {
            rule.globs.join(", ")
        };
        out.push_str(&format!(
            "{:<18} {:<16} {:<8} {}\n    applies to: {globs}\n",
            rule.id,
            rule.category.as_str(),
            rule.severity.to_string(),
            rule.title
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_rule() {
        let text = listing();
        for id in ["conflict-markers", "secret-literals", "debug-leftovers", "todo-markers"] {
            assert!(text.contains(id), "missing {id}");
        }
        assert!(text.contains("applies to: all files"));
        assert!(text.contains("*.rs, *.js"));
    }
}
