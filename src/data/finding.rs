//! Finding types produced by analyzers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path used by findings that concern a whole analyzer run rather than a file.
pub const ROOT_ARTIFACT: &str = ".";

/// Severity of a finding, ordered `Nit < Low < Med < High < Blocker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic.
    Nit,
    /// Minor.
    Low,
    /// Worth addressing before or soon after merge.
    Med,
    /// Should be fixed before merge.
    High,
    /// Must not merge.
    Blocker,
}

impl Severity {
    /// All severities from most to least severe.
    pub const DESCENDING: [Self; 5] = [Self::Blocker, Self::High, Self::Med, Self::Low, Self::Nit];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocker => write!(f, "BLOCKER"),
            Self::High => write!(f, "HIGH"),
            Self::Med => write!(f, "MED"),
            Self::Low => write!(f, "LOW"),
            Self::Nit => write!(f, "NIT"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocker" | "critical" => Ok(Self::Blocker),
            "high" => Ok(Self::High),
            "med" | "medium" => Ok(Self::Med),
            "low" => Ok(Self::Low),
            "nit" => Ok(Self::Nit),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Confidence of a finding, ordered `Low < Med < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Speculative.
    Low,
    /// Likely.
    Med,
    /// Certain.
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Med => write!(f, "med"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "med" | "medium" => Ok(Self::Med),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence '{other}'")),
        }
    }
}

/// Review domain an analyzer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Module boundaries, layering, coupling.
    Architecture,
    /// Vulnerabilities and secrets.
    Security,
    /// Runtime cost and hot paths.
    Performance,
    /// Logic errors.
    Correctness,
    /// Cloud and infrastructure spend.
    Cost,
    /// Personal data handling.
    Privacy,
    /// Infrastructure definitions.
    Infra,
    /// Build and pipeline configuration.
    Ci,
    /// Accessibility of user interfaces.
    Accessibility,
    /// Logging, metrics, tracing.
    Observability,
    /// Readability and upkeep.
    Maintainability,
    /// User-facing wording.
    UxCopy,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Architecture,
        Self::Security,
        Self::Performance,
        Self::Correctness,
        Self::Cost,
        Self::Privacy,
        Self::Infra,
        Self::Ci,
        Self::Accessibility,
        Self::Observability,
        Self::Maintainability,
        Self::UxCopy,
    ];

    /// Returns the kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Correctness => "correctness",
            Self::Cost => "cost",
            Self::Privacy => "privacy",
            Self::Infra => "infra",
            Self::Ci => "ci",
            Self::Accessibility => "accessibility",
            Self::Observability => "observability",
            Self::Maintainability => "maintainability",
            Self::UxCopy => "ux-copy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// One reported issue.
///
/// Severity and confidence are plain fields rather than options, so a
/// finding can never be half-classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the analyzer that produced the finding.
    pub analyzer_id: String,
    /// Category of that analyzer.
    pub category: Category,
    /// Repository-relative path, or [`ROOT_ARTIFACT`].
    pub artifact_path: String,
    /// First line, absent for file-level findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last line, absent for file-level findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    /// Severity.
    pub severity: Severity,
    /// Confidence.
    pub confidence: Confidence,
    /// Short title.
    pub title: String,
    /// Verbatim snippet or reference backing the finding.
    pub evidence: String,
    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_hint: Option<String>,
}

impl Finding {
    /// Creates a file-level finding.
    pub fn new(
        analyzer_id: impl Into<String>,
        category: Category,
        artifact_path: impl Into<String>,
        severity: Severity,
        confidence: Confidence,
        title: impl Into<String>,
    ) -> Self {
        Self {
            analyzer_id: analyzer_id.into(),
            category,
            artifact_path: artifact_path.into(),
            line_start: None,
            line_end: None,
            severity,
            confidence,
            title: title.into(),
            evidence: String::new(),
            remediation_hint: None,
        }
    }

    /// Anchors the finding to a line span.
    #[must_use]
    pub fn at_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = Some(start.min(end));
        self.line_end = Some(start.max(end));
        self
    }

    /// Anchors the finding to one line.
    #[must_use]
    pub fn at_line(self, line: u32) -> Self {
        self.at_lines(line, line)
    }

    /// Sets the evidence.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Sets the remediation hint.
    #[must_use]
    pub fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation_hint = Some(hint.into());
        self
    }

    /// Returns `true` for findings tied to a single file.
    pub fn is_file_scoped(&self) -> bool {
        self.artifact_path != ROOT_ARTIFACT
    }

    /// Formats the location as `path`, `path:line` or `path:start-end`.
    pub fn location(&self) -> String {
        match (self.line_start, self.line_end) {
            (Some(start), Some(end)) if start != end => {
                format!("{}:{start}-{end}", self.artifact_path)
            }
            (Some(start), _) => format!("{}:{start}", self.artifact_path),
            _ => self.artifact_path.clone(),
        }
    }
}
