//! Aggregated results, recommendations and the final review report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{ArtifactRef, Category, Confidence, Finding, ScopeRequest, Severity};

/// Deduplicated, sorted findings with roll-ups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Findings sorted by severity, confidence, path, then line.
    pub findings: Vec<Finding>,
    /// Number of findings per severity (only non-zero entries).
    pub counts_by_severity: BTreeMap<Severity, usize>,
    /// Number of findings per category (only non-zero entries).
    pub counts_by_category: BTreeMap<Category, usize>,
}

impl AggregatedResult {
    /// Returns `true` when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns the count for one severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.counts_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Coarse-grained merge decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// Nothing worth holding the merge for.
    Approve,
    /// Mergeable, with comments to address.
    ApproveWithComments,
    /// Changes required before merge.
    RequestChanges,
    /// Must not merge.
    Block,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::ApproveWithComments => write!(f, "APPROVE WITH COMMENTS"),
            Self::RequestChanges => write!(f, "REQUEST CHANGES"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

/// The policy rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyRule {
    /// At least one blocker.
    BlockerPresent,
    /// A high-severity finding with medium or high confidence.
    ConfidentHighSeverity,
    /// A low-confidence high-severity finding or a medium finding.
    AdvisoryFindings,
    /// Only low or nit findings, or none.
    NoBlockingFindings,
}

/// Compact reference to a finding that triggered a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingRef {
    /// Analyzer id.
    pub analyzer_id: String,
    /// `path[:line[-end]]`.
    pub location: String,
    /// Finding title.
    pub title: String,
    /// Finding severity.
    pub severity: Severity,
    /// Finding confidence.
    pub confidence: Confidence,
}

impl From<&Finding> for FindingRef {
    fn from(finding: &Finding) -> Self {
        Self {
            analyzer_id: finding.analyzer_id.clone(),
            location: finding.location(),
            title: finding.title.clone(),
            severity: finding.severity,
            confidence: finding.confidence,
        }
    }
}

/// Structured reason for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    /// Rule that matched.
    pub rule: PolicyRule,
    /// One-line explanation.
    pub summary: String,
    /// Findings that matched the rule, in aggregated order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggering: Vec<FindingRef>,
}

/// Final merge recommendation of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The decision.
    pub decision: Decision,
    /// Why.
    pub rationale: Rationale,
}

/// How an analyzer invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Returned findings normally.
    Completed,
    /// Exceeded its timeout budget.
    TimedOut,
    /// Returned an error or panicked.
    Failed,
    /// Not run, or interrupted, because the run was cancelled.
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Bookkeeping for one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerRun {
    /// Analyzer id.
    pub analyzer_id: String,
    /// Analyzer category.
    pub category: Category,
    /// Number of artifacts handed to the analyzer.
    pub artifact_count: usize,
    /// Outcome.
    pub status: RunStatus,
    /// Findings returned (or synthesized) for this invocation.
    pub finding_count: usize,
}

/// Complete, serializable result of one review run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// Version of the crate that produced the report.
    pub version: String,
    /// Wall-clock time; left empty by the core for the caller to fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// The request that was reviewed.
    pub request: ScopeRequest,
    /// Resolved artifacts, in path order.
    pub artifacts: Vec<ArtifactRef>,
    /// Analyzer invocations, in registration order.
    pub analyzers: Vec<AnalyzerRun>,
    /// Aggregated findings.
    pub result: AggregatedResult,
    /// Merge recommendation.
    pub recommendation: Recommendation,
}

impl ReviewReport {
    /// Stamps the report with a timestamp.
    #[must_use]
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Returns `true` if any analyzer did not complete normally.
    pub fn is_degraded(&self) -> bool {
        self.analyzers
            .iter()
            .any(|run| run.status != RunStatus::Completed)
    }

    /// Process exit code for CLI callers.
    pub fn exit_code(&self) -> i32 {
        match self.recommendation.decision {
            Decision::Block => 1,
            Decision::RequestChanges => 2,
            Decision::Approve | Decision::ApproveWithComments => 0,
        }
    }
}

/// Output format for review reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!("unknown format '{other}' (expected text, json or yaml)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}
