//! Data model shared by every stage of a review run.

pub mod artifact;
pub mod finding;
pub mod report;
pub mod scope;
pub mod yaml;

pub use artifact::{coalesce_ranges, ArtifactRef, ChangeKind, ChangedFile, LineRange};
pub use finding::{Category, Confidence, Finding, Severity, ROOT_ARTIFACT};
pub use report::{
    AggregatedResult, AnalyzerRun, Decision, FindingRef, OutputFormat, PolicyRule, Rationale,
    Recommendation, ReviewReport, RunStatus,
};
pub use scope::{Scope, ScopeRequest};
pub use yaml::to_yaml;
