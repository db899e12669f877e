//! Analyzer capability: descriptors, the async trait and closure adapters.

pub mod builtin;
pub mod engine;
pub mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;

use crate::data::{ArtifactRef, Category, Finding};

pub use engine::{Execution, ExecutionEngine};
pub use registry::{AnalyzerAssignment, AnalyzerRegistry};

/// Future returned by [`Analyzer::analyze`].
pub type AnalyzerFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<Finding>>> + Send + 'a>>;

/// Static description of a registered analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerDescriptor {
    /// Stable identifier, unique within a registry.
    pub id: String,
    /// Review domain the analyzer belongs to.
    pub category: Category,
    /// Globs selecting the artifacts the analyzer sees; empty means all.
    pub applicable_globs: Vec<String>,
    /// Time budget per invocation; `None` uses the engine default.
    pub timeout_budget: Option<Duration>,
}

impl AnalyzerDescriptor {
    /// Creates a descriptor that applies to every artifact.
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            applicable_globs: Vec::new(),
            timeout_budget: None,
        }
    }

    /// Restricts the analyzer to artifacts matching any of `globs`.
    #[must_use]
    pub fn with_globs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applicable_globs = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an explicit timeout budget.
    #[must_use]
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.timeout_budget = Some(budget);
        self
    }
}

impl fmt::Display for AnalyzerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.category)
    }
}

/// Input handed to one analyzer invocation.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Artifacts matching the analyzer's globs, in path order.
    pub artifacts: Arc<[ArtifactRef]>,
    /// Fires when the run is cancelled; long-running analyzers should poll it.
    pub cancel: CancellationToken,
}

impl AnalysisContext {
    /// Creates a context.
    pub fn new(artifacts: Arc<[ArtifactRef]>, cancel: CancellationToken) -> Self {
        Self { artifacts, cancel }
    }

    /// Returns `true` once the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A pluggable review check mapping artifacts to findings.
///
/// Implementations must not share mutable state with other analyzers.
/// Returned findings are re-attributed to the registered descriptor by the
/// engine, so `analyzer_id` and `category` may be left as placeholders.
pub trait Analyzer: Send + Sync {
    /// Analyzes the artifacts in `ctx`.
    fn analyze(&self, ctx: AnalysisContext) -> AnalyzerFuture<'_>;
}

/// Adapts a synchronous closure into an [`Analyzer`].
///
/// The closure runs on tokio's blocking pool so CPU-heavy checks never
/// stall the engine's other tasks.
pub struct FnAnalyzer<F> {
    func: Arc<F>,
}

impl<F> FnAnalyzer<F>
where
    F: Fn(&[ArtifactRef]) -> anyhow::Result<Vec<Finding>> + Send + Sync + 'static,
{
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

impl<F> Analyzer for FnAnalyzer<F>
where
    F: Fn(&[ArtifactRef]) -> anyhow::Result<Vec<Finding>> + Send + Sync + 'static,
{
    fn analyze(&self, ctx: AnalysisContext) -> AnalyzerFuture<'_> {
        let func = Arc::clone(&self.func);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || func(&ctx.artifacts))
                .await
                .map_err(|e| anyhow!("analyzer task aborted: {e}"))?
        })
    }
}

impl<F> fmt::Debug for FnAnalyzer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAnalyzer").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::data::{ChangeKind, Confidence, Severity};

    fn artifact(path: &str) -> ArtifactRef {
        ArtifactRef {
            path: path.to_string(),
            content_hash: String::new(),
            change_kind: ChangeKind::Unchanged,
            line_ranges: Vec::new(),
            content: Arc::from(&b"x"[..]),
        }
    }

    #[test]
    fn descriptor_builders() {
        let descriptor = AnalyzerDescriptor::new("tf-cost", Category::Cost)
            .with_globs(["*.tf", "infra/"])
            .with_timeout(Duration::from_secs(5));
        assert_eq!(descriptor.applicable_globs, vec!["*.tf", "infra/"]);
        assert_eq!(descriptor.timeout_budget, Some(Duration::from_secs(5)));
        assert_eq!(descriptor.to_string(), "tf-cost (cost)");
    }

    #[tokio::test]
    async fn fn_analyzer_sees_context_artifacts() {
        let analyzer = FnAnalyzer::new(|artifacts: &[ArtifactRef]| {
            Ok(artifacts
                .iter()
                .map(|a| {
                    Finding::new("", Category::Correctness, &a.path, Severity::Low, Confidence::Med, "seen")
                })
                .collect())
        });
        let ctx = AnalysisContext::new(
            Arc::from(vec![artifact("a.rs"), artifact("b.rs")]),
            CancellationToken::new(),
        );

        let findings = analyzer.analyze(ctx).await.unwrap();
        let paths: Vec<_> = findings.iter().map(|f| f.artifact_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }

    #[tokio::test]
    async fn fn_analyzer_propagates_errors() {
        let analyzer = FnAnalyzer::new(|_: &[ArtifactRef]| Err(anyhow!("parser exploded")));
        let ctx = AnalysisContext::new(Arc::from(Vec::new()), CancellationToken::new());
        let err = analyzer.analyze(ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "parser exploded");
    }
}
