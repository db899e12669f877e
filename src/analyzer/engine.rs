//! Concurrent, fault-isolated execution of analyzer assignments.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::{AnalysisContext, AnalyzerAssignment, AnalyzerDescriptor};
use crate::config::EngineConfig;
use crate::data::{AnalyzerRun, Confidence, Finding, RunStatus, Severity, ROOT_ARTIFACT};
use crate::error::ReviewError;

/// Title of the finding recorded for an analyzer that ran out of time.
pub const TIMED_OUT_TITLE: &str = "analyzer timed out";
/// Title of the finding recorded for an analyzer that errored or panicked.
pub const FAILED_TITLE: &str = "analyzer failed";
/// Title of the finding recorded for an analyzer stopped by cancellation.
pub const SKIPPED_TITLE: &str = "skipped due to cancellation";

/// Findings and per-analyzer bookkeeping of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// All findings, real and synthesized, in assignment order.
    pub findings: Vec<Finding>,
    /// One entry per assignment, in assignment order.
    pub runs: Vec<AnalyzerRun>,
}

/// Runs analyzers concurrently under a concurrency limit.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    config: EngineConfig,
}

impl ExecutionEngine {
    /// Creates an engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every assignment to completion, timeout, failure or cancellation.
    ///
    /// Never fails: analyzer-level problems become low-severity findings so
    /// the run still produces a complete result.
    pub async fn execute(
        &self,
        assignments: Vec<AnalyzerAssignment>,
        cancel: &CancellationToken,
    ) -> Execution {
        if assignments.is_empty() {
            return Execution::default();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        info!(
            analyzers = assignments.len(),
            max_concurrency = self.config.max_concurrency,
            "Dispatching analyzers"
        );

        let mut slots = Vec::with_capacity(assignments.len());
        let mut handles = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let budget = self.config.timeout_for(&assignment.descriptor);
            slots.push((assignment.descriptor.clone(), assignment.artifacts.len()));
            handles.push(tokio::spawn(invoke(
                assignment,
                Arc::clone(&semaphore),
                cancel.clone(),
                budget,
            )));
        }

        // Each task owns its result slot; merging happens only after the join.
        let results = join_all(handles).await;

        let mut execution = Execution::default();
        for ((descriptor, artifact_count), result) in slots.into_iter().zip(results) {
            let (status, findings) = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(analyzer = %descriptor.id, error = %e, "Analyzer task panicked");
                    let err = ReviewError::AnalyzerFailure {
                        analyzer: descriptor.id.clone(),
                        message: format!("task panicked: {e}"),
                    };
                    (RunStatus::Failed, vec![failed(&descriptor, &err)])
                }
            };

            execution.runs.push(AnalyzerRun {
                analyzer_id: descriptor.id.clone(),
                category: descriptor.category,
                artifact_count,
                status,
                finding_count: findings.len(),
            });
            execution.findings.extend(findings);
        }

        debug!(findings = execution.findings.len(), "All analyzers finished");
        execution
    }
}

async fn invoke(
    assignment: AnalyzerAssignment,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    budget: Duration,
) -> (RunStatus, Vec<Finding>) {
    let AnalyzerAssignment {
        descriptor,
        analyzer,
        artifacts,
    } = assignment;

    let permit = tokio::select! {
        biased;
        () = cancel.cancelled() => return cancelled(&descriptor),
        permit = semaphore.acquire_owned() => permit,
    };
    let _permit = match permit {
        Ok(permit) => permit,
        Err(e) => {
            let err = ReviewError::AnalyzerFailure {
                analyzer: descriptor.id.clone(),
                message: format!("semaphore closed: {e}"),
            };
            return (RunStatus::Failed, vec![failed(&descriptor, &err)]);
        }
    };
    if cancel.is_cancelled() {
        return cancelled(&descriptor);
    }

    debug!(
        analyzer = %descriptor.id,
        artifacts = artifacts.len(),
        budget = ?budget,
        "Running analyzer"
    );
    let ctx = AnalysisContext::new(artifacts, cancel.clone());
    let work = tokio::time::timeout(budget, analyzer.analyze(ctx));

    tokio::select! {
        biased;
        result = work => match result {
            Ok(Ok(findings)) => {
                let findings: Vec<Finding> = findings
                    .into_iter()
                    .map(|f| attribute(f, &descriptor))
                    .collect();
                info!(analyzer = %descriptor.id, findings = findings.len(), "Analyzer completed");
                (RunStatus::Completed, findings)
            }
            Ok(Err(e)) => {
                let err = ReviewError::AnalyzerFailure {
                    analyzer: descriptor.id.clone(),
                    message: format!("{e:#}"),
                };
                warn!(analyzer = %descriptor.id, error = %err, "Analyzer failed");
                (RunStatus::Failed, vec![failed(&descriptor, &err)])
            }
            Err(_) => {
                let err = ReviewError::AnalyzerTimeout {
                    analyzer: descriptor.id.clone(),
                    budget,
                };
                warn!(analyzer = %descriptor.id, budget = ?budget, "Analyzer timed out");
                (
                    RunStatus::TimedOut,
                    vec![synthesized(&descriptor, TIMED_OUT_TITLE, err.to_string())],
                )
            }
        },
        () = cancel.cancelled() => cancelled(&descriptor),
    }
}

/// Re-attributes a returned finding to the descriptor that produced it.
fn attribute(mut finding: Finding, descriptor: &AnalyzerDescriptor) -> Finding {
    finding.analyzer_id.clone_from(&descriptor.id);
    finding.category = descriptor.category;
    if finding.artifact_path.is_empty() {
        finding.artifact_path = ROOT_ARTIFACT.to_string();
    }
    finding
}

fn failed(descriptor: &AnalyzerDescriptor, err: &ReviewError) -> Finding {
    synthesized(descriptor, FAILED_TITLE, err.to_string())
}

fn cancelled(descriptor: &AnalyzerDescriptor) -> (RunStatus, Vec<Finding>) {
    info!(analyzer = %descriptor.id, "Analyzer skipped due to cancellation");
    let evidence = format!(
        "Analyzer {:?} did not finish because the review was cancelled",
        descriptor.id
    );
    (
        RunStatus::Cancelled,
        vec![synthesized(descriptor, SKIPPED_TITLE, evidence)],
    )
}

fn synthesized(descriptor: &AnalyzerDescriptor, title: &str, evidence: String) -> Finding {
    Finding::new(
        descriptor.id.clone(),
        descriptor.category,
        ROOT_ARTIFACT,
        Severity::Low,
        Confidence::Low,
        title,
    )
    .with_evidence(evidence)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use crate::analyzer::{Analyzer, AnalyzerFuture, AnalyzerRegistry};
    use crate::data::{ArtifactRef, Category, ChangeKind};

    fn artifacts() -> Vec<ArtifactRef> {
        ["a.rs", "b.rs"]
            .into_iter()
            .map(|path| ArtifactRef {
                path: path.to_string(),
                content_hash: String::new(),
                change_kind: ChangeKind::Modified,
                line_ranges: Vec::new(),
                content: Arc::from(&b"fn main() {}\n"[..]),
            })
            .collect()
    }

    fn engine(max_concurrency: usize) -> ExecutionEngine {
        ExecutionEngine::new(
            EngineConfig::default()
                .with_max_concurrency(max_concurrency)
                .with_default_timeout(Duration::from_secs(10)),
        )
    }

    /// Sleeps for a long time unless cancelled.
    struct Sleeper;

    impl Analyzer for Sleeper {
        fn analyze(&self, _ctx: AnalysisContext) -> AnalyzerFuture<'_> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            })
        }
    }

    /// Reports one finding and then cancels the whole run.
    struct CancelAfterReport;

    impl Analyzer for CancelAfterReport {
        fn analyze(&self, ctx: AnalysisContext) -> AnalyzerFuture<'_> {
            Box::pin(async move {
                let finding = Finding::new(
                    "",
                    Category::Correctness,
                    &ctx.artifacts[0].path,
                    Severity::Med,
                    Confidence::High,
                    "real",
                );
                ctx.cancel.cancel();
                Ok(vec![finding])
            })
        }
    }

    /// Tracks how many invocations overlap.
    struct Gauge {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Analyzer for Gauge {
        fn analyze(&self, _ctx: AnalysisContext) -> AnalyzerFuture<'_> {
            Box::pin(async move {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
        }
    }

    fn statuses(execution: &Execution) -> Vec<(&str, RunStatus)> {
        execution
            .runs
            .iter()
            .map(|r| (r.analyzer_id.as_str(), r.status))
            .collect()
    }

    #[tokio::test]
    async fn findings_are_attributed_to_the_descriptor() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register_fn(AnalyzerDescriptor::new("sec", Category::Security), |a: &[ArtifactRef]| {
                Ok(vec![Finding::new(
                    "spoofed",
                    Category::Cost,
                    &a[0].path,
                    Severity::High,
                    Confidence::High,
                    "hardcoded key",
                )
                .at_line(3)])
            })
            .unwrap();

        let execution = engine(2)
            .execute(registry.applicable_analyzers(&artifacts()), &CancellationToken::new())
            .await;

        assert_eq!(execution.findings.len(), 1);
        assert_eq!(execution.findings[0].analyzer_id, "sec");
        assert_eq!(execution.findings[0].category, Category::Security);
        assert_eq!(execution.runs[0].artifact_count, 2);
        assert_eq!(execution.runs[0].status, RunStatus::Completed);
        assert_eq!(execution.runs[0].finding_count, 1);
    }

    #[tokio::test]
    async fn failure_is_isolated() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register_fn(AnalyzerDescriptor::new("broken", Category::Performance), |_: &[ArtifactRef]| {
                Err(anyhow!("index out of date").context("Failed to load profile"))
            })
            .unwrap();
        registry
            .register_fn(AnalyzerDescriptor::new("fine", Category::Correctness), |a: &[ArtifactRef]| {
                Ok(vec![Finding::new("", Category::Correctness, &a[1].path, Severity::Med, Confidence::Med, "ok")])
            })
            .unwrap();

        let execution = engine(2)
            .execute(registry.applicable_analyzers(&artifacts()), &CancellationToken::new())
            .await;

        assert_eq!(
            statuses(&execution),
            vec![("broken", RunStatus::Failed), ("fine", RunStatus::Completed)]
        );
        let synthesized = &execution.findings[0];
        assert_eq!(synthesized.title, FAILED_TITLE);
        assert_eq!(synthesized.severity, Severity::Low);
        assert_eq!(synthesized.confidence, Confidence::Low);
        assert_eq!(synthesized.category, Category::Performance);
        assert_eq!(synthesized.artifact_path, ROOT_ARTIFACT);
        assert!(synthesized.evidence.contains("Failed to load profile: index out of date"));
        assert_eq!(execution.findings[1].title, "ok");
    }

    #[tokio::test]
    async fn panic_is_isolated() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register_fn(AnalyzerDescriptor::new("panicky", Category::Privacy), |_: &[ArtifactRef]| {
                panic!("unexpected input")
            })
            .unwrap();

        let execution = engine(1)
            .execute(registry.applicable_analyzers(&artifacts()), &CancellationToken::new())
            .await;

        assert_eq!(statuses(&execution), vec![("panicky", RunStatus::Failed)]);
        assert_eq!(execution.findings[0].title, FAILED_TITLE);
    }

    #[tokio::test]
    async fn timeout_is_isolated() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(
                AnalyzerDescriptor::new("slow", Category::Architecture)
                    .with_timeout(Duration::from_millis(50)),
                Sleeper,
            )
            .unwrap();

        let execution = engine(1)
            .execute(registry.applicable_analyzers(&artifacts()), &CancellationToken::new())
            .await;

        assert_eq!(statuses(&execution), vec![("slow", RunStatus::TimedOut)]);
        let finding = &execution.findings[0];
        assert_eq!(finding.title, TIMED_OUT_TITLE);
        assert_eq!(finding.category, Category::Architecture);
        assert!(finding.evidence.contains("50ms"));
    }

    #[tokio::test]
    async fn cancellation_keeps_completed_results() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(AnalyzerDescriptor::new("first", Category::Correctness), CancelAfterReport)
            .unwrap();
        registry
            .register(AnalyzerDescriptor::new("second", Category::Infra), Sleeper)
            .unwrap();
        registry
            .register(AnalyzerDescriptor::new("third", Category::Ci), Sleeper)
            .unwrap();

        let cancel = CancellationToken::new();
        let execution = engine(3)
            .execute(registry.applicable_analyzers(&artifacts()), &cancel)
            .await;

        assert!(cancel.is_cancelled());
        assert_eq!(
            statuses(&execution),
            vec![
                ("first", RunStatus::Completed),
                ("second", RunStatus::Cancelled),
                ("third", RunStatus::Cancelled),
            ]
        );
        let titles: Vec<_> = execution.findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["real", SKIPPED_TITLE, SKIPPED_TITLE]);
    }

    #[tokio::test]
    async fn pre_cancelled_run_skips_everything() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(AnalyzerDescriptor::new("one", Category::Cost), Sleeper)
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let execution = engine(1)
            .execute(registry.applicable_analyzers(&artifacts()), &cancel)
            .await;

        assert_eq!(statuses(&execution), vec![("one", RunStatus::Cancelled)]);
    }

    #[tokio::test]
    async fn concurrency_limit_is_respected() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = AnalyzerRegistry::new();
        for i in 0..6 {
            registry
                .register(
                    AnalyzerDescriptor::new(format!("gauge-{i}"), Category::Observability),
                    Gauge {
                        current: Arc::clone(&current),
                        peak: Arc::clone(&peak),
                    },
                )
                .unwrap();
        }

        let execution = engine(2)
            .execute(registry.applicable_analyzers(&artifacts()), &CancellationToken::new())
            .await;

        assert_eq!(execution.runs.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(execution
            .runs
            .iter()
            .all(|r| r.status == RunStatus::Completed));
    }

    #[tokio::test]
    async fn nothing_to_run() {
        let execution = engine(4).execute(Vec::new(), &CancellationToken::new()).await;
        assert_eq!(execution, Execution::default());
    }
}
