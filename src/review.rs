//! The review entry point: resolve, analyze, aggregate, decide, report.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregate::aggregate;
use crate::analyzer::{AnalyzerRegistry, ExecutionEngine};
use crate::config::EngineConfig;
use crate::data::{ReviewReport, ScopeRequest};
use crate::error::{Result, ReviewError};
use crate::git::RepositoryQuery;
use crate::recommend::reduce;
use crate::report::assemble;
use crate::scope::ScopeResolver;

/// Runs reviews against one repository with one analyzer set.
///
/// Holds no state between runs.
pub struct ReviewRunner {
    repo: Arc<dyn RepositoryQuery>,
    registry: AnalyzerRegistry,
    config: EngineConfig,
}

impl ReviewRunner {
    /// Creates a runner with the default configuration.
    pub fn new(repo: Arc<dyn RepositoryQuery>, registry: AnalyzerRegistry) -> Self {
        Self {
            repo,
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the analyzer registry.
    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Runs one review.
    ///
    /// Resolver errors abort the run and no report is produced. Analyzer
    /// problems never do: they show up as low-severity findings and a
    /// non-completed [`AnalyzerRun`](crate::data::AnalyzerRun) status.
    pub async fn run(&self, request: ScopeRequest) -> Result<ReviewReport> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Runs one review that stops early once `cancel` fires.
    ///
    /// Cancellation still yields a report: completed analyzers keep their
    /// findings and the rest are recorded as skipped.
    pub async fn run_with_cancel(
        &self,
        request: ScopeRequest,
        cancel: &CancellationToken,
    ) -> Result<ReviewReport> {
        info!(scope = %request.scope, target = ?request.target, "Starting review");

        let artifacts = ScopeResolver::new(self.repo.as_ref())
            .with_base_ref(self.config.base_ref.clone())
            .with_pull_request_ref(self.config.pull_request_ref.clone())
            .resolve(&request)?;

        let assignments = self.registry.applicable_analyzers(&artifacts);
        let execution = ExecutionEngine::new(self.config.clone())
            .execute(assignments, cancel)
            .await;

        let result = aggregate(execution.findings);
        let recommendation = reduce(&result);
        info!(
            artifacts = artifacts.len(),
            findings = result.findings.len(),
            decision = %recommendation.decision,
            "Review finished"
        );

        Ok(assemble(
            request,
            artifacts,
            execution.runs,
            result,
            recommendation,
        ))
    }

    /// Blocking variant of [`run`](Self::run) for synchronous callers.
    ///
    /// Must not be called from within an async runtime. Returns as soon as
    /// the review is assembled; synchronous analyzers that outlived their
    /// timeout are left to finish on their own threads.
    pub fn run_blocking(&self, request: ScopeRequest) -> Result<ReviewReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ReviewError::Runtime)?;
        let report = runtime.block_on(self.run(request));
        runtime.shutdown_background();
        report
    }
}
