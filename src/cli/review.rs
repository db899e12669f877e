//! Review command: runs the built-in analyzers over a scope.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::analyzer::builtin::builtin_registry;
use crate::config::EngineConfig;
use crate::data::{OutputFormat, Scope, ScopeRequest};
use crate::git::GitRepository;
use crate::report::render;
use crate::review::ReviewRunner;

/// Review command options.
#[derive(Parser)]
pub struct ReviewCommand {
    /// Scope to review: pr, worktree, diff, file or repo.
    #[arg(value_name = "SCOPE")]
    pub scope: Scope,

    /// PR number (e.g., 42 or #42), ref range (e.g., main..feature) or
    /// space/comma separated file list, depending on the scope.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Glob restricting the reviewed paths; may be repeated.
    #[arg(long, value_name = "GLOB")]
    pub filter: Vec<String>,

    /// Output format: text (default), json, yaml.
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Maximum number of analyzers running at once.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Default per-analyzer timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Base ref pull requests are compared against (defaults to main).
    #[arg(long, value_name = "REF")]
    pub base: Option<String>,

    /// Repository to review (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Writes the report to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ReviewCommand {
    /// Executes the review and returns the recommendation's exit code.
    pub async fn execute(self) -> Result<i32> {
        let format: OutputFormat = self.format.parse().map_err(anyhow::Error::msg)?;
        let config = self.engine_config()?;

        let repo = match &self.repo {
            Some(path) => GitRepository::open_at(path)?,
            None => GitRepository::open()?,
        };
        let runner = ReviewRunner::new(Arc::new(repo), builtin_registry()?).with_config(config);

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling remaining analyzers");
                    cancel.cancel();
                }
            })
        };

        let result = runner.run_with_cancel(self.request(), &cancel).await;
        interrupt.abort();
        let report = result?.stamped(Utc::now());

        let rendered = render(&report, format)?;
        match &self.output {
            Some(path) => fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .and_then(|()| stdout.flush())
                    .context("Failed to write report to stdout")?;
            }
        }

        Ok(report.exit_code())
    }

    /// Builds the request from the positional arguments and filters.
    pub fn request(&self) -> ScopeRequest {
        let mut request = ScopeRequest::new(self.scope).with_filters(self.filter.iter().cloned());
        request.target = self.target.clone();
        request
    }

    /// Loads settings and applies command-line overrides.
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::load()?;
        if let Some(n) = self.concurrency {
            config = config.with_max_concurrency(n);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_default_timeout(Duration::from_millis(ms));
        }
        if let Some(base) = &self.base {
            config = config.with_base_ref(base.clone());
        }
        Ok(config)
    }
}
