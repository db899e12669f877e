//! # review-core
//!
//! Orchestrates automated code review: resolves a review scope into
//! artifacts, fans the artifacts out to pluggable analyzers, and reduces
//! their findings into a single merge recommendation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use review_core::analyzer::builtin::builtin_registry;
//! use review_core::data::{Scope, ScopeRequest};
//! use review_core::git::GitRepository;
//! use review_core::ReviewRunner;
//!
//! # fn main() -> anyhow::Result<()> {
//! let runner = ReviewRunner::new(Arc::new(GitRepository::open()?), builtin_registry()?);
//! let report = runner.run_blocking(ScopeRequest::new(Scope::Diff).with_target("main..HEAD"))?;
//! println!("{}", report.recommendation.decision);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod git;
pub mod recommend;
pub mod report;
pub mod review;
pub mod scope;

pub use crate::cli::Cli;
pub use crate::error::{Result, ReviewError};
pub use crate::review::ReviewRunner;

/// The current version of review-core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
