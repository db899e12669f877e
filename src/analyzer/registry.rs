//! Append-only set of analyzers and their artifact partitioning.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::analyzer::{Analyzer, AnalyzerDescriptor, FnAnalyzer};
use crate::data::{ArtifactRef, Finding};
use crate::error::{Result, ReviewError};
use crate::scope::PathMatcher;

/// One analyzer paired with the artifacts it applies to.
#[derive(Clone)]
pub struct AnalyzerAssignment {
    /// The analyzer's descriptor.
    pub descriptor: AnalyzerDescriptor,
    /// The analyzer itself.
    pub analyzer: Arc<dyn Analyzer>,
    /// Matching artifacts, never empty.
    pub artifacts: Arc<[ArtifactRef]>,
}

impl fmt::Debug for AnalyzerAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerAssignment")
            .field("descriptor", &self.descriptor)
            .field("artifacts", &self.artifacts.len())
            .finish_non_exhaustive()
    }
}

struct Entry {
    descriptor: AnalyzerDescriptor,
    matcher: PathMatcher,
    analyzer: Arc<dyn Analyzer>,
}

/// Analyzers available to a review run, in registration order.
///
/// Owned by the caller and handed to the runner; there is no global
/// registry.
#[derive(Default)]
pub struct AnalyzerRegistry {
    entries: Vec<Entry>,
}

impl AnalyzerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an analyzer.
    ///
    /// Fails with [`ReviewError::DuplicateAnalyzer`] if the id is taken and
    /// with [`ReviewError::InvalidAnalyzerGlob`] if a glob does not parse.
    pub fn register<A>(&mut self, descriptor: AnalyzerDescriptor, analyzer: A) -> Result<()>
    where
        A: Analyzer + 'static,
    {
        self.register_shared(descriptor, Arc::new(analyzer))
    }

    /// Registers a synchronous analyzer function.
    pub fn register_fn<F>(&mut self, descriptor: AnalyzerDescriptor, func: F) -> Result<()>
    where
        F: Fn(&[ArtifactRef]) -> anyhow::Result<Vec<Finding>> + Send + Sync + 'static,
    {
        self.register(descriptor, FnAnalyzer::new(func))
    }

    /// Registers an analyzer that is already behind an `Arc`.
    pub fn register_shared(
        &mut self,
        descriptor: AnalyzerDescriptor,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<()> {
        if self.contains(&descriptor.id) {
            return Err(ReviewError::DuplicateAnalyzer(descriptor.id));
        }

        let matcher = PathMatcher::new(descriptor.applicable_globs.as_slice()).map_err(|e| {
            ReviewError::InvalidAnalyzerGlob {
                analyzer: descriptor.id.clone(),
                pattern: e.pattern,
                source: e.source,
            }
        })?;

        debug!(analyzer = %descriptor.id, category = %descriptor.category, "Registered analyzer");
        self.entries.push(Entry {
            descriptor,
            matcher,
            analyzer,
        });
        Ok(())
    }

    /// Returns `true` if an analyzer with `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.descriptor.id == id)
    }

    /// Number of registered analyzers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &AnalyzerDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Partitions `artifacts` per analyzer by glob match.
    ///
    /// Analyzers matching nothing are left out; artifact order is preserved
    /// within each assignment.
    pub fn applicable_analyzers(&self, artifacts: &[ArtifactRef]) -> Vec<AnalyzerAssignment> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let matching: Vec<ArtifactRef> = artifacts
                    .iter()
                    .filter(|a| entry.matcher.matches(&a.path))
                    .cloned()
                    .collect();

                if matching.is_empty() {
                    debug!(analyzer = %entry.descriptor.id, "No applicable artifacts, skipping");
                    return None;
                }

                Some(AnalyzerAssignment {
                    descriptor: entry.descriptor.clone(),
                    analyzer: Arc::clone(&entry.analyzer),
                    artifacts: Arc::from(matching),
                })
            })
            .collect()
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptors()).finish()
    }
}
