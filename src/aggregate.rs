//! Finding deduplication, ordering and roll-up counts.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::data::{AggregatedResult, Finding};

/// Identity of a finding for deduplication purposes.
type DedupKey = (String, String, Option<u32>, Option<u32>, String);

fn key(finding: &Finding) -> DedupKey {
    (
        finding.analyzer_id.clone(),
        finding.artifact_path.clone(),
        finding.line_start,
        finding.line_end,
        finding.title.clone(),
    )
}

/// Deduplicates, sorts and counts `findings`.
///
/// Duplicates share analyzer, path, line span and title; the survivor is
/// the one with the higher severity, then higher confidence, then the one
/// seen first. Only which of two fully tied duplicates survives depends on
/// input order, and aggregating an aggregated list returns it unchanged.
pub fn aggregate(findings: Vec<Finding>) -> AggregatedResult {
    let input = findings.len();
    let mut slots: HashMap<DedupKey, usize> = HashMap::with_capacity(findings.len());
    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());

    for finding in findings {
        match slots.get(&key(&finding)) {
            Some(&idx) => {
                let current = &kept[idx];
                if (finding.severity, finding.confidence) > (current.severity, current.confidence)
                {
                    kept[idx] = finding;
                }
            }
            None => {
                slots.insert(key(&finding), kept.len());
                kept.push(finding);
            }
        }
    }

    kept.sort_by(compare);

    let mut counts_by_severity = BTreeMap::new();
    let mut counts_by_category = BTreeMap::new();
    for finding in &kept {
        *counts_by_severity.entry(finding.severity).or_insert(0) += 1;
        *counts_by_category.entry(finding.category).or_insert(0) += 1;
    }

    debug!(input, kept = kept.len(), "Aggregated findings");
    AggregatedResult {
        findings: kept,
        counts_by_severity,
        counts_by_category,
    }
}

/// Severity desc, confidence desc, path asc, line asc with file-level last.
///
/// Remaining ties fall through every other field so the order is total.
fn compare(a: &Finding, b: &Finding) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.confidence.cmp(&a.confidence))
        .then_with(|| a.artifact_path.cmp(&b.artifact_path))
        .then_with(|| lines_last(a.line_start, b.line_start))
        .then_with(|| lines_last(a.line_end, b.line_end))
        .then_with(|| a.analyzer_id.cmp(&b.analyzer_id))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.evidence.cmp(&b.evidence))
        .then_with(|| a.remediation_hint.cmp(&b.remediation_hint))
}

fn lines_last(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
