//! Merge recommendation policy.

use tracing::info;

use crate::data::{
    AggregatedResult, Confidence, Decision, Finding, FindingRef, PolicyRule, Rationale,
    Recommendation, Severity,
};

impl PolicyRule {
    /// Rules in evaluation order; the first that matches decides.
    pub const ORDERED: [Self; 4] = [
        Self::BlockerPresent,
        Self::ConfidentHighSeverity,
        Self::AdvisoryFindings,
        Self::NoBlockingFindings,
    ];

    /// Decision produced when this rule matches.
    pub fn decision(self) -> Decision {
        match self {
            Self::BlockerPresent => Decision::Block,
            Self::ConfidentHighSeverity => Decision::RequestChanges,
            Self::AdvisoryFindings => Decision::ApproveWithComments,
            Self::NoBlockingFindings => Decision::Approve,
        }
    }

    /// Returns `true` if `finding` triggers this rule.
    pub fn matches(self, finding: &Finding) -> bool {
        match self {
            Self::BlockerPresent => finding.severity == Severity::Blocker,
            Self::ConfidentHighSeverity => {
                finding.severity == Severity::High && finding.confidence >= Confidence::Med
            }
            Self::AdvisoryFindings => {
                (finding.severity == Severity::High && finding.confidence == Confidence::Low)
                    || finding.severity == Severity::Med
            }
            Self::NoBlockingFindings => false,
        }
    }
}

/// Derives the recommendation from aggregated findings.
///
/// Pure and order-independent: the decision depends only on the multiset
/// of severity/confidence pairs, and triggering findings are reported in
/// aggregated order.
pub fn reduce(result: &AggregatedResult) -> Recommendation {
    for rule in PolicyRule::ORDERED {
        let triggering: Vec<FindingRef> = result
            .findings
            .iter()
            .filter(|f| rule.matches(f))
            .map(FindingRef::from)
            .collect();
        if triggering.is_empty() {
            continue;
        }

        let decision = rule.decision();
        let summary = summary(rule, triggering.len());
        info!(decision = %decision, findings = triggering.len(), "Recommendation reached");
        return Recommendation {
            decision,
            rationale: Rationale {
                rule,
                summary,
                triggering,
            },
        };
    }

    info!(decision = %Decision::Approve, "Recommendation reached");
    Recommendation {
        decision: Decision::Approve,
        rationale: Rationale {
            rule: PolicyRule::NoBlockingFindings,
            summary: "no blocking or high-confidence high-severity findings".to_string(),
            triggering: Vec::new(),
        },
    }
}

fn summary(rule: PolicyRule, count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    match rule {
        PolicyRule::BlockerPresent => format!("{count} blocking finding{plural}"),
        PolicyRule::ConfidentHighSeverity => {
            format!("{count} high-severity finding{plural} with medium or high confidence")
        }
        PolicyRule::AdvisoryFindings => {
            format!("{count} medium or low-confidence high-severity finding{plural}")
        }
        PolicyRule::NoBlockingFindings => {
            "no blocking or high-confidence high-severity findings".to_string()
        }
    }
}
