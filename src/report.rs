//! Report assembly and rendering.

use anyhow::{Context, Result};

use crate::data::{
    to_yaml, AggregatedResult, AnalyzerRun, ArtifactRef, OutputFormat, Recommendation,
    ReviewReport, RunStatus, ScopeRequest, Severity,
};
use crate::git::short_hash;

/// Combines the outputs of one run into a [`ReviewReport`].
///
/// Performs no I/O and leaves `generated_at` empty for the caller.
pub fn assemble(
    request: ScopeRequest,
    artifacts: Vec<ArtifactRef>,
    analyzers: Vec<AnalyzerRun>,
    result: AggregatedResult,
    recommendation: Recommendation,
) -> ReviewReport {
    ReviewReport {
        version: crate::VERSION.to_string(),
        generated_at: None,
        request,
        artifacts,
        analyzers,
        result,
        recommendation,
    }
}

/// Serializes or renders `report` in the requested format.
pub fn render(report: &ReviewReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report as JSON")
        }
        OutputFormat::Yaml => to_yaml(report).context("Failed to serialize report as YAML"),
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Blocker => "⛔",
        Severity::High => "❌",
        Severity::Med => "⚠️ ",
        Severity::Low => "ℹ️ ",
        Severity::Nit => "·",
    }
}

/// Renders a human-readable summary.
pub fn render_text(report: &ReviewReport) -> String {
    let mut out = String::new();
    let request = &report.request;

    out.push_str(&format!("🔍 Review of {} scope", request.scope));
    if let Some(target) = request.target.as_deref().filter(|t| !t.is_empty()) {
        out.push_str(&format!(" {target}"));
    }
    out.push('\n');
    if !request.path_filters.is_empty() {
        out.push_str(&format!("   filters: {}\n", request.path_filters.join(", ")));
    }
    out.push_str(&"=".repeat(50));
    out.push('\n');

    out.push_str(&format!("\n📁 {} artifact(s)\n", report.artifacts.len()));
    for artifact in &report.artifacts {
        out.push_str(&format!(
            "   {} {} ({})\n",
            artifact.change_kind.status_code(),
            artifact.path,
            short_hash(&artifact.content_hash)
        ));
    }

    if !report.analyzers.is_empty() {
        out.push_str(&format!("\n🧪 {} analyzer(s)\n", report.analyzers.len()));
        for run in &report.analyzers {
            let marker = match run.status {
                RunStatus::Completed => "✅",
                RunStatus::TimedOut => "⏱️ ",
                RunStatus::Failed => "💥",
                RunStatus::Cancelled => "🚫",
            };
            out.push_str(&format!(
                "   {marker} {} [{}] {} artifact(s), {} finding(s), {}\n",
                run.analyzer_id, run.category, run.artifact_count, run.finding_count, run.status
            ));
        }
    }

    if report.result.is_empty() {
        out.push_str("\n✨ No findings\n");
    } else {
        out.push_str(&format!("\n📋 {} finding(s)\n", report.result.findings.len()));
        for finding in &report.result.findings {
            out.push_str(&format!(
                "\n{} {} [{}/{}] {}\n",
                severity_icon(finding.severity),
                finding.severity,
                finding.confidence,
                finding.category,
                finding.title
            ));
            out.push_str(&format!(
                "   at {} ({})\n",
                finding.location(),
                finding.analyzer_id
            ));
            for line in finding.evidence.lines() {
                out.push_str(&format!("   │ {line}\n"));
            }
            if let Some(hint) = &finding.remediation_hint {
                out.push_str(&format!("   💡 {hint}\n"));
            }
        }
    }

    out.push('\n');
    out.push_str(&"=".repeat(50));
    out.push('\n');

    let counts: Vec<String> = Severity::DESCENDING
        .iter()
        .filter_map(|s| {
            let n = report.result.count(*s);
            (n > 0).then(|| format!("{n} {s}"))
        })
        .collect();
    if !counts.is_empty() {
        out.push_str(&format!("Findings: {}\n", counts.join(", ")));
    }
    out.push_str(&format!(
        "Recommendation: {} ({})\n",
        report.recommendation.decision, report.recommendation.rationale.summary
    ));
    if report.is_degraded() {
        out.push_str("⚠️  Some analyzers did not complete; results may be partial\n");
    }

    out
}
