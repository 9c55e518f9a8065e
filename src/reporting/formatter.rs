use console::style;

use crate::findings::{FindingsAggregate, FindingsView};
use crate::models::{
    Client, DataUpload, Engagement, Finding, ModuleStatus, ReportSummary, SeverityRank, UploadStatus,
};
use crate::workflow::{ModuleView, WorkflowEvent};

pub fn format_finding_markdown(finding: &Finding) -> String {
    let mut out = format!(
        "### {} ({})\n\n**Severity:** {}\n**Domain:** {}\n**Status:** {}\n\n{}\n",
        finding.code,
        finding.id,
        finding.severity,
        finding.domain,
        finding.status.map(|s| s.as_str()).unwrap_or("open"),
        finding.message,
    );
    if let Some(tx) = &finding.transaction_id {
        out.push_str(&format!("\n**Transaction:** {}\n", tx));
    }
    if let Some(account) = &finding.account_code {
        out.push_str(&format!("**Account:** {}\n", account));
    }
    out
}

pub fn format_executive_summary(aggregate: &FindingsAggregate) -> String {
    let mut out = String::from("## Executive Summary\n\n| Severity | Count |\n|---|---|\n");
    for rank in SeverityRank::DESCENDING {
        let count = aggregate.by_severity.get(&rank).copied().unwrap_or(0);
        out.push_str(&format!("| {} | {} |\n", capitalize(rank.as_str()), count));
    }
    out.push_str(&format!("| **Total** | **{}** |\n", aggregate.total));
    out.push_str(&format!("\nOpen findings: {}. Risk score: {}/100.\n", aggregate.open, aggregate.score));

    if !aggregate.domains.is_empty() {
        out.push_str("\n| Domain | Total | High | Medium | Low | Score |\n|---|---|---|---|---|---|\n");
        for d in &aggregate.domains {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                d.domain, d.total, d.high, d.medium, d.low, d.score
            ));
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_severity_badge(rank: SeverityRank) -> String {
    match rank {
        SeverityRank::Critical => style(" CRITICAL ").on_red().white().bold().to_string(),
        SeverityRank::High => style(" HIGH ").red().bold().to_string(),
        SeverityRank::Medium => style(" MEDIUM ").yellow().bold().to_string(),
        SeverityRank::Low => style(" LOW ").blue().to_string(),
        SeverityRank::Warning => style(" WARNING ").magenta().to_string(),
        SeverityRank::Info => style(" INFO ").dim().to_string(),
    }
}

pub fn render_finding_line(finding: &Finding) -> String {
    format!(
        "  {} {} [{}] {} {}",
        render_severity_badge(finding.rank()),
        style(&finding.code).white().bold(),
        style(&finding.domain).dim(),
        finding.message,
        style(format!("({})", finding.status.map(|s| s.as_str()).unwrap_or("open"))).dim(),
    )
}

pub fn render_findings_view(view: &FindingsView) -> String {
    let mut lines = Vec::new();
    if view.stale {
        lines.push(format!(
            "{} New data was ingested since these findings were loaded; re-run modules to refresh.",
            style("⚠").yellow()
        ));
    }
    if view.is_empty() {
        let msg = if view.loaded == 0 {
            "No findings yet."
        } else {
            "No findings match the current filters."
        };
        lines.push(format!("  {}", style(msg).dim()));
    } else {
        lines.extend(view.findings.iter().map(render_finding_line));
    }
    lines.push(String::new());
    lines.push(format!(
        "  Showing {} of {} | open {} | high {} | medium {} | low {} | risk {}/100",
        view.findings.len(),
        view.loaded,
        view.filtered.open,
        style(view.filtered.high).red(),
        style(view.filtered.medium).yellow(),
        style(view.filtered.low).blue(),
        view.overall.score,
    ));
    if !view.domain_options.is_empty() {
        lines.push(format!("  Domains: {}", style(view.domain_options.join(", ")).dim()));
    }
    lines.join("\n")
}

pub fn render_module_row(module: &ModuleView) -> String {
    let status = match module.status {
        ModuleStatus::Completed => style(module.label).green().to_string(),
        ModuleStatus::Running => style(module.label).cyan().to_string(),
        ModuleStatus::Error => style(module.label).red().to_string(),
        ModuleStatus::Blocked => style(module.label).yellow().to_string(),
        ModuleStatus::NotStarted => style(module.label).dim().to_string(),
    };
    let run = if module.run_enabled {
        style("run").green().to_string()
    } else {
        style("-").dim().to_string()
    };
    format!(
        "  {:<24} {:<28} {:>3}%  {:<14} {}",
        module.id,
        module.name,
        module.completion,
        status,
        run,
    )
}

pub fn render_upload_row(upload: &DataUpload) -> String {
    let marker = match upload.status {
        UploadStatus::Ingested => style("✓").green(),
        UploadStatus::Uploaded => style("•").yellow(),
        UploadStatus::NotUploaded => style("○").dim(),
    };
    format!(
        "  {} {:<28} {:<10} {}",
        marker,
        upload.name,
        upload.upload_type,
        style(&upload.updated_at).dim(),
    )
}

pub fn render_engagement_header(engagement: &Engagement) -> String {
    format!(
        "{} {} {} | {:?} | {}% | risk {:?}\n  readiness {}% | modules run {} | open findings {} | high {}",
        style("▶").green().bold(),
        style(&engagement.id).cyan().bold(),
        engagement.period,
        engagement.status,
        engagement.progress,
        engagement.risk,
        engagement.summary.data_readiness,
        engagement.summary.modules_run,
        engagement.summary.findings_open,
        engagement.summary.high_severity,
    )
}

pub fn render_client_row(client: &Client) -> String {
    format!(
        "  {:<16} {:<32} {:<16} {:?}",
        client.id, client.name, client.industry, client.risk
    )
}

pub fn render_report_summary(summary: &ReportSummary) -> String {
    let mut lines = vec![format!(
        "Report {} | draft {} | last generated {}",
        style(&summary.id).cyan(),
        if summary.draft_available {
            style("available").green().to_string()
        } else {
            style("not generated").dim().to_string()
        },
        summary.last_generated_at.as_deref().unwrap_or("never"),
    )];
    for export in &summary.exports {
        lines.push(format!("  {} generated {}", export.export_type, style(&export.generated_at).dim()));
    }
    lines.join("\n")
}

/// Render a controller event as one styled line, or `None` for events the
/// terminal does not show.
pub fn render_event(event: &WorkflowEvent) -> Option<String> {
    match event {
        WorkflowEvent::Failed { action, message, retryable, .. } => Some(format!(
            "  {} {} ({}{})",
            style("✗").red(),
            style(action).red(),
            style(message).red().dim(),
            if *retryable { ", retry possible" } else { "" },
        )),
        WorkflowEvent::RunAccepted { module_id, run_id } => Some(format!(
            "  {} {} accepted as run {}",
            style("⏳").yellow(),
            style(module_id).yellow(),
            style(run_id).dim(),
        )),
        WorkflowEvent::ModuleReconciled { module_id, status } => Some(format!(
            "  {} {} is now {}",
            style("✓").green(),
            style(module_id).green(),
            status.map(|s| s.label()).unwrap_or("unknown"),
        )),
        WorkflowEvent::FindingsStale => Some(format!(
            "  {} Findings predate the latest ingest",
            style("⚠").yellow()
        )),
        WorkflowEvent::FindingStatusChanged { finding_id, status } => Some(format!(
            "  {} {} → {}",
            style("✓").green(),
            finding_id,
            status,
        )),
        WorkflowEvent::SummaryDrift(drift) => Some(format!(
            "  {} Engagement summary disagrees with loaded findings: open {} vs {}, high {} vs {}",
            style("⚠").yellow(),
            drift.server_open,
            drift.computed_open,
            drift.server_high,
            drift.computed_high,
        )),
        WorkflowEvent::ExportReady { export, .. } => Some(format!(
            "  {} {} export ready",
            style("✓").green(),
            export,
        )),
        WorkflowEvent::Started { .. } | WorkflowEvent::Finished { .. } => None,
    }
}
