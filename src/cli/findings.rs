use std::str::FromStr;
use std::sync::Arc;

use console::style;
use serde_json::json;

use crate::cli::commands::{FindingsArgs, SetStatusArgs};
use crate::cli::runtime::{print_warning, spawn_event_printer, spinner, Workspace};
use crate::errors::TaxopsError;
use crate::findings::FindingFilter;
use crate::models::{Domain, FindingStatus};
use crate::reporting::formatter::{format_executive_summary, format_finding_markdown, render_findings_view};
use crate::workflow::WorkflowController;

fn parse_domains(raw: Option<&str>) -> Result<Vec<Domain>, TaxopsError> {
    match raw {
        None => Ok(Vec::new()),
        Some("all") => Ok(Domain::ALL.to_vec()),
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Domain::from_str)
            .collect(),
    }
}

pub async fn handle_findings(ws: &Workspace, args: FindingsArgs) -> Result<(), TaxopsError> {
    let filter = FindingFilter::parse(&args.severity, &args.status, &args.domain)?;
    let domains = parse_domains(args.domains.as_deref())?;
    ws.require_session().await?;

    let bar = spinner("Loading findings...");
    let (tx, printer) = spawn_event_printer(bar.clone(), ws.json);
    let ctl = WorkflowController::new(&args.engagement_id, Arc::clone(&ws.backend), ws.session.clone())
        .with_event_channel(tx);

    let (generic, streams) = tokio::join!(ctl.refresh_findings(), ctl.load_domain_findings(&domains));
    let view = ctl.findings_view(&filter).await;
    drop(ctl);
    let _ = printer.await;
    bar.finish_and_clear();

    let streams = streams?;
    // Everything failed: nothing worth rendering.
    if let Err(e) = generic {
        if streams.loaded.is_empty() {
            return Err(e);
        }
        print_warning(&format!("Engagement findings unavailable: {}", e));
    }
    for (kind, error) in &streams.failed {
        print_warning(&format!("Could not load {}: {}", kind, error.message));
    }

    if args.markdown && !ws.json {
        println!("{}", format_executive_summary(&view.filtered));
        for finding in &view.findings {
            println!("{}", format_finding_markdown(finding));
        }
        return Ok(());
    }
    ws.print(&view, || render_findings_view(&view))
}

pub async fn handle_set_status(ws: &Workspace, args: SetStatusArgs) -> Result<(), TaxopsError> {
    let status = FindingStatus::from_str(&args.status)?;
    ws.require_session().await?;

    let ctl = WorkflowController::new(&args.engagement_id, Arc::clone(&ws.backend), ws.session.clone());
    ctl.update_finding_status(&args.finding_id, status).await?;

    let value = json!({ "findingId": args.finding_id, "status": status });
    ws.print(&value, || {
        format!("{} {} → {}", style("✓").green(), args.finding_id, style(status).bold())
    })
}
