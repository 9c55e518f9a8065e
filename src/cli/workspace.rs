use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use console::style;
use serde_json::json;
use tracing::info;

use crate::cli::commands::{EngagementArgs, EngagementsArgs, RunArgs, UploadArgs};
use crate::cli::runtime::{print_warning, spawn_event_printer, spinner, Workspace};
use crate::errors::TaxopsError;
use crate::models::{DocumentFields, Domain, UploadFile, UploadKind};
use crate::reporting::formatter::{
    render_client_row, render_engagement_header, render_module_row, render_upload_row,
};
use crate::workflow::WorkflowController;

fn controller(ws: &Workspace, engagement_id: &str) -> WorkflowController {
    WorkflowController::new(engagement_id, Arc::clone(&ws.backend), ws.session.clone())
}

pub async fn handle_firm(ws: &Workspace) -> Result<(), TaxopsError> {
    let token = ws.session_token().await?;
    let summary = ws.observed(&token, ws.backend.firm_summary(Some(&token))).await?;
    ws.print(&summary, || {
        format!(
            "Clients {} | active engagements {} | high severity findings {} | upcoming reports {}",
            summary.total_clients,
            summary.active_engagements,
            style(summary.high_severity_findings).red(),
            summary.upcoming_reports,
        )
    })
}

pub async fn handle_clients(ws: &Workspace) -> Result<(), TaxopsError> {
    let token = ws.session_token().await?;
    let clients = ws.observed(&token, ws.backend.list_clients(Some(&token))).await?;
    ws.print(&clients, || {
        if clients.is_empty() {
            return "No clients yet.".to_string();
        }
        clients.iter().map(render_client_row).collect::<Vec<_>>().join("\n")
    })
}

pub async fn handle_engagements(ws: &Workspace, args: EngagementsArgs) -> Result<(), TaxopsError> {
    let token = ws.session_token().await?;
    let engagements = ws
        .observed(&token, ws.backend.list_engagements(Some(&token), &args.client_id))
        .await?;
    ws.print(&engagements, || {
        if engagements.is_empty() {
            return format!("No engagements for {}.", args.client_id);
        }
        engagements.iter().map(render_engagement_header).collect::<Vec<_>>().join("\n")
    })
}

pub async fn handle_workflow(ws: &Workspace, args: EngagementArgs) -> Result<(), TaxopsError> {
    ws.require_session().await?;
    let bar = spinner(format!("Loading {}...", args.engagement_id));
    let (tx, printer) = spawn_event_printer(bar.clone(), ws.json);
    let ctl = controller(ws, &args.engagement_id).with_event_channel(tx);

    let report = ctl.load_workflow().await;
    let state = ctl.snapshot().await;
    let modules = ctl.module_views().await;
    drop(ctl);
    let _ = printer.await;
    bar.finish_and_clear();
    let report = report?;

    if ws.json {
        return ws.print(&json!({ "state": state, "modules": modules }), String::new);
    }
    if let Some(engagement) = &state.engagement.data {
        println!("{}", render_engagement_header(engagement));
    }
    println!("\n{}", style("Uploads").bold());
    for upload in state.uploads.data.iter().flatten() {
        println!("{}", render_upload_row(upload));
    }
    println!("\n{}", style("Modules").bold());
    for module in &modules {
        println!("{}", render_module_row(module));
    }
    for (kind, error) in &report.failed {
        print_warning(&format!("Could not load {}: {}", kind, error.message));
    }
    Ok(())
}

pub async fn handle_run(ws: &Workspace, args: RunArgs) -> Result<(), TaxopsError> {
    ws.require_session().await?;
    let bar = spinner(format!("Running {}...", args.module_id));
    let (tx, printer) = spawn_event_printer(bar.clone(), ws.json);
    let ctl = controller(ws, &args.engagement_id).with_event_channel(tx);

    // Gating needs the authoritative module list first.
    let outcome = match ctl.refresh_modules().await {
        Ok(()) => ctl.run_module(&args.module_id).await,
        Err(e) => Err(e),
    };
    drop(ctl);
    let _ = printer.await;
    bar.finish_and_clear();
    let outcome = outcome?;

    info!(module_id = %args.module_id, run_id = %outcome.run_id, "Run finished");
    let status = outcome.module.as_ref().map(|m| m.status.label()).unwrap_or("unknown");
    let value = json!({
        "runId": outcome.run_id,
        "module": outcome.module,
        "reconcileError": outcome.reconcile_error,
    });
    ws.print(&value, || {
        let mut text = format!(
            "{} {} run {} accepted; module is {}",
            style("✓").green(),
            args.module_id,
            style(&outcome.run_id).dim(),
            style(status).bold(),
        );
        if let Some(err) = &outcome.reconcile_error {
            text.push_str(&format!("\n  module state could not be refreshed: {}", err.message));
        }
        text
    })
}

pub async fn handle_upload(ws: &Workspace, args: UploadArgs) -> Result<(), TaxopsError> {
    ws.require_session().await?;
    let kind = UploadKind::from_str(&args.kind)?;
    let file = UploadFile::from_path(Path::new(&args.file)).await?;
    let fields = (kind.domain() == Domain::Documents).then(|| DocumentFields {
        doc_type: args.doc_type.clone(),
        amount: args.amount,
        date: args.date.clone(),
        counterparty: args.counterparty.clone(),
        external_ref: args.external_ref.clone(),
    });

    let bar = spinner(format!("Uploading {}...", file.file_name));
    let (tx, printer) = spawn_event_printer(bar.clone(), ws.json);
    let ctl = controller(ws, &args.engagement_id).with_event_channel(tx);
    // Load uploads so the affected record can be updated in place.
    let _ = ctl.refresh_uploads().await;
    let result = ctl.upload_file(kind, Some(file), fields).await;
    drop(ctl);
    let _ = printer.await;
    bar.finish_and_clear();
    let summary = result?;

    ws.print(&summary, || {
        format!(
            "{} {} ingested ({} records)",
            style("✓").green(),
            kind.name(),
            summary.total_records(),
        )
    })
}

pub async fn handle_documents(ws: &Workspace, args: EngagementArgs) -> Result<(), TaxopsError> {
    let token = ws.session_token().await?;
    let list = ws
        .observed(&token, ws.backend.list_documents(Some(&token), &args.engagement_id))
        .await?;
    ws.print(&list, || {
        if list.documents.is_empty() {
            return "No documents uploaded.".to_string();
        }
        list.documents
            .iter()
            .map(|d| {
                format!(
                    "  {:<12} {:<32} {:<12} {}",
                    d.id,
                    d.filename,
                    d.doc_type,
                    d.amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
