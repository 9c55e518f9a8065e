use std::str::FromStr;
use std::sync::Arc;

use console::style;
use serde_json::json;

use crate::cli::commands::ReportArgs;
use crate::cli::runtime::{spawn_event_printer, spinner, Workspace};
use crate::errors::TaxopsError;
use crate::models::ExportType;
use crate::reporting::formatter::render_report_summary;
use crate::reporting::ReportController;

pub async fn handle_report(ws: &Workspace, args: ReportArgs) -> Result<(), TaxopsError> {
    let export = args.export.as_deref().map(ExportType::from_str).transpose()?;
    ws.require_session().await?;

    let bar = spinner(if args.generate { "Generating draft..." } else { "Loading report..." });
    let (tx, printer) = spawn_event_printer(bar.clone(), ws.json);
    let ctl = ReportController::new(&args.engagement_id, Arc::clone(&ws.backend), ws.session.clone())
        .with_event_channel(tx);

    let result = async {
        let summary = if args.generate {
            ctl.generate_draft().await?
        } else {
            ctl.load_summary().await?
        };
        let url = match export {
            Some(kind) => Some(ctl.download_export(kind).await?),
            None => None,
        };
        Ok::<_, TaxopsError>((summary, url))
    }
    .await;
    drop(ctl);
    let _ = printer.await;
    bar.finish_and_clear();
    let (summary, url) = result?;

    let value = json!({ "summary": summary, "exportUrl": url });
    ws.print(&value, || {
        let mut text = render_report_summary(&summary);
        if let Some(url) = &url {
            text.push_str(&format!("\n{} {}", style("Download:").bold(), url));
        }
        text
    })
}
