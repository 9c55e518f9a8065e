use console::style;
use serde_json::json;
use tracing::info;

use crate::cli::commands::{ForgotPasswordArgs, LoginArgs, RegisterFirmArgs};
use crate::cli::runtime::{spinner, Workspace};
use crate::errors::TaxopsError;
use crate::models::User;

fn describe(user: &User, firm_name: &str) -> String {
    let roles: Vec<&str> = user.roles.iter().map(|r| r.as_str()).collect();
    format!(
        "{} {} <{}> | {} | {}",
        style("✓").green(),
        style(&user.name).bold(),
        user.email,
        style(firm_name).cyan(),
        roles.join(", "),
    )
}

async fn firm_name(ws: &Workspace) -> String {
    ws.session.current().await.map(|s| s.firm.name).unwrap_or_default()
}

pub async fn handle_login(ws: &Workspace, args: LoginArgs) -> Result<(), TaxopsError> {
    info!(email = %args.email, "Signing in");
    let bar = spinner("Signing in...");
    let result = ws
        .session
        .login(ws.backend.as_ref(), &args.email, &args.password, args.firm_id.as_deref())
        .await;
    bar.finish_and_clear();
    let user = result?;
    let firm = firm_name(ws).await;
    ws.print(&user, || describe(&user, &firm))
}

pub async fn handle_register_firm(ws: &Workspace, args: RegisterFirmArgs) -> Result<(), TaxopsError> {
    info!(firm = %args.firm_name, email = %args.email, "Registering firm");
    let bar = spinner("Creating firm...");
    let result = ws
        .session
        .register_firm(
            ws.backend.as_ref(),
            &args.firm_name,
            &args.email,
            &args.password,
            args.full_name.as_deref(),
        )
        .await;
    bar.finish_and_clear();
    let user = result?;
    let firm = firm_name(ws).await;
    ws.print(&user, || describe(&user, &firm))
}

pub async fn handle_forgot_password(ws: &Workspace, args: ForgotPasswordArgs) -> Result<(), TaxopsError> {
    let response = ws.session.forgot_password(ws.backend.as_ref(), &args.email).await?;
    ws.print(&json!({ "message": response.message }), || response.message.clone())
}

pub async fn handle_logout(ws: &Workspace) -> Result<(), TaxopsError> {
    ws.session.logout().await?;
    ws.print(&json!({ "signedOut": true }), || format!("{} Signed out", style("✓").green()))
}

pub async fn handle_whoami(ws: &Workspace) -> Result<(), TaxopsError> {
    ws.require_session().await?;
    let session = ws
        .session
        .current()
        .await
        .ok_or_else(|| TaxopsError::AuthRequired("Not signed in".into()))?;
    let value = json!({ "user": session.user, "firm": session.firm, "demo": session.demo });
    ws.print(&value, || {
        let mut line = describe(&session.user, &session.firm.name);
        if session.demo {
            line.push_str(&format!(" {}", style("(demo)").yellow()));
        }
        line
    })
}
