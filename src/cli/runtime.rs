use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::{ApiClient, AuditBackend};
use crate::config::{self, OutputFormat, TaxopsConfig};
use crate::errors::TaxopsError;
use crate::models::User;
use crate::reporting::formatter::render_event;
use crate::session::{FileTokenStore, SessionContext};
use crate::workflow::WorkflowEvent;

/// Everything a command handler needs: config, backend and session.
pub struct Workspace {
    pub config: TaxopsConfig,
    pub backend: Arc<dyn AuditBackend>,
    pub session: SessionContext,
    pub json: bool,
}

impl Workspace {
    pub async fn open(config_path: Option<&str>, json: bool) -> Result<Self, TaxopsError> {
        let config = match config_path {
            Some(path) => config::parse_config(&PathBuf::from(path)).await?,
            None => TaxopsConfig::default(),
        };
        let backend: Arc<dyn AuditBackend> = Arc::new(ApiClient::new(&config.api)?);
        let store = Arc::new(FileTokenStore::new(config.session.token_path()));
        let json = json || config.output.format == OutputFormat::Json;
        debug!(base_url = %config.api.base_url, "Workspace opened");
        Ok(Self { session: SessionContext::new(store), backend, config, json })
    }

    /// Establish a session from demo mode, a configured token or the
    /// persisted one, in that order.
    pub async fn restore_session(&self) -> Result<Option<User>, TaxopsError> {
        if self.config.session.auth_bypass {
            info!("Auth bypass enabled, entering demo session");
            return Ok(Some(self.session.enter_demo().await));
        }
        if let Some(token) = self.config.session.resolved_token() {
            return self.session.adopt_token(self.backend.as_ref(), &token).await.map(Some);
        }
        self.session.bootstrap(self.backend.as_ref()).await
    }

    pub async fn require_session(&self) -> Result<User, TaxopsError> {
        self.restore_session()
            .await?
            .ok_or_else(|| TaxopsError::AuthRequired("Not signed in; run `taxops login` first".into()))
    }

    /// Bearer token of the restored session.
    pub async fn session_token(&self) -> Result<String, TaxopsError> {
        self.require_session().await?;
        self.session
            .token()
            .await
            .ok_or_else(|| TaxopsError::AuthRequired("Not signed in; run `taxops login` first".into()))
    }

    /// Await a direct backend call made with `token`. A 401 signs out.
    pub async fn observed<T>(
        &self,
        token: &str,
        call: impl Future<Output = Result<T, TaxopsError>>,
    ) -> Result<T, TaxopsError> {
        let result = call.await;
        if let Err(e) = &result {
            self.session.observe(e, token).await;
        }
        result
    }

    /// Print `value` as JSON, or the text rendering otherwise.
    pub fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), TaxopsError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Print controller events above the spinner until the channel closes.
pub fn spawn_event_printer(
    bar: ProgressBar,
    json: bool,
) -> (mpsc::UnboundedSender<WorkflowEvent>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                continue;
            }
            if let Some(line) = render_event(&event) {
                bar.println(line);
            }
        }
    });
    (tx, handle)
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), message);
}
