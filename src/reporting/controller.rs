use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::AuditBackend;
use crate::errors::TaxopsError;
use crate::models::{ExportType, ReportSummary};
use crate::session::{Action, SessionContext};
use crate::workflow::{ActionKind, Resource, ResourceKind, WorkflowEvent};

#[derive(Debug, Clone, Default)]
pub struct ReportState {
    pub summary: Resource<ReportSummary>,
    pub generating: bool,
    pub exporting: HashSet<ExportType>,
}

/// Report lifecycle for one engagement: summary, draft generation and
/// export links.
pub struct ReportController {
    engagement_id: String,
    backend: Arc<dyn AuditBackend>,
    session: SessionContext,
    state: Arc<RwLock<ReportState>>,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl ReportController {
    pub fn new(
        engagement_id: impl Into<String>,
        backend: Arc<dyn AuditBackend>,
        session: SessionContext,
    ) -> Self {
        Self {
            engagement_id: engagement_id.into(),
            backend,
            session,
            state: Arc::new(RwLock::new(ReportState::default())),
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn close(&self) {
        self.cancel_token.cancel();
    }

    pub async fn snapshot(&self) -> ReportState {
        self.state.read().await.clone()
    }

    pub async fn summary(&self) -> Option<ReportSummary> {
        self.state.read().await.summary.data.clone()
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn emit_failed(&self, action: ActionKind, error: &TaxopsError) {
        let classification = error.classify();
        self.emit(WorkflowEvent::Failed {
            action,
            error_type: classification.error_type,
            message: error.to_string(),
            retryable: classification.retryable,
        });
    }

    fn closed_error(&self) -> TaxopsError {
        TaxopsError::Cancelled(format!("report view for {} closed", self.engagement_id))
    }

    async fn require_token(&self) -> Result<String, TaxopsError> {
        if self.cancel_token.is_cancelled() {
            return Err(self.closed_error());
        }
        self.session
            .token()
            .await
            .ok_or_else(|| TaxopsError::AuthRequired("Sign in to view reports".into()))
    }

    async fn call<T, F>(&self, token: &str, fut: F) -> Result<T, TaxopsError>
    where
        F: Future<Output = Result<T, TaxopsError>>,
    {
        let result = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(self.closed_error()),
            r = fut => r,
        };
        if let Err(e) = &result {
            self.session.observe(e, token).await;
        }
        result
    }

    pub async fn load_summary(&self) -> Result<ReportSummary, TaxopsError> {
        let token = self.require_token().await?;
        let action = ActionKind::Load(ResourceKind::Report);
        self.state.write().await.summary.begin();
        self.emit(WorkflowEvent::Started { action: action.clone() });

        let result = self.call(&token, self.backend.report_summary(Some(&token), &self.engagement_id)).await;
        if self.cancel_token.is_cancelled() {
            return Err(self.closed_error());
        }
        let mut state = self.state.write().await;
        match result {
            Ok(summary) => {
                state.summary.succeed(summary.clone());
                drop(state);
                self.emit(WorkflowEvent::Finished { action, items: summary.exports.len() });
                Ok(summary)
            }
            Err(e) => {
                state.summary.fail(&e);
                drop(state);
                warn!(engagement_id = %self.engagement_id, error = %e, "Report summary load failed");
                self.emit_failed(action, &e);
                Err(e)
            }
        }
    }

    /// Generate a draft. On success the returned summary replaces the held
    /// one entirely.
    pub async fn generate_draft(&self) -> Result<ReportSummary, TaxopsError> {
        self.session.authorize(Action::GenerateDraft).await?;
        let token = self.require_token().await?;
        {
            let mut state = self.state.write().await;
            if state.generating {
                return Err(TaxopsError::Validation("A draft is already being generated".into()));
            }
            state.generating = true;
        }
        self.emit(WorkflowEvent::Started { action: ActionKind::GenerateDraft });
        info!(engagement_id = %self.engagement_id, "Generating draft report");

        let result = self.call(&token, self.backend.generate_draft(Some(&token), &self.engagement_id)).await;
        let mut state = self.state.write().await;
        state.generating = false;
        if self.cancel_token.is_cancelled() {
            return Err(self.closed_error());
        }
        match result {
            Ok(summary) => {
                state.summary.succeed(summary.clone());
                drop(state);
                self.emit(WorkflowEvent::Finished { action: ActionKind::GenerateDraft, items: 1 });
                Ok(summary)
            }
            Err(e) => {
                drop(state);
                warn!(engagement_id = %self.engagement_id, error = %e, "Draft generation failed");
                self.emit_failed(ActionKind::GenerateDraft, &e);
                Err(e)
            }
        }
    }

    /// Ask for a fresh export URL. URLs are single-use, so nothing is cached.
    pub async fn download_export(&self, export: ExportType) -> Result<String, TaxopsError> {
        let token = self.require_token().await?;
        let action = ActionKind::DownloadExport(export);
        self.state.write().await.exporting.insert(export);
        self.emit(WorkflowEvent::Started { action: action.clone() });

        let result = self
            .call(&token, self.backend.export_link(Some(&token), &self.engagement_id, export))
            .await;
        self.state.write().await.exporting.remove(&export);
        if self.cancel_token.is_cancelled() {
            return Err(self.closed_error());
        }
        match result {
            Ok(link) => {
                info!(engagement_id = %self.engagement_id, export = %export, "Export link issued");
                self.emit(WorkflowEvent::ExportReady { export, url: link.url.clone() });
                self.emit(WorkflowEvent::Finished { action, items: 1 });
                Ok(link.url)
            }
            Err(e) => {
                warn!(engagement_id = %self.engagement_id, export = %export, error = %e, "Export request failed");
                self.emit_failed(action, &e);
                Err(e)
            }
        }
    }
}
