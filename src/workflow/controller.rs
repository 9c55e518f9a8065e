use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::AuditBackend;
use crate::errors::TaxopsError;
use crate::findings::{check_summary, merge_streams, FindingFilter, FindingsView, SummaryDrift};
use crate::models::{
    AuditModule, Domain, DocumentFields, Finding, FindingStatus, IngestSummary, ModuleStatus,
    UploadFile, UploadKind, UploadStatus,
};
use crate::session::access::permits;
use crate::session::{Action, SessionContext};
use super::events::{ActionKind, ResourceKind, WorkflowEvent};
use super::guard::InFlightRuns;
use super::state::{PendingRun, Resource, ResourceError, WorkflowState};

/// Which resources failed during a multi-resource load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<ResourceKind>,
    pub failed: Vec<(ResourceKind, ResourceError)>,
}

impl LoadReport {
    fn record(&mut self, kind: ResourceKind, result: Result<(), TaxopsError>) {
        match result {
            Ok(()) => self.loaded.push(kind),
            Err(e) => self.failed.push((kind, ResourceError::from(&e))),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of an accepted run after reconciliation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Authoritative module record after the refetch, if it succeeded.
    pub module: Option<AuditModule>,
    pub reconcile_error: Option<ResourceError>,
}

/// Display-ready module row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleView {
    pub id: String,
    pub name: String,
    pub status: ModuleStatus,
    pub label: &'static str,
    pub completion: u8,
    pub last_run: String,
    /// Showing the optimistic overlay rather than server state.
    pub pending: bool,
    pub run_enabled: bool,
}

/// Drives one engagement's uploads, modules and findings.
///
/// Every backend call races the controller's cancellation token; once
/// [`WorkflowController::close`] has been called no result is applied.
pub struct WorkflowController {
    engagement_id: String,
    backend: Arc<dyn AuditBackend>,
    session: SessionContext,
    state: Arc<RwLock<WorkflowState>>,
    in_flight: InFlightRuns,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl WorkflowController {
    pub fn new(
        engagement_id: impl Into<String>,
        backend: Arc<dyn AuditBackend>,
        session: SessionContext,
    ) -> Self {
        Self {
            engagement_id: engagement_id.into(),
            backend,
            session,
            state: Arc::new(RwLock::new(WorkflowState::default())),
            in_flight: InFlightRuns::new(),
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Attach an event channel for streaming workflow events to a renderer.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn engagement_id(&self) -> &str {
        &self.engagement_id
    }

    /// Tear the view down. In-flight loads stop and apply nothing.
    /// Server-side runs already triggered carry on.
    pub fn close(&self) {
        info!(engagement_id = %self.engagement_id, "Closing workflow view");
        self.cancel_token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub async fn snapshot(&self) -> WorkflowState {
        self.state.read().await.clone()
    }

    pub fn run_in_flight(&self, module_id: &str) -> bool {
        self.in_flight.contains(module_id)
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
        TaxopsError::Cancelled(format!("engagement {} view closed", self.engagement_id))
    }

    fn ensure_open(&self) -> Result<(), TaxopsError> {
        if self.is_closed() {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    async fn require_token(&self) -> Result<String, TaxopsError> {
        self.session
            .token()
            .await
            .ok_or_else(|| TaxopsError::AuthRequired("Sign in to open an engagement".into()))
    }

    /// Run a backend call against the cancel token; 401s go to the session
    /// along with the token the request carried.
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

    /// Shared load path: mark loading, fetch, then apply or record the error.
    async fn load_into<T, F, A>(
        &self,
        kind: ResourceKind,
        token: &str,
        slot: fn(&mut WorkflowState) -> &mut Resource<T>,
        fetch: F,
        apply: A,
    ) -> Result<(), TaxopsError>
    where
        F: Future<Output = Result<T, TaxopsError>>,
        A: FnOnce(&mut WorkflowState, T) -> usize,
    {
        self.ensure_open()?;
        slot(&mut *self.state.write().await).begin();
        self.emit(WorkflowEvent::Started { action: ActionKind::Load(kind) });

        let result = self.call(token, fetch).await;
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let mut state = self.state.write().await;
        match result {
            Ok(data) => {
                let items = apply(&mut *state, data);
                drop(state);
                debug!(engagement_id = %self.engagement_id, resource = %kind, items, "Resource loaded");
                self.emit(WorkflowEvent::Finished { action: ActionKind::Load(kind), items });
                Ok(())
            }
            Err(e) => {
                slot(&mut *state).fail(&e);
                drop(state);
                warn!(engagement_id = %self.engagement_id, resource = %kind, error = %e, "Resource load failed");
                self.emit_failed(ActionKind::Load(kind), &e);
                Err(e)
            }
        }
    }

    pub async fn load_engagement(&self) -> Result<(), TaxopsError> {
        let token = self.require_token().await?;
        self.load_into(
            ResourceKind::Engagement,
            &token,
            |s| &mut s.engagement,
            self.backend.get_engagement(Some(&token), &self.engagement_id),
            |s, engagement| {
                s.engagement.succeed(engagement);
                1
            },
        )
        .await
    }

    pub async fn refresh_uploads(&self) -> Result<(), TaxopsError> {
        let token = self.require_token().await?;
        self.load_into(
            ResourceKind::Uploads,
            &token,
            |s| &mut s.uploads,
            self.backend.list_uploads(Some(&token), &self.engagement_id),
            |s, uploads| {
                let n = uploads.len();
                s.uploads.succeed(uploads);
                n
            },
        )
        .await
    }

    /// Refetch the authoritative module list and replace it wholesale.
    pub async fn refresh_modules(&self) -> Result<(), TaxopsError> {
        let token = self.require_token().await?;
        self.load_into(
            ResourceKind::Modules,
            &token,
            |s| &mut s.modules,
            self.backend.list_modules(Some(&token), &self.engagement_id),
            |s, modules| {
                let n = modules.len();
                s.apply_modules(modules);
                n
            },
        )
        .await
    }

    /// Refetch the engagement's generic findings.
    pub async fn refresh_findings(&self) -> Result<(), TaxopsError> {
        let token = self.require_token().await?;
        let fetch = async {
            let raw = self.backend.list_findings(Some(&token), &self.engagement_id).await?;
            Ok(raw.into_iter().map(Finding::from).collect::<Vec<_>>())
        };
        self.load_into(ResourceKind::Findings, &token, |s| &mut s.findings, fetch, |s, findings| {
            let n = findings.len();
            s.findings.succeed(findings);
            n
        })
        .await
    }

    /// Load engagement, uploads, modules and findings concurrently. Each
    /// resource succeeds or fails on its own; only a missing session or a
    /// closed view fails the whole call.
    pub async fn load_workflow(&self) -> Result<LoadReport, TaxopsError> {
        self.ensure_open()?;
        self.session.authorize(Action::ViewWorkspace).await?;
        info!(engagement_id = %self.engagement_id, "Loading workflow");

        let (engagement, uploads, modules, findings) = tokio::join!(
            self.load_engagement(),
            self.refresh_uploads(),
            self.refresh_modules(),
            self.refresh_findings(),
        );
        self.ensure_open()?;

        let mut report = LoadReport::default();
        report.record(ResourceKind::Engagement, engagement);
        report.record(ResourceKind::Uploads, uploads);
        report.record(ResourceKind::Modules, modules);
        report.record(ResourceKind::Findings, findings);

        if let Some(drift) = self.summary_drift().await {
            self.emit(WorkflowEvent::SummaryDrift(drift));
        }
        Ok(report)
    }

    async fn load_domain(&self, token: &str, domain: Domain) -> Result<(), TaxopsError> {
        let kind = ResourceKind::DomainFindings(domain);
        self.ensure_open()?;
        self.state.write().await.domain_findings.entry(domain).or_default().begin();
        self.emit(WorkflowEvent::Started { action: ActionKind::Load(kind) });

        let result = self
            .call(token, self.backend.domain_findings(Some(token), &self.engagement_id, domain))
            .await;
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let mut state = self.state.write().await;
        let slot = state.domain_findings.entry(domain).or_default();
        match result {
            Ok(raw) => {
                let findings: Vec<Finding> = raw.into_iter().map(|f| f.into_finding(domain)).collect();
                let items = findings.len();
                slot.succeed(findings);
                drop(state);
                debug!(engagement_id = %self.engagement_id, domain = %domain, items, "Domain findings loaded");
                self.emit(WorkflowEvent::Finished { action: ActionKind::Load(kind), items });
                Ok(())
            }
            Err(e) => {
                slot.fail(&e);
                drop(state);
                warn!(engagement_id = %self.engagement_id, domain = %domain, error = %e, "Domain findings load failed");
                self.emit_failed(ActionKind::Load(kind), &e);
                Err(e)
            }
        }
    }

    /// Fetch several domain finding streams concurrently. One domain
    /// failing leaves the others applied.
    pub async fn load_domain_findings(&self, domains: &[Domain]) -> Result<LoadReport, TaxopsError> {
        self.ensure_open()?;
        let token = self.require_token().await?;
        let results = join_all(domains.iter().map(|d| self.load_domain(&token, *d))).await;
        self.ensure_open()?;

        let mut report = LoadReport::default();
        for (domain, result) in domains.iter().zip(results) {
            report.record(ResourceKind::DomainFindings(*domain), result);
        }
        Ok(report)
    }

    /// Trigger a rule run for one module.
    ///
    /// Fails without any network call when the role may not run modules, a
    /// run for the module is already in flight here or server-side, or the
    /// module is blocked with no ingest since. Whatever the backend answers,
    /// the module list is refetched before returning.
    pub async fn run_module(&self, module_id: &str) -> Result<RunOutcome, TaxopsError> {
        self.ensure_open()?;
        self.session.authorize(Action::RunModule).await?;
        let token = self.require_token().await?;

        {
            let state = self.state.read().await;
            if let Some(module) = state.module(module_id) {
                match module.status {
                    ModuleStatus::Running => return Err(TaxopsError::RunInFlight(module_id.to_string())),
                    ModuleStatus::Blocked if !state.block_cleared(module_id) => {
                        return Err(TaxopsError::ModuleBlocked(module_id.to_string()));
                    }
                    _ => {}
                }
            }
        }

        let _guard = self
            .in_flight
            .try_acquire(module_id)
            .ok_or_else(|| TaxopsError::RunInFlight(module_id.to_string()))?;

        let action = ActionKind::RunModule(module_id.to_string());
        self.state
            .write()
            .await
            .pending
            .insert(module_id.to_string(), PendingRun { requested_at: Utc::now(), run_id: None });
        self.emit(WorkflowEvent::Started { action: action.clone() });
        info!(engagement_id = %self.engagement_id, module_id, "Module run requested");

        let result = self
            .call(&token, self.backend.run_module(Some(&token), &self.engagement_id, module_id))
            .await;
        if self.is_closed() {
            return Err(self.closed_error());
        }

        if let Ok(receipt) = &result {
            if let Some(pending) = self.state.write().await.pending.get_mut(module_id) {
                pending.run_id = Some(receipt.run_id.clone());
            }
            self.emit(WorkflowEvent::RunAccepted {
                module_id: module_id.to_string(),
                run_id: receipt.run_id.clone(),
            });
        }

        // Reconcile regardless of outcome; local status is never final.
        let reconcile = self.refresh_modules().await;
        let module = {
            let mut state = self.state.write().await;
            state.pending.remove(module_id);
            state.rearm_block(module_id);
            state.module(module_id).cloned()
        };
        self.emit(WorkflowEvent::ModuleReconciled {
            module_id: module_id.to_string(),
            status: module.as_ref().map(|m| m.status),
        });

        match result {
            Ok(receipt) => {
                info!(
                    engagement_id = %self.engagement_id,
                    module_id,
                    run_id = %receipt.run_id,
                    status = module.as_ref().map(|m| m.status.as_str()).unwrap_or("unknown"),
                    "Module run reconciled"
                );
                self.emit(WorkflowEvent::Finished { action, items: 1 });
                Ok(RunOutcome {
                    run_id: receipt.run_id,
                    module,
                    reconcile_error: reconcile.err().map(|e| ResourceError::from(&e)),
                })
            }
            Err(e) => {
                warn!(engagement_id = %self.engagement_id, module_id, error = %e, "Module run failed");
                self.emit_failed(action, &e);
                Err(e)
            }
        }
    }

    /// Upload one file. Only the affected upload record changes. Once the
    /// upload is ingested, loaded findings are marked stale because they
    /// describe an older snapshot.
    pub async fn upload_file(
        &self,
        kind: UploadKind,
        file: Option<UploadFile>,
        fields: Option<DocumentFields>,
    ) -> Result<IngestSummary, TaxopsError> {
        self.ensure_open()?;
        let file = match file {
            Some(f) if !f.bytes.is_empty() => f,
            Some(f) => return Err(TaxopsError::Validation(format!("File '{}' is empty", f.file_name))),
            None => return Err(TaxopsError::Validation("Select a file to upload".into())),
        };
        self.session.authorize(Action::UploadData).await?;
        let token = self.require_token().await?;

        let action = ActionKind::Upload(kind.name());
        self.emit(WorkflowEvent::Started { action: action.clone() });
        info!(engagement_id = %self.engagement_id, kind = %kind.name(), file = %file.file_name, "Uploading");

        let result = self
            .call(&token, self.backend.upload(Some(&token), &self.engagement_id, kind, &file, fields.as_ref()))
            .await;
        if self.is_closed() {
            return Err(self.closed_error());
        }

        match result {
            Ok(summary) => {
                let ingested = {
                    let mut state = self.state.write().await;
                    let ingested = match &summary.upload {
                        Some(upload) => {
                            let ingested = upload.status == UploadStatus::Ingested;
                            state.apply_upload(upload.clone());
                            ingested
                        }
                        None => {
                            let target = state.uploads.data.as_ref().and_then(|list| {
                                list.iter()
                                    .find(|u| u.upload_type.eq_ignore_ascii_case(kind.upload_type()))
                                    .cloned()
                            });
                            if let Some(mut upload) = target {
                                upload.status = upload.status.advance(UploadStatus::Ingested);
                                upload.updated_at = "just now".to_string();
                                state.apply_upload(upload);
                            }
                            true
                        }
                    };
                    if ingested {
                        state.record_ingest();
                    }
                    ingested
                };
                if ingested {
                    self.emit(WorkflowEvent::FindingsStale);
                } else {
                    info!(engagement_id = %self.engagement_id, kind = %kind.name(), "Upload accepted, ingest pending");
                }
                self.emit(WorkflowEvent::Finished { action, items: summary.total_records() as usize });
                Ok(summary)
            }
            Err(e) => {
                warn!(engagement_id = %self.engagement_id, kind = %kind.name(), error = %e, "Upload failed");
                self.emit_failed(action, &e);
                Err(e)
            }
        }
    }

    /// Change a finding's review status, then refetch findings so the
    /// change is visible in what this controller holds.
    pub async fn update_finding_status(&self, finding_id: &str, status: FindingStatus) -> Result<(), TaxopsError> {
        self.ensure_open()?;
        self.session.authorize(Action::UpdateFindingStatus).await?;
        let token = self.require_token().await?;

        let action = ActionKind::UpdateFinding(finding_id.to_string());
        self.emit(WorkflowEvent::Started { action: action.clone() });
        let result = self
            .call(&token, self.backend.update_finding_status(Some(&token), &self.engagement_id, finding_id, status))
            .await;
        if let Err(e) = result {
            self.emit_failed(action, &e);
            return Err(e);
        }
        self.emit(WorkflowEvent::FindingStatusChanged { finding_id: finding_id.to_string(), status });

        if let Err(e) = self.refresh_findings().await {
            warn!(engagement_id = %self.engagement_id, finding_id, error = %e, "Refetch after status change failed");
        }
        self.emit(WorkflowEvent::Finished { action, items: 1 });
        Ok(())
    }

    /// Module rows with the pending overlay applied and run enablement for
    /// the current user.
    pub async fn module_views(&self) -> Vec<ModuleView> {
        let can_run = match self.session.user().await {
            Some(user) => permits(&user, Action::RunModule),
            None => false,
        };
        let state = self.state.read().await;
        let Some(modules) = state.modules.data.as_ref() else {
            return Vec::new();
        };
        modules
            .iter()
            .map(|m| {
                let pending = state.pending.contains_key(&m.id);
                let in_flight = pending || self.in_flight.contains(&m.id);
                let status = if pending { ModuleStatus::Running } else { m.status };
                let runnable = match m.status {
                    ModuleStatus::Blocked => state.block_cleared(&m.id),
                    other => other.accepts_run_request(),
                };
                ModuleView {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    status,
                    label: status.label(),
                    completion: m.completion,
                    last_run: m.last_run.clone(),
                    pending,
                    run_enabled: can_run && !in_flight && runnable,
                }
            })
            .collect()
    }

    /// Generic and domain findings merged, filtered and aggregated.
    pub async fn findings_view(&self, filter: &FindingFilter) -> FindingsView {
        let state = self.state.read().await;
        let mut streams: Vec<Vec<Finding>> = Vec::with_capacity(1 + state.domain_findings.len());
        streams.push(state.findings.data.clone().unwrap_or_default());
        for resource in state.domain_findings.values() {
            streams.push(resource.data.clone().unwrap_or_default());
        }
        let stale = state.findings_stale();
        drop(state);
        FindingsView::build(&merge_streams(streams), filter).mark_stale(stale)
    }

    /// Compare the engagement summary with the loaded generic findings.
    pub async fn summary_drift(&self) -> Option<SummaryDrift> {
        let state = self.state.read().await;
        let engagement = state.engagement.data.as_ref()?;
        let findings = state.findings.data.as_ref()?;
        check_summary(&engagement.summary, findings)
    }
}
