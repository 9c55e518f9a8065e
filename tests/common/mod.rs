#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use taxops::api::{AuditBackend, ForgotPasswordResponse, LoginRequest, RegisterFirmRequest};
use taxops::errors::TaxopsError;
use taxops::models::{
    AuditModule, Client, DataUpload, DocumentFields, DocumentList, Domain, DomainFinding,
    Engagement, EngagementFinding, EngagementStatus, EngagementSummary, ExportLink, ExportType,
    FindingSeverity, FindingStatus, Firm, FirmSummary, IngestSummary, MeResponse, ModuleStatus,
    ReportExport, ReportSummary, RiskLevel, Role, RunReceipt, TokenResponse, UploadFile,
    UploadKind, UploadStatus, User,
};
use taxops::session::{MemoryTokenStore, Session, SessionContext};

pub const ENGAGEMENT: &str = "e1";

/// In-memory backend. Endpoints named in `failing` answer with the mapped
/// HTTP status.
pub struct FakeBackend {
    pub engagement: Mutex<Engagement>,
    pub uploads: Mutex<Vec<DataUpload>>,
    pub modules: Mutex<Vec<AuditModule>>,
    pub findings: Mutex<Vec<EngagementFinding>>,
    pub domain_findings: Mutex<HashMap<Domain, Vec<DomainFinding>>>,
    pub report: Mutex<ReportSummary>,
    pub failing: Mutex<HashMap<&'static str, u16>>,
    /// Status a module settles in once a run is accepted.
    pub run_result: Mutex<ModuleStatus>,
    /// When set, `run_module` waits for a notification before answering.
    pub run_gate: Mutex<Option<Arc<Notify>>>,
    pub upload_record: Mutex<Option<DataUpload>>,
    pub calls: Mutex<Vec<String>>,
    pub run_calls: AtomicUsize,
    pub module_fetches: AtomicUsize,
    pub export_calls: AtomicUsize,
    pub seen_tokens: Mutex<HashSet<String>>,
}

pub fn module(id: &str, status: ModuleStatus) -> AuditModule {
    AuditModule {
        id: id.into(),
        name: format!("Module {}", id),
        module_code: id.to_uppercase(),
        status,
        completion: 0,
        last_run: String::new(),
    }
}

pub fn upload(id: &str, upload_type: &str, status: UploadStatus) -> DataUpload {
    DataUpload {
        id: id.into(),
        name: format!("{} upload", upload_type),
        upload_type: upload_type.into(),
        status,
        updated_at: "1d ago".into(),
        owner: None,
    }
}

pub fn engagement_finding(id: &str, severity: FindingSeverity, status: Option<FindingStatus>) -> EngagementFinding {
    EngagementFinding {
        id: id.into(),
        rule_id: format!("R-{}", id),
        summary: format!("Finding {}", id),
        severity,
        module: "Cash".into(),
        status,
        assignee: None,
        evidence: None,
        description: None,
    }
}

pub fn domain_finding(id: &str, severity: FindingSeverity) -> DomainFinding {
    DomainFinding {
        id: id.into(),
        domain: None,
        severity,
        code: format!("D-{}", id),
        message: format!("Domain finding {}", id),
        status: None,
        metadata: Default::default(),
        transaction_id: None,
        account_code: None,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            engagement: Mutex::new(Engagement {
                id: ENGAGEMENT.into(),
                client_id: "c1".into(),
                period: "FY2024".into(),
                status: EngagementStatus::Fieldwork,
                progress: 40,
                risk: RiskLevel::Medium,
                summary: EngagementSummary {
                    data_readiness: 50,
                    modules_run: 0,
                    findings_open: 2,
                    high_severity: 1,
                },
            }),
            uploads: Mutex::new(vec![
                upload("u1", "TB", UploadStatus::Ingested),
                upload("u2", "GL", UploadStatus::NotUploaded),
            ]),
            modules: Mutex::new(vec![
                module("m1", ModuleStatus::NotStarted),
                module("m2", ModuleStatus::Blocked),
                module("m3", ModuleStatus::Running),
            ]),
            findings: Mutex::new(vec![
                engagement_finding("f1", FindingSeverity::Critical, Some(FindingStatus::Open)),
                engagement_finding("f2", FindingSeverity::Minor, None),
                engagement_finding("f3", FindingSeverity::Major, Some(FindingStatus::Closed)),
            ]),
            domain_findings: Mutex::new(HashMap::new()),
            report: Mutex::new(ReportSummary {
                id: "r1".into(),
                engagement_id: ENGAGEMENT.into(),
                draft_available: false,
                last_generated_at: None,
                exports: Vec::new(),
            }),
            failing: Mutex::new(HashMap::new()),
            run_result: Mutex::new(ModuleStatus::Completed),
            run_gate: Mutex::new(None),
            upload_record: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            run_calls: AtomicUsize::new(0),
            module_fetches: AtomicUsize::new(0),
            export_calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, endpoint: &'static str, status: u16) {
        self.failing.lock().unwrap().insert(endpoint, status);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().remove(endpoint);
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == endpoint).count()
    }

    fn enter(&self, endpoint: &'static str, token: Option<&str>) -> Result<(), TaxopsError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(TaxopsError::AuthRequired("no token".into())),
        };
        self.seen_tokens.lock().unwrap().insert(token.to_string());
        match self.failing.lock().unwrap().get(endpoint) {
            Some(status) => Err(TaxopsError::Api { status: *status, message: format!("{} failed", endpoint) }),
            None => Ok(()),
        }
    }
}

fn unused<T>(what: &str) -> Result<T, TaxopsError> {
    Err(TaxopsError::Internal(format!("{} not used in tests", what)))
}

#[async_trait]
impl AuditBackend for FakeBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<TokenResponse, TaxopsError> {
        unused("login")
    }

    async fn register_firm(&self, _request: &RegisterFirmRequest) -> Result<TokenResponse, TaxopsError> {
        unused("register_firm")
    }

    async fn me(&self, _token: Option<&str>) -> Result<MeResponse, TaxopsError> {
        unused("me")
    }

    async fn forgot_password(&self, _email: &str) -> Result<ForgotPasswordResponse, TaxopsError> {
        unused("forgot_password")
    }

    async fn firm_summary(&self, _token: Option<&str>) -> Result<FirmSummary, TaxopsError> {
        unused("firm_summary")
    }

    async fn list_clients(&self, _token: Option<&str>) -> Result<Vec<Client>, TaxopsError> {
        unused("list_clients")
    }

    async fn get_client(&self, _token: Option<&str>, _client_id: &str) -> Result<Client, TaxopsError> {
        unused("get_client")
    }

    async fn list_engagements(&self, _token: Option<&str>, _client_id: &str) -> Result<Vec<Engagement>, TaxopsError> {
        unused("list_engagements")
    }

    async fn get_engagement(&self, token: Option<&str>, _engagement_id: &str) -> Result<Engagement, TaxopsError> {
        self.enter("engagement", token)?;
        Ok(self.engagement.lock().unwrap().clone())
    }

    async fn list_uploads(&self, token: Option<&str>, _engagement_id: &str) -> Result<Vec<DataUpload>, TaxopsError> {
        self.enter("uploads", token)?;
        Ok(self.uploads.lock().unwrap().clone())
    }

    async fn list_modules(&self, token: Option<&str>, _engagement_id: &str) -> Result<Vec<AuditModule>, TaxopsError> {
        self.module_fetches.fetch_add(1, Ordering::SeqCst);
        self.enter("modules", token)?;
        Ok(self.modules.lock().unwrap().clone())
    }

    async fn list_findings(&self, token: Option<&str>, _engagement_id: &str) -> Result<Vec<EngagementFinding>, TaxopsError> {
        self.enter("findings", token)?;
        Ok(self.findings.lock().unwrap().clone())
    }

    async fn update_finding_status(
        &self,
        token: Option<&str>,
        _engagement_id: &str,
        finding_id: &str,
        status: FindingStatus,
    ) -> Result<(), TaxopsError> {
        self.enter("update_finding", token)?;
        let mut findings = self.findings.lock().unwrap();
        match findings.iter_mut().find(|f| f.id == finding_id) {
            Some(f) => {
                f.status = Some(status);
                Ok(())
            }
            None => Err(TaxopsError::Api { status: 404, message: "Finding not found".into() }),
        }
    }

    async fn run_module(&self, token: Option<&str>, _engagement_id: &str, module_id: &str) -> Result<RunReceipt, TaxopsError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.enter("run", token)?;
        let gate = self.run_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let settled = *self.run_result.lock().unwrap();
        if let Some(m) = self.modules.lock().unwrap().iter_mut().find(|m| m.id == module_id) {
            m.status = settled;
            m.completion = 100;
            m.last_run = "just now".into();
        }
        Ok(RunReceipt { run_id: format!("run-{}", module_id) })
    }

    async fn report_summary(&self, token: Option<&str>, _engagement_id: &str) -> Result<ReportSummary, TaxopsError> {
        self.enter("report", token)?;
        Ok(self.report.lock().unwrap().clone())
    }

    async fn generate_draft(&self, token: Option<&str>, _engagement_id: &str) -> Result<ReportSummary, TaxopsError> {
        self.enter("draft", token)?;
        let mut report = self.report.lock().unwrap();
        report.draft_available = true;
        report.last_generated_at = Some("2024-03-31T12:00:00Z".into());
        report.exports.push(ReportExport {
            export_type: ExportType::Pdf,
            url: "https://files.test/draft.pdf".into(),
            generated_at: "2024-03-31T12:00:00Z".into(),
        });
        Ok(report.clone())
    }

    async fn export_link(&self, token: Option<&str>, engagement_id: &str, export: ExportType) -> Result<ExportLink, TaxopsError> {
        self.enter("export", token)?;
        let n = self.export_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExportLink { url: format!("https://files.test/{}.{}?sig={}", engagement_id, export, n) })
    }

    async fn upload(
        &self,
        token: Option<&str>,
        _engagement_id: &str,
        _kind: UploadKind,
        _file: &UploadFile,
        _fields: Option<&DocumentFields>,
    ) -> Result<IngestSummary, TaxopsError> {
        self.enter("upload", token)?;
        let mut counters = serde_json::Map::new();
        counters.insert("rows_ingested".into(), serde_json::json!(12));
        Ok(IngestSummary { upload: self.upload_record.lock().unwrap().clone(), counters })
    }

    async fn domain_findings(&self, token: Option<&str>, _engagement_id: &str, domain: Domain) -> Result<Vec<DomainFinding>, TaxopsError> {
        self.calls.lock().unwrap().push(format!("domain:{}", domain));
        if let Some(status) = self.failing.lock().unwrap().get(domain.as_str()) {
            return Err(TaxopsError::Api { status: *status, message: format!("{} failed", domain) });
        }
        if token.is_none() {
            return Err(TaxopsError::AuthRequired("no token".into()));
        }
        Ok(self.domain_findings.lock().unwrap().get(&domain).cloned().unwrap_or_default())
    }

    async fn list_documents(&self, _token: Option<&str>, _engagement_id: &str) -> Result<DocumentList, TaxopsError> {
        unused("list_documents")
    }
}

pub fn user_with(role: Role) -> User {
    User {
        id: format!("u-{}", role),
        name: format!("{} user", role),
        email: format!("{}@firm.test", role),
        roles: BTreeSet::from([role]),
        firm_id: "f1".into(),
    }
}

/// Session context already signed in with one role.
pub async fn session_as(role: Role) -> SessionContext {
    let ctx = SessionContext::new(Arc::new(MemoryTokenStore::with_token("tok")));
    let firm = Firm { id: "f1".into(), name: "Firm One".into() };
    ctx.populate(Session::new(user_with(role), firm, "tok")).await;
    ctx
}
