use async_trait::async_trait;

use crate::errors::TaxopsError;
use crate::models::{
    AuditModule, Client, DataUpload, Domain, DocumentFields, DocumentList, DomainFinding,
    Engagement, EngagementFinding, ExportLink, ExportType, FindingStatus, FirmSummary,
    IngestSummary, MeResponse, ReportSummary, RunReceipt, TokenResponse, UploadFile, UploadKind,
};
use super::requests::{ForgotPasswordResponse, LoginRequest, RegisterFirmRequest};

/// The backend contract consumed by the session, workflow and report
/// controllers. Authenticated calls take the current bearer token; a missing
/// token must fail with `AuthRequired` before any I/O.
#[async_trait]
pub trait AuditBackend: Send + Sync {
    // Auth
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, TaxopsError>;
    async fn register_firm(&self, request: &RegisterFirmRequest) -> Result<TokenResponse, TaxopsError>;
    async fn me(&self, token: Option<&str>) -> Result<MeResponse, TaxopsError>;
    async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse, TaxopsError>;

    // Firm and clients
    async fn firm_summary(&self, token: Option<&str>) -> Result<FirmSummary, TaxopsError>;
    async fn list_clients(&self, token: Option<&str>) -> Result<Vec<Client>, TaxopsError>;
    async fn get_client(&self, token: Option<&str>, client_id: &str) -> Result<Client, TaxopsError>;
    async fn list_engagements(&self, token: Option<&str>, client_id: &str) -> Result<Vec<Engagement>, TaxopsError>;

    // Engagement workspace
    async fn get_engagement(&self, token: Option<&str>, engagement_id: &str) -> Result<Engagement, TaxopsError>;
    async fn list_uploads(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<DataUpload>, TaxopsError>;
    async fn list_modules(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<AuditModule>, TaxopsError>;
    async fn list_findings(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<EngagementFinding>, TaxopsError>;
    async fn update_finding_status(
        &self,
        token: Option<&str>,
        engagement_id: &str,
        finding_id: &str,
        status: FindingStatus,
    ) -> Result<(), TaxopsError>;
    async fn run_module(&self, token: Option<&str>, engagement_id: &str, module_id: &str) -> Result<RunReceipt, TaxopsError>;

    // Reports
    async fn report_summary(&self, token: Option<&str>, engagement_id: &str) -> Result<ReportSummary, TaxopsError>;
    async fn generate_draft(&self, token: Option<&str>, engagement_id: &str) -> Result<ReportSummary, TaxopsError>;
    async fn export_link(&self, token: Option<&str>, engagement_id: &str, export: ExportType) -> Result<ExportLink, TaxopsError>;

    // Domain modules
    async fn upload(
        &self,
        token: Option<&str>,
        engagement_id: &str,
        kind: UploadKind,
        file: &UploadFile,
        fields: Option<&DocumentFields>,
    ) -> Result<IngestSummary, TaxopsError>;
    async fn domain_findings(&self, token: Option<&str>, engagement_id: &str, domain: Domain) -> Result<Vec<DomainFinding>, TaxopsError>;
    async fn list_documents(&self, token: Option<&str>, engagement_id: &str) -> Result<DocumentList, TaxopsError>;
}
