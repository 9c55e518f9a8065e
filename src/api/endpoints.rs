use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::errors::TaxopsError;
use crate::models::{
    AuditModule, Client, DataUpload, Domain, DocumentFields, DocumentList, DomainFinding,
    Engagement, EngagementFinding, ExportLink, ExportType, FindingStatus, FirmSummary,
    IngestSummary, MeResponse, ReportSummary, RunReceipt, TokenResponse, UploadFile, UploadKind,
};
use super::backend::AuditBackend;
use super::client::ApiClient;
use super::requests::{
    FindingStatusUpdate, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    RegisterFirmRequest,
};

/// Domain endpoints answer either a bare list or `{ "findings": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DomainFindingsBody {
    List(Vec<DomainFinding>),
    Wrapped { findings: Vec<DomainFinding> },
}

impl From<DomainFindingsBody> for Vec<DomainFinding> {
    fn from(body: DomainFindingsBody) -> Self {
        match body {
            DomainFindingsBody::List(items) => items,
            DomainFindingsBody::Wrapped { findings } => findings,
        }
    }
}

fn upload_form(file: &UploadFile, fields: Option<&DocumentFields>) -> Result<Form, TaxopsError> {
    let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    if let Some(mime) = &file.mime {
        part = part
            .mime_str(mime)
            .map_err(|e| TaxopsError::Validation(format!("Invalid MIME type '{}': {}", mime, e)))?;
    }
    let mut form = Form::new().part("file", part);
    if let Some(fields) = fields {
        for (name, value) in fields.parts() {
            form = form.text(name, value);
        }
    }
    Ok(form)
}

#[async_trait]
impl AuditBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, TaxopsError> {
        self.post_public("/auth/login", request).await
    }

    async fn register_firm(&self, request: &RegisterFirmRequest) -> Result<TokenResponse, TaxopsError> {
        self.post_public("/auth/register-firm", request).await
    }

    async fn me(&self, token: Option<&str>) -> Result<MeResponse, TaxopsError> {
        self.get(token, "/auth/me").await
    }

    async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse, TaxopsError> {
        let body = ForgotPasswordRequest { email: email.to_string() };
        self.post_public("/auth/forgot-password", &body).await
    }

    async fn firm_summary(&self, token: Option<&str>) -> Result<FirmSummary, TaxopsError> {
        self.get(token, "/api/firm/summary").await
    }

    async fn list_clients(&self, token: Option<&str>) -> Result<Vec<Client>, TaxopsError> {
        self.get(token, "/api/clients").await
    }

    async fn get_client(&self, token: Option<&str>, client_id: &str) -> Result<Client, TaxopsError> {
        self.get(token, &format!("/api/clients/{}", client_id)).await
    }

    async fn list_engagements(&self, token: Option<&str>, client_id: &str) -> Result<Vec<Engagement>, TaxopsError> {
        self.get(token, &format!("/api/clients/{}/engagements", client_id)).await
    }

    async fn get_engagement(&self, token: Option<&str>, engagement_id: &str) -> Result<Engagement, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}", engagement_id)).await
    }

    async fn list_uploads(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<DataUpload>, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}/uploads", engagement_id)).await
    }

    async fn list_modules(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<AuditModule>, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}/modules", engagement_id)).await
    }

    async fn list_findings(&self, token: Option<&str>, engagement_id: &str) -> Result<Vec<EngagementFinding>, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}/findings", engagement_id)).await
    }

    async fn update_finding_status(
        &self,
        token: Option<&str>,
        engagement_id: &str,
        finding_id: &str,
        status: FindingStatus,
    ) -> Result<(), TaxopsError> {
        let path = format!("/api/engagements/{}/findings/{}", engagement_id, finding_id);
        let _: serde_json::Value = self.patch(token, &path, &FindingStatusUpdate { status }).await?;
        info!(engagement_id, finding_id, status = %status, "Finding status updated");
        Ok(())
    }

    async fn run_module(&self, token: Option<&str>, engagement_id: &str, module_id: &str) -> Result<RunReceipt, TaxopsError> {
        let path = format!("/api/engagements/{}/modules/{}/run", engagement_id, module_id);
        let receipt: RunReceipt = self.post::<(), _>(token, &path, None).await?;
        info!(engagement_id, module_id, run_id = %receipt.run_id, "Module run accepted");
        Ok(receipt)
    }

    async fn report_summary(&self, token: Option<&str>, engagement_id: &str) -> Result<ReportSummary, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}/report/summary", engagement_id)).await
    }

    async fn generate_draft(&self, token: Option<&str>, engagement_id: &str) -> Result<ReportSummary, TaxopsError> {
        let path = format!("/api/engagements/{}/report/draft", engagement_id);
        self.post::<(), _>(token, &path, None).await
    }

    async fn export_link(&self, token: Option<&str>, engagement_id: &str, export: ExportType) -> Result<ExportLink, TaxopsError> {
        self.get(token, &format!("/api/engagements/{}/report/{}", engagement_id, export.as_str())).await
    }

    async fn upload(
        &self,
        token: Option<&str>,
        engagement_id: &str,
        kind: UploadKind,
        file: &UploadFile,
        fields: Option<&DocumentFields>,
    ) -> Result<IngestSummary, TaxopsError> {
        let path = format!("/api/{}/{}/{}", kind.domain().as_str(), engagement_id, kind.resource());
        let form = upload_form(file, fields)?;
        let summary: IngestSummary = self.post_multipart(token, &path, form).await?;
        info!(
            engagement_id,
            domain = %kind.domain(),
            resource = kind.resource(),
            records = summary.total_records(),
            "Upload ingested"
        );
        Ok(summary)
    }

    async fn domain_findings(&self, token: Option<&str>, engagement_id: &str, domain: Domain) -> Result<Vec<DomainFinding>, TaxopsError> {
        let body: DomainFindingsBody = self
            .get(token, &format!("/api/{}/{}/findings", domain.as_str(), engagement_id))
            .await?;
        Ok(body.into())
    }

    async fn list_documents(&self, token: Option<&str>, engagement_id: &str) -> Result<DocumentList, TaxopsError> {
        self.get(token, &format!("/api/documents/{}", engagement_id)).await
    }
}
