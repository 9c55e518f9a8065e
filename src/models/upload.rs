use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TaxopsError;

/// Upload progression. Ordered so that a status can only move forward:
/// `NotUploaded < Uploaded < Ingested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    NotUploaded,
    Uploaded,
    Ingested,
}

impl UploadStatus {
    /// Apply `next` without ever regressing.
    pub fn advance(self, next: UploadStatus) -> UploadStatus {
        self.max(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpload {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub upload_type: String,
    pub status: UploadStatus,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Audit area with its own upload, rule-run and findings endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Books,
    Bank,
    Payroll,
    Inventory,
    Liabilities,
    Income,
    Expenses,
    Controls,
    Compliance,
    Assets,
    Documents,
}

impl Domain {
    pub const ALL: [Domain; 11] = [
        Domain::Books,
        Domain::Bank,
        Domain::Payroll,
        Domain::Inventory,
        Domain::Liabilities,
        Domain::Income,
        Domain::Expenses,
        Domain::Controls,
        Domain::Compliance,
        Domain::Assets,
        Domain::Documents,
    ];

    /// Path segment used by the backend (`/api/{domain}/...`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Bank => "bank",
            Self::Payroll => "payroll",
            Self::Inventory => "inventory",
            Self::Liabilities => "liabilities",
            Self::Income => "income",
            Self::Expenses => "expenses",
            Self::Controls => "controls",
            Self::Compliance => "compliance",
            Self::Assets => "assets",
            Self::Documents => "documents",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Books => "Books",
            Self::Bank => "Bank",
            Self::Payroll => "Payroll",
            Self::Inventory => "Inventory",
            Self::Liabilities => "Liabilities",
            Self::Income => "Income",
            Self::Expenses => "Expenses",
            Self::Controls => "Internal Controls",
            Self::Compliance => "Compliance",
            Self::Assets => "Fixed Assets",
            Self::Documents => "Documents",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = TaxopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| TaxopsError::Validation(format!("Unknown domain: {}", s)))
    }
}

/// One concrete upload endpoint: a domain plus the resource it ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    TrialBalance,
    GeneralLedger,
    BankStatement,
    PayrollEmployees,
    PayrollEntries,
    InventoryItems,
    InventoryMovements,
    Loans,
    LoanPeriods,
    ApEntries,
    IncomeEntries,
    ExpenseEntries,
    ControlJournals,
    ComplianceReturns,
    ComplianceBooks,
    AssetRegister,
    AssetDepreciation,
    Document,
}

impl UploadKind {
    pub const ALL: [UploadKind; 18] = [
        UploadKind::TrialBalance,
        UploadKind::GeneralLedger,
        UploadKind::BankStatement,
        UploadKind::PayrollEmployees,
        UploadKind::PayrollEntries,
        UploadKind::InventoryItems,
        UploadKind::InventoryMovements,
        UploadKind::Loans,
        UploadKind::LoanPeriods,
        UploadKind::ApEntries,
        UploadKind::IncomeEntries,
        UploadKind::ExpenseEntries,
        UploadKind::ControlJournals,
        UploadKind::ComplianceReturns,
        UploadKind::ComplianceBooks,
        UploadKind::AssetRegister,
        UploadKind::AssetDepreciation,
        UploadKind::Document,
    ];

    pub fn domain(&self) -> Domain {
        match self {
            Self::TrialBalance | Self::GeneralLedger => Domain::Books,
            Self::BankStatement => Domain::Bank,
            Self::PayrollEmployees | Self::PayrollEntries => Domain::Payroll,
            Self::InventoryItems | Self::InventoryMovements => Domain::Inventory,
            Self::Loans | Self::LoanPeriods | Self::ApEntries => Domain::Liabilities,
            Self::IncomeEntries => Domain::Income,
            Self::ExpenseEntries => Domain::Expenses,
            Self::ControlJournals => Domain::Controls,
            Self::ComplianceReturns | Self::ComplianceBooks => Domain::Compliance,
            Self::AssetRegister | Self::AssetDepreciation => Domain::Assets,
            Self::Document => Domain::Documents,
        }
    }

    /// Trailing path segment: `POST /api/{domain}/{engagementId}/{resource}`.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::TrialBalance => "trial-balance",
            Self::GeneralLedger => "gl",
            Self::BankStatement => "statements",
            Self::PayrollEmployees => "employees",
            Self::PayrollEntries => "entries",
            Self::InventoryItems => "items",
            Self::InventoryMovements => "movements",
            Self::Loans => "loans",
            Self::LoanPeriods => "loan-periods",
            Self::ApEntries => "ap-entries",
            Self::IncomeEntries => "entries",
            Self::ExpenseEntries => "entries",
            Self::ControlJournals => "journals",
            Self::ComplianceReturns => "returns",
            Self::ComplianceBooks => "books",
            Self::AssetRegister => "register",
            Self::AssetDepreciation => "depreciation",
            Self::Document => "upload",
        }
    }

    /// `DataUpload.type` value this kind feeds.
    pub fn upload_type(&self) -> &'static str {
        match self {
            Self::TrialBalance => "TB",
            Self::GeneralLedger => "GL",
            Self::BankStatement => "Bank",
            Self::PayrollEmployees | Self::PayrollEntries => "Payroll",
            Self::InventoryItems | Self::InventoryMovements => "Inventory",
            Self::Loans | Self::LoanPeriods | Self::ApEntries => "Liabilities",
            Self::IncomeEntries => "Income",
            Self::ExpenseEntries => "Expenses",
            Self::ControlJournals => "Controls",
            Self::ComplianceReturns | Self::ComplianceBooks => "Compliance",
            Self::AssetRegister | Self::AssetDepreciation => "Assets",
            Self::Document => "Documents",
        }
    }

    /// CLI name, e.g. `books/trial-balance`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain().as_str(), self.resource())
    }
}

impl FromStr for UploadKind {
    type Err = TaxopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        UploadKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == needle)
            .ok_or_else(|| {
                let known: Vec<String> = UploadKind::ALL.iter().map(|k| k.name()).collect();
                TaxopsError::Validation(format!(
                    "Unknown upload kind '{}'; expected one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// A file selected for upload, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes, mime: None }
    }

    pub async fn from_path(path: &Path) -> Result<Self, TaxopsError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Some("text/csv".to_string()),
            Some("pdf") => Some("application/pdf".to_string()),
            Some("xlsx") => Some(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            _ => None,
        };
        Ok(Self { file_name, bytes, mime })
    }
}

/// Optional descriptive fields sent alongside a document upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFields {
    pub doc_type: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub counterparty: Option<String>,
    pub external_ref: Option<String>,
}

impl DocumentFields {
    /// Non-empty fields as multipart text parts.
    pub fn parts(&self) -> Vec<(&'static str, String)> {
        let mut parts = Vec::new();
        if let Some(v) = &self.doc_type {
            parts.push(("type", v.clone()));
        }
        if let Some(v) = self.amount {
            parts.push(("amount", v.to_string()));
        }
        if let Some(v) = &self.date {
            parts.push(("date", v.clone()));
        }
        if let Some(v) = &self.counterparty {
            parts.push(("counterparty", v.clone()));
        }
        if let Some(v) = &self.external_ref {
            parts.push(("external_ref", v.clone()));
        }
        parts
    }
}

/// Document record from `GET /api/documents/{engagementId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub external_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentMetadata>,
}

/// Whatever an upload endpoint answers. The domain endpoints report
/// different counters (`rows_ingested`, `entries`, `loans`, ...); an
/// `upload` object, when present, is the authoritative new record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    #[serde(default)]
    pub upload: Option<DataUpload>,
    #[serde(flatten)]
    pub counters: serde_json::Map<String, serde_json::Value>,
}

impl IngestSummary {
    /// Sum of every integer counter in the response.
    pub fn total_records(&self) -> u64 {
        self.counters.values().filter_map(|v| v.as_u64()).sum()
    }
}
