use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TaxopsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Pdf,
    Xlsx,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for ExportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportType {
    type Err = TaxopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(TaxopsError::Validation(format!(
                "Unknown export type '{}'; expected pdf or xlsx",
                other
            ))),
        }
    }
}

/// One generated export. `url` is short-lived and must not be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExport {
    #[serde(rename = "type")]
    pub export_type: ExportType,
    pub url: String,
    pub generated_at: String,
}

/// Point-in-time report state for one engagement. Replaced wholesale on
/// every load or draft generation; `exports` only ever grows server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub engagement_id: String,
    pub draft_available: bool,
    #[serde(default)]
    pub last_generated_at: Option<String>,
    #[serde(default)]
    pub exports: Vec<ReportExport>,
}

/// Response of `GET /api/engagements/{id}/report/{pdf|xlsx}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLink {
    pub url: String,
}
