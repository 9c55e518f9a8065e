use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: String,
    pub risk: RiskLevel,
    #[serde(default)]
    pub year_end: String,
    #[serde(default)]
    pub engagements: Vec<Engagement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementStatus {
    Planning,
    Fieldwork,
    Reporting,
    Complete,
}

/// Server-computed cache of the engagement's module and finding state.
/// Read-only on this side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub data_readiness: u32,
    pub modules_run: u32,
    pub findings_open: u32,
    pub high_severity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: String,
    pub client_id: String,
    pub period: String,
    pub status: EngagementStatus,
    /// 0..=100
    pub progress: u8,
    pub risk: RiskLevel,
    #[serde(default)]
    pub summary: EngagementSummary,
}

/// Firm dashboard counters from `GET /api/firm/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmSummary {
    pub total_clients: u32,
    pub active_engagements: u32,
    pub high_severity_findings: u32,
    pub upcoming_reports: u32,
}
