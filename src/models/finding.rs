use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::TaxopsError;
use super::upload::Domain;

/// Severity label exactly as a source reported it. Engagement findings use
/// `critical/major/minor/warning/info`, domain findings use
/// `critical/high/medium/low` (sometimes upper-cased). Both vocabularies are
/// kept verbatim for display and compared through [`SeverityRank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FindingSeverity {
    Critical,
    Major,
    High,
    Medium,
    Minor,
    Low,
    Warning,
    Info,
}

/// The single ordered scale used for filtering and aggregation.
/// Ascending: `Info < Warning < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityRank {
    Info,
    Warning,
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityRank {
    /// Every rank, most severe first.
    pub const DESCENDING: [SeverityRank; 6] = [
        SeverityRank::Critical,
        SeverityRank::High,
        SeverityRank::Medium,
        SeverityRank::Low,
        SeverityRank::Warning,
        SeverityRank::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for SeverityRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FindingSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Minor => "minor",
            Self::Low => "low",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Position on the shared scale. `major` and `high` share a rank, as do
    /// `minor` and `low`.
    pub fn rank(&self) -> SeverityRank {
        crate::findings::normalize::rank_of(*self)
    }
}

impl std::fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingSeverity {
    type Err = TaxopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "major" => Ok(Self::Major),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "minor" => Ok(Self::Minor),
            "low" => Ok(Self::Low),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(TaxopsError::Validation(format!("Unknown severity: {}", other))),
        }
    }
}

impl TryFrom<String> for FindingSeverity {
    type Error = TaxopsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FindingSeverity> for String {
    fn from(value: FindingSeverity) -> Self {
        value.as_str().to_string()
    }
}

/// Review state; the only field of a finding that may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    InReview,
    Closed,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InReview => "in_review",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingStatus {
    type Err = TaxopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "open" => Ok(Self::Open),
            "in_review" => Ok(Self::InReview),
            "closed" | "resolved" => Ok(Self::Closed),
            other => Err(TaxopsError::Validation(format!("Unknown finding status: {}", other))),
        }
    }
}

/// Which stream a normalized finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    /// `GET /api/engagements/{id}/findings`
    Engagement,
    /// `GET /api/{domain}/{engagementId}/findings`
    Domain,
}

/// Generic finding as served by the engagement findings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementFinding {
    pub id: String,
    pub rule_id: String,
    pub summary: String,
    pub severity: FindingSeverity,
    pub module: String,
    #[serde(default)]
    pub status: Option<FindingStatus>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Module-specific finding as served by the domain endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFinding {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub severity: FindingSeverity,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub status: Option<FindingStatus>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub account_code: Option<String>,
}

/// The one normalized finding shape the aggregation engine works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub code: String,
    pub message: String,
    pub severity: FindingSeverity,
    /// Domain for domain findings, module name for engagement findings.
    pub domain: String,
    pub status: Option<FindingStatus>,
    pub metadata: Map<String, Value>,
    pub transaction_id: Option<String>,
    pub account_code: Option<String>,
    pub source: FindingSource,
}

impl Finding {
    pub fn rank(&self) -> SeverityRank {
        self.severity.rank()
    }
}

impl From<EngagementFinding> for Finding {
    fn from(f: EngagementFinding) -> Self {
        let mut metadata = Map::new();
        for (key, value) in [
            ("assignee", f.assignee),
            ("evidence", f.evidence),
            ("description", f.description),
        ] {
            if let Some(v) = value {
                metadata.insert(key.to_string(), Value::String(v));
            }
        }
        Finding {
            id: f.id,
            code: f.rule_id,
            message: f.summary,
            severity: f.severity,
            domain: f.module,
            status: f.status,
            metadata,
            transaction_id: None,
            account_code: None,
            source: FindingSource::Engagement,
        }
    }
}

impl DomainFinding {
    /// Normalize, using `fallback` when the record does not name its domain.
    pub fn into_finding(self, fallback: Domain) -> Finding {
        let domain = self
            .domain
            .filter(|d| !d.trim().is_empty())
            .map(|d| d.to_ascii_lowercase())
            .unwrap_or_else(|| fallback.as_str().to_string());
        Finding {
            id: self.id,
            code: self.code,
            message: self.message,
            severity: self.severity,
            domain,
            status: self.status,
            metadata: self.metadata,
            transaction_id: self.transaction_id,
            account_code: self.account_code,
            source: FindingSource::Domain,
        }
    }
}
