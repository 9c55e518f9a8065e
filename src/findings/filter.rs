use std::str::FromStr;

use serde::Serialize;

use crate::errors::TaxopsError;
use crate::models::{Finding, FindingStatus, SeverityRank};

/// One filter predicate. `All` matches every value, absent values included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn as_only(&self) -> Option<&T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    /// `"all"` (any case) or an empty string selects everything.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            trimmed.parse().map(Selection::Only)
        }
    }
}

/// Conjunction of optional predicates over severity, status and
/// domain/module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FindingFilter {
    pub severity: Selection<SeverityRank>,
    pub status: Selection<FindingStatus>,
    pub domain: Selection<String>,
}

impl FindingFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_severity(mut self, rank: SeverityRank) -> Self {
        self.severity = Selection::Only(rank);
        self
    }

    pub fn with_status(mut self, status: FindingStatus) -> Self {
        self.status = Selection::Only(status);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Selection::Only(domain.into());
        self
    }

    /// Build from the string form used by the CLI (`"all"` or a value).
    pub fn parse(severity: &str, status: &str, domain: &str) -> Result<Self, TaxopsError> {
        Ok(Self {
            severity: severity.parse()?,
            status: status.parse()?,
            domain: match domain.parse::<Selection<String>>() {
                Ok(selection) => selection,
                Err(never) => match never {},
            },
        })
    }

    pub fn is_unfiltered(&self) -> bool {
        self.severity.is_all() && self.status.is_all() && self.domain.is_all()
    }

    pub fn matches(&self, finding: &Finding) -> bool {
        let severity_ok = match &self.severity {
            Selection::All => true,
            Selection::Only(rank) => finding.rank() == *rank,
        };
        let status_ok = match &self.status {
            Selection::All => true,
            Selection::Only(status) => finding.status.as_ref() == Some(status),
        };
        let domain_ok = match &self.domain {
            Selection::All => true,
            Selection::Only(domain) => finding.domain == *domain,
        };
        severity_ok && status_ok && domain_ok
    }
}

/// Findings matching every predicate, in their original order.
pub fn filter_findings<'a>(findings: &'a [Finding], filter: &FindingFilter) -> Vec<&'a Finding> {
    findings.iter().filter(|f| filter.matches(f)).collect()
}

/// Distinct `domain` values of the loaded findings, in first-seen order.
pub fn domain_options(findings: &[Finding]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for finding in findings {
        if !options.iter().any(|d| d == &finding.domain) {
            options.push(finding.domain.clone());
        }
    }
    options
}
