use serde::Serialize;

use crate::models::Finding;
use super::aggregate::{aggregate, FindingsAggregate};
use super::filter::{domain_options, filter_findings, FindingFilter};

/// Everything a renderer needs for one findings screen, derived fresh from
/// the loaded findings on every call.
#[derive(Debug, Clone, Serialize)]
pub struct FindingsView {
    pub filter: FindingFilter,
    pub findings: Vec<Finding>,
    pub domain_options: Vec<String>,
    /// Over every loaded finding, independent of the filter.
    pub overall: FindingsAggregate,
    /// Over the filtered subset only.
    pub filtered: FindingsAggregate,
    pub loaded: usize,
    /// True when the findings were loaded before the latest ingest.
    pub stale: bool,
}

impl FindingsView {
    pub fn build(loaded: &[Finding], filter: &FindingFilter) -> Self {
        let selected = filter_findings(loaded, filter);
        Self {
            filter: filter.clone(),
            filtered: aggregate(selected.iter().copied()),
            findings: selected.into_iter().cloned().collect(),
            domain_options: domain_options(loaded),
            overall: aggregate(loaded),
            loaded: loaded.len(),
            stale: false,
        }
    }

    pub fn mark_stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
