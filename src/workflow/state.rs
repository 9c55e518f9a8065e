use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{ErrorKind, TaxopsError};
use crate::models::{AuditModule, DataUpload, Domain, Engagement, Finding, ModuleStatus};

/// Error attached to a resource, kept until the next successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceError {
    pub kind: ErrorKind,
    pub error_type: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&TaxopsError> for ResourceError {
    fn from(e: &TaxopsError) -> Self {
        let classification = e.classify();
        Self {
            kind: e.kind(),
            error_type: classification.error_type,
            message: e.to_string(),
            retryable: classification.retryable,
        }
    }
}

/// Per-resource load state. A failure never discards data from an earlier
/// successful load.
#[derive(Debug, Clone, Serialize)]
pub struct Resource<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ResourceError>,
    /// Data predates the latest ingest.
    pub stale: bool,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None, stale: false }
    }
}

impl<T> Resource<T> {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
        self.stale = false;
    }

    pub fn fail(&mut self, error: &TaxopsError) {
        self.loading = false;
        self.error = Some(error.into());
    }

    pub fn mark_stale(&mut self) {
        if self.data.is_some() {
            self.stale = true;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

/// Optimistic "running" shown between a run request and reconciliation.
/// Never merged into the authoritative module list.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRun {
    pub requested_at: DateTime<Utc>,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    pub engagement: Resource<Engagement>,
    pub uploads: Resource<Vec<DataUpload>>,
    pub modules: Resource<Vec<AuditModule>>,
    pub findings: Resource<Vec<Finding>>,
    pub domain_findings: BTreeMap<Domain, Resource<Vec<Finding>>>,
    pub pending: HashMap<String, PendingRun>,
    /// Bumped on every successful ingest.
    pub ingest_epoch: u64,
    /// Ingest epoch at which each module was first seen `blocked`.
    pub blocked_since: HashMap<String, u64>,
}

impl WorkflowState {
    /// Replace the module list wholesale and track which modules are blocked.
    pub fn apply_modules(&mut self, modules: Vec<AuditModule>) {
        let epoch = self.ingest_epoch;
        self.blocked_since.retain(|id, _| {
            modules.iter().any(|m| &m.id == id && m.status == ModuleStatus::Blocked)
        });
        for module in modules.iter().filter(|m| m.status == ModuleStatus::Blocked) {
            self.blocked_since.entry(module.id.clone()).or_insert(epoch);
        }
        self.modules.succeed(modules);
    }

    pub fn module(&self, module_id: &str) -> Option<&AuditModule> {
        self.modules.data.as_ref()?.iter().find(|m| m.id == module_id)
    }

    /// A blocked module may run again only after an ingest newer than the
    /// block observation.
    pub fn block_cleared(&self, module_id: &str) -> bool {
        match self.blocked_since.get(module_id) {
            Some(since) => self.ingest_epoch > *since,
            None => true,
        }
    }

    /// A run consumed the current ingest. If the module settled back into
    /// `blocked`, the next run needs a newer ingest again.
    pub fn rearm_block(&mut self, module_id: &str) {
        if self.module(module_id).map(|m| m.status) == Some(ModuleStatus::Blocked) {
            self.blocked_since.insert(module_id.to_string(), self.ingest_epoch);
        }
    }

    /// Apply a single upload record without touching its siblings.
    pub fn apply_upload(&mut self, upload: DataUpload) {
        let Some(list) = self.uploads.data.as_mut() else {
            self.uploads.data = Some(vec![upload]);
            return;
        };
        match list.iter_mut().find(|u| u.id == upload.id) {
            Some(existing) => {
                let status = existing.status.advance(upload.status);
                *existing = DataUpload { status, ..upload };
            }
            None => list.push(upload),
        }
    }

    /// Record an ingest: later runs see a new epoch, loaded findings go stale.
    pub fn record_ingest(&mut self) {
        self.ingest_epoch += 1;
        self.findings.mark_stale();
        for resource in self.domain_findings.values_mut() {
            resource.mark_stale();
        }
    }

    pub fn findings_stale(&self) -> bool {
        self.findings.stale || self.domain_findings.values().any(|r| r.stale)
    }
}
