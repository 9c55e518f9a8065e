use crate::findings::SummaryDrift;
use crate::models::{Domain, ExportType, FindingStatus, ModuleStatus};

/// Independently loaded pieces of an engagement view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Engagement,
    Uploads,
    Modules,
    Findings,
    DomainFindings(Domain),
    Report,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engagement => f.write_str("engagement"),
            Self::Uploads => f.write_str("uploads"),
            Self::Modules => f.write_str("modules"),
            Self::Findings => f.write_str("findings"),
            Self::DomainFindings(d) => write!(f, "{} findings", d),
            Self::Report => f.write_str("report"),
        }
    }
}

/// A user-triggered action with its own loading indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Load(ResourceKind),
    RunModule(String),
    Upload(String),
    UpdateFinding(String),
    GenerateDraft,
    DownloadExport(ExportType),
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(kind) => write!(f, "load {}", kind),
            Self::RunModule(id) => write!(f, "run module {}", id),
            Self::Upload(kind) => write!(f, "upload {}", kind),
            Self::UpdateFinding(id) => write!(f, "update finding {}", id),
            Self::GenerateDraft => f.write_str("generate draft"),
            Self::DownloadExport(export) => write!(f, "download {} export", export),
        }
    }
}

/// Messages sent from the workflow and report controllers to whatever is
/// rendering them.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// An action began; its loading indicator should show.
    Started { action: ActionKind },
    /// An action completed; `items` is the number of records applied.
    Finished { action: ActionKind, items: usize },
    /// An action failed. Already-loaded data is untouched.
    Failed {
        action: ActionKind,
        error_type: &'static str,
        message: String,
        retryable: bool,
    },
    /// The backend accepted a module run.
    RunAccepted { module_id: String, run_id: String },
    /// Authoritative module state replaced the pending overlay.
    ModuleReconciled { module_id: String, status: Option<ModuleStatus> },
    /// An ingest landed; findings loaded before it are from an older snapshot.
    FindingsStale,
    FindingStatusChanged { finding_id: String, status: FindingStatus },
    SummaryDrift(SummaryDrift),
    /// A fresh, single-use export URL.
    ExportReady { export: ExportType, url: String },
}
