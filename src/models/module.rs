use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    NotStarted,
    Running,
    Completed,
    Error,
    Blocked,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Blocked => "blocked",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Blocked => "Blocked",
        }
    }

    /// States from which a client run request may move the module to
    /// `running`. `blocked` needs an upstream ingest first and is decided by
    /// the workflow controller.
    pub fn accepts_run_request(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Completed | Self::Error)
    }

    /// Outcome states a run can settle in.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Blocked)
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditModule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub module_code: String,
    pub status: ModuleStatus,
    /// 0..=100
    #[serde(default)]
    pub completion: u8,
    #[serde(default)]
    pub last_run: String,
}

/// Response of `POST /api/engagements/{id}/modules/{moduleId}/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReceipt {
    pub run_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_acceptance() {
        assert!(ModuleStatus::NotStarted.accepts_run_request());
        assert!(ModuleStatus::Completed.accepts_run_request());
        assert!(ModuleStatus::Error.accepts_run_request());
        assert!(!ModuleStatus::Running.accepts_run_request());
        assert!(!ModuleStatus::Blocked.accepts_run_request());
    }

    #[test]
    fn test_module_wire_shape() {
        let m: AuditModule = serde_json::from_value(serde_json::json!({
            "id": "m2", "name": "Expenses", "status": "blocked",
            "completion": 20, "lastRun": "Waiting for GL", "moduleCode": "EXP"
        }))
        .unwrap();
        assert_eq!(m.status, ModuleStatus::Blocked);
        assert_eq!(m.module_code, "EXP");
        assert!(m.status.is_settled());
    }
}
