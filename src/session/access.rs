use serde::{Deserialize, Serialize};

use crate::models::{Role, User};

/// Client-side gated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewWorkspace,
    UploadData,
    RunModule,
    UpdateFindingStatus,
    GenerateDraft,
}

const RUNNERS: &[Role] = &[Role::Manager, Role::Partner, Role::Owner];
const REVIEWERS: &[Role] = &[Role::Partner, Role::Manager, Role::Senior, Role::Owner];
const UPLOADERS: &[Role] = &[
    Role::Partner,
    Role::Manager,
    Role::Senior,
    Role::ClientAdmin,
    Role::Owner,
];

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewWorkspace => "view workspace",
            Self::UploadData => "upload data",
            Self::RunModule => "run module",
            Self::UpdateFindingStatus => "update finding status",
            Self::GenerateDraft => "generate draft report",
        }
    }

    /// Roles allowed to perform the action. `None` means any authenticated
    /// user.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Self::ViewWorkspace => None,
            Self::UploadData => Some(UPLOADERS),
            Self::RunModule | Self::GenerateDraft => Some(RUNNERS),
            Self::UpdateFindingStatus => Some(REVIEWERS),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn permits(user: &User, action: Action) -> bool {
    match action.allowed_roles() {
        None => true,
        Some(allowed) => user.has_any_role(allowed),
    }
}

/// Human-readable reason for a denied action.
pub fn denial_message(user: &User, action: Action) -> String {
    let held: Vec<&str> = user.roles.iter().map(|r| r.as_str()).collect();
    let needed: Vec<&str> = action
        .allowed_roles()
        .unwrap_or(&[])
        .iter()
        .map(|r| r.as_str())
        .collect();
    format!(
        "{} may not {} (roles: [{}]; requires one of: {})",
        user.email,
        action,
        held.join(", "),
        needed.join(", ")
    )
}
