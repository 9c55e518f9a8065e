use serde::{Deserialize, Serialize};

use crate::models::FindingStatus;

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firm_id: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("firm_id", &self.firm_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FirmDraft {
    pub name: String,
}

#[derive(Clone, Serialize)]
pub struct UserDraft {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

impl std::fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDraft")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Body of `POST /auth/register-firm`: a new firm plus its first user.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterFirmRequest {
    pub firm: FirmDraft,
    pub user: UserDraft,
}

impl RegisterFirmRequest {
    pub fn new(
        firm_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: Option<String>,
    ) -> Self {
        Self {
            firm: FirmDraft { name: firm_name.into() },
            user: UserDraft { email: email.into(), password: password.into(), full_name },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    #[serde(default)]
    pub message: String,
}

/// Body of `PATCH /api/engagements/{id}/findings/{findingId}`.
#[derive(Debug, Clone, Serialize)]
pub struct FindingStatusUpdate {
    pub status: FindingStatus,
}
