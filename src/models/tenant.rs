use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Firm-level role. Roles arrive from the backend as plain strings; ones this
/// client does not know about are kept as `Unknown` and grant nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Partner,
    Manager,
    Senior,
    ClientAdmin,
    Owner,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Partner => "partner",
            Self::Manager => "manager",
            Self::Senior => "senior",
            Self::ClientAdmin => "client_admin",
            Self::Owner => "owner",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse used for role lists from `/auth/me`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "partner" => Self::Partner,
            "manager" => Self::Manager,
            "senior" | "staff" => Self::Senior,
            "client_admin" => Self::ClientAdmin,
            "owner" => Self::Owner,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level tenant and isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firm {
    pub id: String,
    pub name: String,
}

/// Authenticated identity as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
    pub firm_id: String,
}

impl User {
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|r| self.roles.contains(r))
    }
}

/// `user` block of the `/auth/me` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Response of `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: AuthUser,
    pub firm: Firm,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl MeResponse {
    /// Flatten the wire shape into a `User` bound to its firm.
    pub fn to_user(&self) -> User {
        let name = self
            .user
            .full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.user.email.clone());
        User {
            id: self.user.id.clone(),
            name,
            email: self.user.email.clone(),
            roles: self.roles.iter().map(|r| Role::parse(r)).collect(),
            firm_id: self.firm.id.clone(),
        }
    }
}

/// Response of `POST /auth/login` and `POST /auth/register-firm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}
