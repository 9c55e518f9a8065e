use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxopsError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No bearer credential was available for an authenticated call.
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// Non-2xx response whose body carried a readable `detail`/`message`
    /// (or nothing at all, in which case `message` is the status line).
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered with something that is not JSON, typically an
    /// HTML error page from a proxy or dev server.
    #[error("Unexpected response ({status}, {content_type}): {snippet}")]
    UnexpectedResponse {
        status: u16,
        content_type: String,
        snippet: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Run already in flight for module {0}")]
    RunInFlight(String),

    #[error("Module {0} is blocked until an upstream upload is ingested")]
    ModuleBlocked(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for TaxopsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TaxopsError::Timeout(e.to_string())
        } else {
            TaxopsError::Network(e.to_string())
        }
    }
}

impl TaxopsError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TaxopsError::Api { status, .. } => Some(*status),
            TaxopsError::UnexpectedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the backend rejected the credential. The session context
    /// reacts to this; callers only pass the error along.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Errors that are resolved locally and never reach the network layer.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TaxopsError::Validation(_)
                | TaxopsError::Permission(_)
                | TaxopsError::AuthRequired(_)
                | TaxopsError::RunInFlight(_)
                | TaxopsError::ModuleBlocked(_)
        )
    }
}
