use serde::Serialize;

use super::types::TaxopsError;

/// Closed set of failure kinds every catch site narrows to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    AuthRequired,
    Api,
    UnexpectedResponse,
    Validation,
    Permission,
    Network,
    Cancelled,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRequired => "AuthRequiredError",
            Self::Api => "ApiError",
            Self::UnexpectedResponse => "UnexpectedResponseError",
            Self::Validation => "ValidationError",
            Self::Permission => "PermissionError",
            Self::Network => "NetworkError",
            Self::Cancelled => "CancelledError",
            Self::Config => "ConfigError",
            Self::Internal => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl TaxopsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaxopsError::AuthRequired(_) => ErrorKind::AuthRequired,
            TaxopsError::Api { .. } => ErrorKind::Api,
            TaxopsError::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            TaxopsError::Validation(_)
            | TaxopsError::RunInFlight(_)
            | TaxopsError::ModuleBlocked(_) => ErrorKind::Validation,
            TaxopsError::Permission(_) => ErrorKind::Permission,
            TaxopsError::Network(_) | TaxopsError::Timeout(_) => ErrorKind::Network,
            TaxopsError::Cancelled(_) => ErrorKind::Cancelled,
            TaxopsError::Config(_) | TaxopsError::Yaml(_) => ErrorKind::Config,
            TaxopsError::Io(_) | TaxopsError::Json(_) | TaxopsError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        let retryable = match self {
            TaxopsError::Network(_) | TaxopsError::Timeout(_) => true,
            TaxopsError::Api { status, .. } => *status == 429 || *status >= 500,
            TaxopsError::UnexpectedResponse { status, .. } => *status >= 502,
            _ => false,
        };
        let error_type = match self {
            TaxopsError::Timeout(_) => "TimeoutError",
            TaxopsError::Api { status: 429, .. } => "RateLimitError",
            TaxopsError::RunInFlight(_) => "RunInFlightError",
            TaxopsError::ModuleBlocked(_) => "ModuleBlockedError",
            other => other.kind().as_str(),
        };
        ErrorClassification { error_type, retryable }
    }
}
