use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{redact_credentials, ApiConfig};
use crate::errors::{with_retry, RetryConfig, TaxopsError};

const SNIPPET_CHARS: usize = 200;

/// HTTP implementation of [`super::AuditBackend`].
///
/// Idempotent GETs go through [`with_retry`]; every other verb is sent once.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TaxopsError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("taxops/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TaxopsError::Config(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry_config(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
    ) -> Result<T, TaxopsError> {
        let token = require_token(token)?;
        with_retry(path, &self.retry, move || async move {
            let builder = self.http.get(self.url(path)).bearer_auth(token);
            self.execute(builder, "GET", path, Some(token)).await
        })
        .await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, TaxopsError> {
        let token = require_token(token)?;
        let mut builder = self.http.post(self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder, "POST", path, Some(token)).await
    }

    pub(crate) async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
        body: &B,
    ) -> Result<T, TaxopsError> {
        let token = require_token(token)?;
        let builder = self.http.patch(self.url(path)).bearer_auth(token).json(body);
        self.execute(builder, "PATCH", path, Some(token)).await
    }

    /// Unauthenticated POST for the login and registration endpoints.
    pub(crate) async fn post_public<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TaxopsError> {
        let builder = self.http.post(self.url(path)).json(body);
        self.execute(builder, "POST", path, None).await
    }

    /// Multipart POST. reqwest sets the multipart boundary header itself; no
    /// JSON content type is attached.
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
        form: Form,
    ) -> Result<T, TaxopsError> {
        let token = require_token(token)?;
        let builder = self.http.post(self.url(path)).bearer_auth(token).multipart(form);
        self.execute(builder, "POST", path, Some(token)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: &str,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, TaxopsError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let resp = builder.header("X-Request-Id", &request_id).send().await?;
        let status = resp.status();
        debug!(method, path, request_id = %request_id, status = status.as_u16(), "API response");

        match decode_response(resp).await {
            Ok(value) => Ok(value),
            Err(e) => {
                let message = match token {
                    Some(t) => redact_credentials(&e.to_string(), &[t]),
                    None => e.to_string(),
                };
                warn!(method, path, request_id = %request_id, error = %message, "API request failed");
                Err(e)
            }
        }
    }
}

fn require_token(token: Option<&str>) -> Result<&str, TaxopsError> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(TaxopsError::AuthRequired("No bearer token available; log in first".into())),
    }
}

async fn decode_response<T: DeserializeOwned>(resp: Response) -> Result<T, TaxopsError> {
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = resp.bytes().await?;
    decode_body(status, &content_type, &body)
}

/// Turn a status, content type and raw body into a typed value or a
/// categorized error.
pub(crate) fn decode_body<T: DeserializeOwned>(
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<T, TaxopsError> {
    let is_blank = body.iter().all(|b| b.is_ascii_whitespace());

    if !status.is_success() {
        if is_blank {
            return Err(TaxopsError::Api { status: status.as_u16(), message: status_line(status) });
        }
        return match serde_json::from_slice::<Value>(body) {
            Ok(json) => Err(TaxopsError::Api {
                status: status.as_u16(),
                message: error_message(&json).unwrap_or_else(|| status_line(status)),
            }),
            Err(_) => Err(unexpected(status, content_type, body)),
        };
    }

    let json = if is_blank {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(body).map_err(|_| unexpected(status, content_type, body))?
    };
    Ok(serde_json::from_value(json)?)
}

/// `detail` or `message` from a structured error body. FastAPI validation
/// errors put a list of `{msg}` objects under `detail`.
fn error_message(json: &Value) -> Option<String> {
    for key in ["detail", "message"] {
        match json.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) if !items.is_empty() => {
                let msgs: Vec<String> = items
                    .iter()
                    .map(|i| match i.get("msg").and_then(|m| m.as_str()) {
                        Some(m) => m.to_string(),
                        None => i.to_string(),
                    })
                    .collect();
                return Some(msgs.join("; "));
            }
            Some(Value::Object(obj)) if !obj.is_empty() => return Some(Value::Object(obj.clone()).to_string()),
            _ => {}
        }
    }
    None
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn unexpected(status: StatusCode, content_type: &str, body: &[u8]) -> TaxopsError {
    let text = String::from_utf8_lossy(body);
    let snippet: String = text.trim().chars().take(SNIPPET_CHARS).collect();
    TaxopsError::UnexpectedResponse {
        status: status.as_u16(),
        content_type: if content_type.is_empty() { "unknown".into() } else { content_type.to_string() },
        snippet,
    }
}
