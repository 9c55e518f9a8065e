use tracing::debug;

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

/// Replace every occurrence of the given secrets with `[REDACTED]`.
/// Secrets shorter than four characters are left alone.
pub fn redact_credentials(text: &str, secrets: &[&str]) -> String {
    let mut result = text.to_string();
    for secret in secrets {
        if !secret.is_empty() && secret.len() >= 4 {
            result = result.replace(secret, "[REDACTED]");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_credential_literal() {
        assert_eq!(resolve_credential("tok_live_1"), "tok_live_1");
    }

    #[test]
    fn test_resolve_credential_env_var() {
        std::env::set_var("TEST_TAXOPS_CRED", "secret123");
        assert_eq!(resolve_credential("$TEST_TAXOPS_CRED"), "secret123");
        std::env::remove_var("TEST_TAXOPS_CRED");
    }

    #[test]
    fn test_resolve_credential_missing_env_var() {
        let result = resolve_credential("$NONEXISTENT_TAXOPS_VAR");
        assert_eq!(result, "$NONEXISTENT_TAXOPS_VAR");
    }

    #[test]
    fn test_redact_credentials() {
        let text = "Bearer eyJhbGci.payload rejected";
        let redacted = redact_credentials(text, &["eyJhbGci.payload"]);
        assert_eq!(redacted, "Bearer [REDACTED] rejected");
    }

    #[test]
    fn test_redact_credentials_short_secret_ignored() {
        let text = "key=ab";
        assert_eq!(redact_credentials(text, &["ab"]), "key=ab");
    }
}
