use std::path::Path;
use crate::errors::TaxopsError;
use super::types::TaxopsConfig;
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<TaxopsConfig, TaxopsError> {
    if !path.exists() {
        return Err(TaxopsError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(TaxopsError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Same pipeline as [`parse_config`] for YAML already in memory.
pub fn parse_config_str(content: &str) -> Result<TaxopsConfig, TaxopsError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    // An empty file is a valid, all-defaults config.
    if yaml.is_null() {
        return Ok(TaxopsConfig::default());
    }

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: TaxopsConfig = serde_yaml::from_value(yaml)?;
    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema. Advisory only: violations are
/// logged, typed deserialization decides what is fatal.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), TaxopsError> {
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| TaxopsError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| TaxopsError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| TaxopsError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &TaxopsConfig) -> Result<(), TaxopsError> {
    let base = config.api.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(TaxopsError::Config(format!(
            "api.base_url must be an http or https URL, got '{}'",
            base
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(TaxopsError::Config("api.timeout_secs must be greater than 0".into()));
    }

    if config.session.auth_bypass && config.session.token.is_some() {
        warn!("session.auth_bypass is set; configured token will be ignored");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_conflicts_rejects_non_http_base_url() {
        let mut config = TaxopsConfig::default();
        config.api.base_url = "ftp://files.taxops.test".into();
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_rejects_zero_timeout() {
        let mut config = TaxopsConfig::default();
        config.api.base_url = "https://api.taxops.test".into();
        config.api.timeout_secs = 0;
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_default_ok() {
        let mut config = TaxopsConfig::default();
        config.api.base_url = "http://localhost:8000".into();
        assert!(validate_conflicts(&config).is_ok());
    }

    #[test]
    fn test_parse_config_str_empty_is_default() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_parse_config_str_unknown_key_is_advisory() {
        let config = parse_config_str("api:\n  base_url: https://a.test\nextra: 1\n").unwrap();
        assert_eq!(config.api.base_url, "https://a.test");
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api:\n  base_url: https://api.taxops.test\n  max_retries: 4\noutput:\n  format: json"
        )
        .unwrap();
        let config = parse_config(file.path()).await.unwrap();
        assert_eq!(config.api.max_retries, 4);
        assert_eq!(config.output.format, super::super::types::OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let err = parse_config(Path::new("/nonexistent/taxops.yaml")).await.unwrap_err();
        assert!(matches!(err, TaxopsError::Config(_)));
    }
}
