use crate::errors::TaxopsError;

const DANGEROUS_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "<script",
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
];

/// Reject any string value in the config tree that contains a path traversal
/// or script/URI injection pattern.
pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), TaxopsError> {
    check_value(value, &[])
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), TaxopsError> {
    match value {
        serde_yaml::Value::String(s) => {
            let lower = s.to_lowercase();
            for pattern in DANGEROUS_PATTERNS {
                if lower.contains(pattern) {
                    let path_str = if path.is_empty() { "root".to_string() } else { path.join(".") };
                    return Err(TaxopsError::Config(format!(
                        "Dangerous pattern '{}' found at config path: {}",
                        pattern, path_str
                    )));
                }
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = k.as_str().unwrap_or("unknown").to_string();
                let mut new_path = path.to_vec();
                new_path.push(key);
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut new_path = path.to_vec();
                new_path.push(format!("[{}]", i));
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_safe_config_passes() {
        let value = yaml("api:\n  base_url: https://api.taxops.test\n  timeout_secs: 30");
        assert!(validate_security_patterns(&value).is_ok());
    }

    #[test]
    fn test_token_file_traversal_blocked() {
        let value = yaml("session:\n  token_file: ../../etc/shadow");
        let err = validate_security_patterns(&value).unwrap_err();
        assert!(err.to_string().contains("session.token_file"));
    }

    #[test]
    fn test_file_uri_base_url_blocked() {
        assert!(validate_security_patterns(&yaml("api:\n  base_url: 'file:///etc/passwd'")).is_err());
    }

    #[test]
    fn test_script_injection_blocked() {
        assert!(validate_security_patterns(&yaml("value: '<script>alert(1)</script>'")).is_err());
    }

    #[test]
    fn test_array_dangerous_pattern_blocked() {
        assert!(validate_security_patterns(&yaml("items:\n  - 'javascript:void(0)'")).is_err());
    }

    #[test]
    fn test_non_string_values_pass() {
        assert!(validate_security_patterns(&yaml("output:\n  color: false\napi:\n  max_retries: 3")).is_ok());
    }
}
