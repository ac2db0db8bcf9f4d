//! Unit tests for error handling
//!
//! Tests error types, conversions, and error message formatting.

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use crate::errors::Result;
    use crate::errors::VulnRagError;

    // ====== Error Type Tests ======

    #[test]
    fn test_custom_error() {
        let error = VulnRagError::Custom("Test error message".to_string());
        assert_eq!(error.to_string(), "Test error message");
        assert_eq!(error.kind(), "internal_error");
    }

    #[test]
    fn test_config_error() {
        let error = VulnRagError::ConfigError("Invalid configuration".to_string());
        assert!(error.to_string().contains("configuration"));
        assert_eq!(error.kind(), "config_error");
    }

    #[test]
    fn test_timeout_display() {
        let error = VulnRagError::Timeout {
            stage: "primary".to_string(),
            elapsed: Duration::from_secs(3),
        };
        let display = error.to_string();
        assert!(display.contains("primary"));
        assert!(display.contains("3s"));
        assert_eq!(error.kind(), "timeout");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            VulnRagError::EmbeddingError(String::new()),
            VulnRagError::IndexUnavailable(String::new()),
            VulnRagError::ModelInvocationError(String::new()),
            VulnRagError::MissingReferenceDocument(String::new()),
            VulnRagError::InvalidInfrastructure(String::new()),
            VulnRagError::InvalidInput(String::new()),
            VulnRagError::HttpError(String::new()),
        ];
        let mut kinds: Vec<&str> = errors.iter().map(VulnRagError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    // ====== Error Conversion Tests ======

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: VulnRagError = io_err.into();
        assert!(matches!(err, VulnRagError::Io(_)));
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: VulnRagError = json_err.into();
        assert!(matches!(err, VulnRagError::Serialization(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: VulnRagError = toml_err.into();
        assert_eq!(err.kind(), "config_error");
    }

    // ====== Result Type Tests ======

    #[test]
    fn test_question_mark_propagation() {
        fn parse(raw: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        assert!(parse("{}").is_ok());
        assert!(parse("nope").is_err());
    }
}
