use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildoutError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Unknown or duplicated ticker, vendor or sector key
    #[error("Configuration error for {key}: {reason}")]
    Configuration { key: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for BuildoutError {
    fn from(e: serde_json::Error) -> Self {
        BuildoutError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_key() {
        let err = BuildoutError::Configuration {
            key: "TSM".into(),
            reason: "no baseline".into(),
        };
        assert_eq!(err.to_string(), "Configuration error for TSM: no baseline");

        let err = BuildoutError::InvalidInput {
            field: "ramp.schedule".into(),
            reason: "empty".into(),
        };
        assert_eq!(err.to_string(), "Invalid input for ramp.schedule: empty");
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BuildoutError = parse.into();
        assert!(matches!(err, BuildoutError::SerializationError(_)));
    }
}
