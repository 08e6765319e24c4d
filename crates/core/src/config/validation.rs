use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },

    #[error("Unsupported configuration file '{path}'. Expected a .yaml, .yml or .json file")]
    UnsupportedFormat { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an environment error
    pub fn environment_error(message: impl Into<String>) -> Self {
        Self::EnvironmentError {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Accepts the level names understood by `tracing`
pub struct LogLevelValidator;

impl LogLevelValidator {
    pub const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
}

impl ConfigValidator<str> for LogLevelValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if Self::LEVELS.contains(&value.to_lowercase().as_str()) {
            return Ok(());
        }
        Err(ConfigError::invalid_value(
            "log_level",
            value,
            Self::LEVELS.join(", "),
        ))
    }
}

/// Type names used as priority keys must be non-empty and free of whitespace
pub struct TypeNameValidator;

impl ConfigValidator<str> for TypeNameValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "priorities",
                value,
                "a type name without whitespace",
            ));
        }
        Ok(())
    }
}

/// Parse a boolean the way environment variables usually spell them
pub(crate) fn parse_flag(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(field, value, "true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_validator() {
        assert!(LogLevelValidator.validate("debug").is_ok());
        assert!(LogLevelValidator.validate("WARN").is_ok());
        let error = LogLevelValidator.validate("loud").unwrap_err();
        assert!(error.to_string().contains("log_level"));
    }

    #[test]
    fn test_type_name_validator() {
        assert!(TypeNameValidator.validate("Physics").is_ok());
        assert!(TypeNameValidator.validate("").is_err());
        assert!(TypeNameValidator.validate("Rigid Bodies").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("x", "TRUE").unwrap());
        assert!(!parse_flag("x", "0").unwrap());
        assert!(parse_flag("x", "maybe").is_err());
    }
}
