//! Configuration-time error types

use thiserror::Error;

/// Errors raised while loading or validating service configuration.
///
/// Verification never produces these; they only surface at startup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_names_the_field() {
        let err = Error::invalid("verification.timeout_secs", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid value for `verification.timeout_secs`: must be greater than 0"
        );
    }

    #[test]
    fn io_errors_convert_with_prefix() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "keyprobe.toml missing").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_errors_convert_with_prefix() {
        let parse: std::result::Result<toml::Table, _> = toml::from_str("[server");
        let err: Error = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("TOML parse error:"), "got: {err}");
    }
}
