//! Configuration error types shared by every constructor in the crate.

use thiserror::Error;

/// Configuration error with field path and constraint description.
///
/// Raised when an entity is constructed with parameters outside their valid
/// range. Construction errors are fatal to the entity being built and are
/// never retried.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"grids[0].sell_price"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates a new error for `field` with the given constraint message.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns a copy of this error with `prefix` prepended to the field path.
    pub fn within(self, prefix: &str) -> Self {
        Self {
            field: format!("{prefix}.{}", self.field),
            message: self.message,
        }
    }
}

/// Every violation found while validating a scenario.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} invalid setting(s): {}", .0.len(), join(.0))]
pub struct ValidationErrors(pub Vec<ConfigError>);

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for ValidationErrors {
    fn from(error: ConfigError) -> Self {
        Self(vec![error])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_field_and_message() {
        let e = ConfigError::new("utility.buy_price", "must be > 0");
        assert_eq!(e.to_string(), "config error: utility.buy_price: must be > 0");
    }

    #[test]
    fn within_prefixes_field_path() {
        let e = ConfigError::new("sell_price", "must be > 0").within("grids[2]");
        assert_eq!(e.field, "grids[2].sell_price");
    }

    #[test]
    fn validation_errors_list_every_violation() {
        let errors = ValidationErrors(vec![
            ConfigError::new("a", "bad"),
            ConfigError::new("b", "worse"),
        ]);
        let s = errors.to_string();
        assert!(s.starts_with("2 invalid setting(s)"));
        assert!(s.contains("a: bad"));
        assert!(s.contains("b: worse"));
    }
}
