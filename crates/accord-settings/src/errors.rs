//! Settings error type.

use thiserror::Error;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Failure while loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading the settings file failed.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file contained invalid JSON or mismatched types.
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_wraps() {
        let err = SettingsError::from(std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn json_error_wraps() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = SettingsError::from(parse_err);
        assert!(err.to_string().contains("failed to parse settings"));
    }
}
