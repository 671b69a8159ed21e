//! From trait implementations for TallyError conversions

use super::types::TallyError;
use crate::store::StoreError;

impl From<std::io::Error> for TallyError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<serde_yaml::Error> for TallyError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_with_context(error.to_string(), "YAML parse")
    }
}

impl From<toml::de::Error> for TallyError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "TOML parse")
    }
}

impl From<reqwest::Error> for TallyError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        let url = error.url().map(|u| u.to_string());
        Self::Http {
            message: error.to_string(),
            url,
            status_code,
            context: None,
        }
    }
}

impl From<StoreError> for TallyError {
    fn from(error: StoreError) -> Self {
        Self::Storage {
            message: error.to_string(),
            context: Some(format!("backend error: {}", error.kind())),
        }
    }
}
