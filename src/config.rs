use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Process settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub workspace: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace = env_optional("GRADEBOOKD_WORKSPACE").map(PathBuf::from);
        let log_level =
            env_optional("GRADEBOOKD_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_json = match env_optional("GRADEBOOKD_LOG_JSON") {
            Some(v) => parse_bool("GRADEBOOKD_LOG_JSON", v)?,
            None => false,
        };

        Ok(Self {
            workspace,
            log_level,
            log_json,
        })
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "TRUE".into()).unwrap());
        assert!(parse_bool("X", "on".into()).unwrap());
        assert!(!parse_bool("X", "0".into()).unwrap());
        let e = parse_bool("X", "maybe".into()).unwrap_err();
        assert_eq!(e.to_string(), "invalid value for X: maybe");
    }
}
