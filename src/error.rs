use serde_json::json;
use thiserror::Error;

/// Failure of a core operation. Every request either succeeds or returns one of these.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{message}")]
    NotFound {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{message}")]
    Integrity {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error(transparent)]
    Persistence(#[from] rusqlite::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound {
            message: message.into(),
            details: None,
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        CoreError::Integrity {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(self, d: serde_json::Value) -> Self {
        match self {
            CoreError::Validation { message, .. } => CoreError::Validation {
                message,
                details: Some(d),
            },
            CoreError::NotFound { message, .. } => CoreError::NotFound {
                message,
                details: Some(d),
            },
            CoreError::Integrity { message, .. } => CoreError::Integrity {
                message,
                details: Some(d),
            },
            other => other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation { .. } => "validation_error",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Integrity { .. } => "integrity_error",
            CoreError::Persistence(_) => "persistence_error",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            CoreError::Validation { details, .. }
            | CoreError::NotFound { details, .. }
            | CoreError::Integrity { details, .. } => details.clone(),
            CoreError::Persistence(e) => Some(json!({ "sqlite": e.to_string() })),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_error_kind() {
        assert_eq!(CoreError::validation("x").code(), "validation_error");
        assert_eq!(CoreError::not_found("x").code(), "not_found");
        assert_eq!(CoreError::integrity("x").code(), "integrity_error");
        let e: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(e.code(), "persistence_error");
    }

    #[test]
    fn details_are_attached_to_domain_errors() {
        let e = CoreError::integrity("class has students").with_details(json!({ "students": 3 }));
        assert_eq!(e.details(), Some(json!({ "students": 3 })));
        assert_eq!(e.to_string(), "class has students");
    }
}
