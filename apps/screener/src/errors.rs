use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;

/// Startup-time configuration failure. Raised while loading the taxonomy,
/// the tier policy, or an operator-supplied address — never per document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Keyword group '{label}' has an empty surface form")]
    EmptySurfaceForm { label: String },

    #[error("Keyword group '{label}' has no surface forms")]
    EmptyGroup { label: String },

    #[error("Canonical label '{0}' is defined more than once")]
    DuplicateLabel(String),

    #[error("Surface form '{form}' appears in both '{first}' and '{second}'")]
    DuplicateSurfaceForm {
        form: String,
        first: String,
        second: String,
    },

    #[error("Category '{0}' is defined more than once")]
    DuplicateCategory(String),

    #[error("Category '{0}' has no keyword groups")]
    EmptyCategory(String),

    #[error("Invalid tier ladder: {0}")]
    InvalidLadder(String),

    #[error("Invalid category rules: {0}")]
    InvalidCategoryRules(String),

    #[error("Could not compile matcher for '{form}': {source}")]
    Pattern {
        form: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid e-mail address: '{0}'")]
    InvalidAddress(String),

    #[error("Unknown profile preset '{0}'")]
    UnknownPreset(String),

    #[error("Failed to read profile {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error type of the HTTP surface.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        AppError::UnprocessableEntity(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_UNREADABLE",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::Validation("bad recipient".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_extraction_error_maps_to_unprocessable() {
        let err: AppError = ExtractionError::Unreadable("bad xref".to_string()).into();
        assert!(matches!(&err, AppError::UnprocessableEntity(msg) if msg.contains("bad xref")));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
