//! Error handling for the shelf HTTP layer
//!
//! Handlers return [`AppError`]; its [`IntoResponse`] implementation plays the
//! role of a responder chain. Errors carrying 400 go to the bad-request
//! responder, 404 to the not-found responder, and everything else falls
//! through to the catch-all.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shelf_store::StoreError;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::ValidationErrors;

/// Body rendered for every 404, whatever the handler said.
pub const NOT_FOUND_MESSAGE: &str = "Resource not found!";

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a validation error from `validator` output, one detail per failed field
    pub fn invalid_input(errors: &ValidationErrors) -> Self {
        let mut details: Vec<(String, serde_json::Value)> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                let field = field.to_string();
                field_errors.iter().map(move |error| {
                    let reason = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    (
                        field.clone(),
                        json!({ "field": field.clone(), "error": reason }),
                    )
                })
            })
            .collect();
        details.sort_by(|a, b| a.0.cmp(&b.0));

        Self::validation(
            details.into_iter().map(|(_, detail)| detail).collect(),
            "Invalid input",
        )
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Status code this error asks the responder for
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::BadRequest { code, .. }
            | AppError::NotFound { code, .. } => code,
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// Everything a responder needs to render one error
struct Envelope {
    status: StatusCode,
    code: String,
    message: String,
    details: Vec<serde_json::Value>,
    trace_id: Uuid,
}

impl Envelope {
    fn render(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "details": self.details,
                "trace_id": self.trace_id.to_string(),
                "timestamp": OffsetDateTime::now_utc().to_string()
            }
        });

        (self.status, Json(body)).into_response()
    }
}

fn respond_bad_request(envelope: Envelope) -> Response {
    envelope.render()
}

fn respond_not_found(envelope: Envelope) -> Response {
    Envelope {
        message: NOT_FOUND_MESSAGE.to_string(),
        details: Vec::new(),
        ..envelope
    }
    .render()
}

fn respond_fallback(envelope: Envelope) -> Response {
    // In production, hide internal error details
    let message = if cfg!(not(debug_assertions))
        && envelope.status == StatusCode::INTERNAL_SERVER_ERROR
    {
        "An internal server error occurred".to_string()
    } else {
        envelope.message
    };

    Envelope { message, ..envelope }.render()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::new_v4();
        let status = self.status_code();
        let code = self.code().to_string();

        if status.is_server_error() {
            tracing::error!(
                trace_id = %trace_id,
                error_code = %code,
                status_code = %status.as_u16(),
                error = %self,
                "Request error"
            );
        } else {
            tracing::warn!(
                trace_id = %trace_id,
                error_code = %code,
                status_code = %status.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let (message, details) = match self {
            AppError::Validation {
                details, message, ..
            } => (message, details),
            AppError::BadRequest { message, .. } | AppError::NotFound { message, .. } => {
                (message, Vec::new())
            }
            other @ (AppError::Storage(_) | AppError::Internal(_)) => {
                (other.to_string(), Vec::new())
            }
        };

        let envelope = Envelope {
            status,
            code,
            message,
            details,
            trace_id,
        };

        match status {
            StatusCode::BAD_REQUEST => respond_bad_request(envelope),
            StatusCode::NOT_FOUND => respond_not_found(envelope),
            _ => respond_fallback(envelope),
        }
    }
}

/// Result alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 3, message = "Username is too short!"))]
        username: String,
        #[validate(length(min = 3))]
        comment: String,
    }

    #[test]
    fn test_validation_error() {
        let details = vec![json!({"field": "title", "error": "required"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_invalid_input_lists_fields_in_order() {
        let payload = Payload {
            username: "ab".to_string(),
            comment: "".to_string(),
        };
        let errors = payload.validate().unwrap_err();

        let AppError::Validation { details, .. } = AppError::invalid_input(&errors) else {
            panic!("Expected Validation error");
        };

        assert_eq!(
            details,
            vec![
                json!({"field": "comment", "error": "length"}),
                json!({"field": "username", "error": "Username is too short!"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_request_renders_message() {
        let response = AppError::bad_request("Book already in db").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["message"], "Book already in db");
        assert!(body["error"]["trace_id"].is_string());
        assert!(body["error"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_not_found_renders_fixed_message() {
        let response = AppError::not_found("no book with asin 42").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], NOT_FOUND_MESSAGE);
        assert_eq!(body["error"]["details"], json!([]));
    }

    #[test]
    fn test_internal_error_mapping() {
        let internal_error = anyhow::anyhow!("disk on fire");
        let response = AppError::Internal(internal_error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_storage_error_mapping() {
        let error = AppError::from(StoreError::Serialize(serde_json::Error::io(
            std::io::Error::other("boom"),
        )));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "storage_error");
    }
}
