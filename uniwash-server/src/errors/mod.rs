pub mod api;
pub mod auth;
pub mod command;
pub mod device;
pub mod reservation;

pub use api::ApiError;
pub use auth::AuthError;
pub use command::CommandError;
pub use device::DeviceError;
pub use reservation::ReservationError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

fn internal_error(kind: &str, error: &dyn std::fmt::Display) -> (StatusCode, String, Option<String>) {
    let error_id = Uuid::new_v4();
    tracing::error!(error_id = ?error_id, "{}: {}", kind, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
        Some(error_id.to_string()),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Extract status code and error message from the specific error type
        let (status, error_message, log_message) = match self {
            ApiError::AuthError(e) => (e.status_code(), e.to_string(), None),
            ApiError::DeviceError(DeviceError::Internal(e)) => internal_error("Database error", &e),
            ApiError::DeviceError(e) => (e.status_code(), e.to_string(), None),
            ApiError::ReservationError(ReservationError::Internal(e)) => internal_error("Database error", &e),
            ApiError::ReservationError(e) => (e.status_code(), e.to_string(), None),
            ApiError::CommandError(CommandError::Internal(e)) => internal_error("Database error", &e),
            ApiError::CommandError(e) => (e.status_code(), e.to_string(), None),
            ApiError::DatabaseError(e) => internal_error("Database error", &e),
            ApiError::InternalError(e) => internal_error("Internal error", &e),
        };

        // Create a consistent JSON error response
        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        // Add error_id if available (for internal errors)
        if let Some(error_id) = log_message {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}
