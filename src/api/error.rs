use crate::utils::error::{ErrorCategory, LedgerApiError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl IntoResponse for LedgerApiError {
    fn into_response(self) -> Response {
        let status = match self.category() {
            ErrorCategory::Lookup => StatusCode::NOT_FOUND,
            ErrorCategory::Connection => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                category = ?self.category(),
                suggestion = self.recovery_suggestion(),
                "Query failed"
            );
        }

        let body = Json(json!({
            "error": self.user_friendly_message()
        }));

        (status, body).into_response()
    }
}
