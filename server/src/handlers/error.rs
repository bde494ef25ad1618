use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use system::PollError;

/// REST face of [`PollError`].
#[derive(Debug)]
pub struct ApiError(pub PollError);

impl From<PollError> for ApiError {
    fn from(err: PollError) -> Self {
        Self(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            PollError::Validation(_) => StatusCode::BAD_REQUEST,
            PollError::DuplicateAnswer => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        HttpResponse::build(self.status_code())
            .json(json!({ "success": false, "message": self.0.to_string() }))
    }
}
