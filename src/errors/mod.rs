/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Failure to obtain a table from the remote source.
///
/// Never cached: the cache leaves any prior entry untouched and hands this back.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("transport error: {0}")]
    Http(reqwest::Error),
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("unparseable response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Http(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {}", .0.join(" "))]
    Validation(Vec<String>),
    #[error("Remote data unavailable: {0}")]
    Fetch(#[from] FetchError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Fetch(err.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    fn code_and_status(&self) -> (String, StatusCode) {
        match self {
            ApiError::Validation(_) => ("INVALID_INPUT".into(), StatusCode::BAD_REQUEST),
            ApiError::Fetch(e) => {
                let code = match e {
                    FetchError::Timeout(_) => "UPSTREAM_TIMEOUT".to_string(),
                    FetchError::Status(403) => "UPSTREAM_403".to_string(),
                    FetchError::Status(404) => "UPSTREAM_404".to_string(),
                    FetchError::Status(429) => "UPSTREAM_429".to_string(),
                    FetchError::Status(500..=599) => "UPSTREAM_5XX".to_string(),
                    FetchError::Parse(_) => "UPSTREAM_PARSE".to_string(),
                    _ => "UPSTREAM_ERROR".to_string(),
                };
                (code, StatusCode::BAD_GATEWAY)
            }
            ApiError::Database(_) => ("DATABASE_ERROR".into(), StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal(_) => ("INTERNAL_ERROR".into(), StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code,
                message: self.to_string(),
                trace_id: None,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_all_problems() {
        let err = ApiError::Validation(vec![
            "Latitude must be numeric.".to_string(),
            "Days must be in the range 1 to 10.".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid input: Latitude must be numeric. Days must be in the range 1 to 10."
        );
    }

    #[test]
    fn test_upstream_codes() {
        let (code, status) = ApiError::Fetch(FetchError::Status(503)).code_and_status();
        assert_eq!(code, "UPSTREAM_5XX");
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (code, _) = ApiError::Fetch(FetchError::Parse("no table".into())).code_and_status();
        assert_eq!(code, "UPSTREAM_PARSE");
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = ApiError::Validation(vec!["x".into()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
