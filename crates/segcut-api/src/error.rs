//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use segcut_media::MediaError;
use segcut_models::{ErrorBody, VideoIdError};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    /// Destination folder failed the write test.
    #[error("Error checking folder permissions: {0}")]
    FolderPermission(#[source] MediaError),

    /// Link has no usable video id.
    #[error("{0}")]
    InvalidVideoUrl(#[from] VideoIdError),

    /// Spawn failure or non-zero exit of a stage.
    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::FolderPermission(_)
            | ApiError::InvalidVideoUrl(_)
            | ApiError::Media(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use segcut_models::Stage;

    #[test]
    fn test_messages_match_client_contract() {
        let folder = ApiError::FolderPermission(MediaError::FolderNotWritable {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(
            folder.to_string(),
            "Error checking folder permissions: Folder is not writable"
        );
        assert_eq!(folder.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let exit = ApiError::from(MediaError::stage_failed(Stage::Transcode, Some(1)));
        assert_eq!(exit.to_string(), "ffmpeg process exited with code 1");
        assert_eq!(exit.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let url = ApiError::from(VideoIdError::MissingVideoParam);
        assert_eq!(url.to_string(), "Invalid video URL: missing 'v' query parameter");
    }

    #[test]
    fn test_client_errors_are_4xx() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
