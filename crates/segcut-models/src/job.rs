//! Segment extraction job request and response types.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::timestamp::{TimeOffset, MAX_OFFSET_SECS};

/// Request body of `POST /api/extract`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_interval"))]
pub struct ExtractRequest {
    /// Source video URL (must carry a `v` query parameter)
    #[validate(url(message = "link must be a valid URL"))]
    pub link: String,
    /// Segment start
    pub start_in_seconds: TimeOffset,
    /// Segment end
    pub end_in_seconds: TimeOffset,
    /// Destination folder on the server's filesystem
    #[validate(length(min = 1, message = "folderPath cannot be empty"))]
    pub folder_path: String,
}

impl ExtractRequest {
    /// Segment length in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.end_in_seconds
            .as_secs()
            .saturating_sub(self.start_in_seconds.as_secs())
    }
}

fn validate_interval(request: &ExtractRequest) -> Result<(), ValidationError> {
    if request.start_in_seconds >= request.end_in_seconds {
        return Err(ValidationError::new("start_not_before_end")
            .with_message(Cow::Borrowed("Start time must be before end time")));
    }
    if request.end_in_seconds.as_secs() > MAX_OFFSET_SECS {
        return Err(ValidationError::new("exceeds_max_duration")
            .with_message(Cow::Borrowed("End time exceeds maximum allowed duration (24 hours)")));
    }
    Ok(())
}

/// Successful response of `POST /api/extract`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    /// Path of the segment under the static `/downloads` prefix
    pub download_link: String,
}

/// Failure body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}
