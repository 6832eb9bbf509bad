//! Utility functions for URL parsing and output naming.
//!
//! The output filename of a job is derived from the `v` query parameter of the
//! submitted link, so every handler and test goes through these helpers.

use thiserror::Error;
use url::Url;

/// Suffix appended to the video id to build the segment filename.
pub const SEGMENT_SUFFIX: &str = "_segment.mp4";

/// Errors that can occur during video ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoIdError {
    /// Link could not be parsed as an absolute URL
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),
    /// URL has no `v` query parameter (shortened links, embeds, channels)
    #[error("Invalid video URL: missing 'v' query parameter")]
    MissingVideoParam,
    /// `v` parameter contains characters unsafe for a filename
    #[error("Invalid video URL: video id '{0}' has invalid characters")]
    InvalidVideoId(String),
}

/// Result type for video ID extraction.
pub type VideoIdResult<T> = Result<T, VideoIdError>;

/// Extract the video ID from the `v` query parameter of a watch URL.
///
/// Only the first `v` parameter is used; anything after `&` belongs to other
/// parameters. Links without a `v` parameter are rejected rather than
/// resolved, e.g. `https://youtu.be/VIDEO_ID` yields
/// [`VideoIdError::MissingVideoParam`].
pub fn extract_video_id(link: &str) -> VideoIdResult<String> {
    let link = link.trim();
    let url = Url::parse(link).map_err(|e| VideoIdError::InvalidUrl(e.to_string()))?;

    let id = url
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(VideoIdError::MissingVideoParam)?;

    if !is_valid_video_id_chars(&id) {
        return Err(VideoIdError::InvalidVideoId(id));
    }

    Ok(id)
}

/// Filename of the trimmed segment for a video.
pub fn segment_file_name(video_id: &str) -> String {
    format!("{}{}", video_id, SEGMENT_SUFFIX)
}

/// Public retrieval path of a segment under the static `/downloads` prefix.
pub fn download_link(video_id: &str) -> String {
    format!("/downloads/{}", segment_file_name(video_id))
}

/// Check if string contains only characters that are safe in a filename
fn is_valid_video_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
