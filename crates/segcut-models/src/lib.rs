//! Shared data models for the segment extraction service.
//!
//! This crate provides Serde-serializable types for:
//! - Extraction requests and responses
//! - Time offsets (whole seconds or clock strings)
//! - Real-time stream events
//! - Video id extraction and segment naming

pub mod job;
pub mod timestamp;
pub mod utils;
pub mod ws;

// Re-export common types
pub use job::{ErrorBody, ExtractRequest, ExtractResponse};
pub use timestamp::{OffsetError, TimeOffset};
pub use utils::{
    download_link, extract_video_id, segment_file_name, VideoIdError, VideoIdResult,
};
pub use ws::{Stage, StreamEvent};
