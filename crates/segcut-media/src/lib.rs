//! yt-dlp and FFmpeg orchestration for segment extraction.
//!
//! This crate provides:
//! - Type-safe command building for the download and transcode stages
//! - Folder writability probing
//! - A two-stage piped pipeline with stderr fan-out to an [`EventSink`]

pub mod command;
pub mod error;
pub mod events;
pub mod fs_utils;
pub mod pipeline;

pub use command::{
    DownloadCommand, StageInvocation, ToolCommand, TranscodeCommand, DEFAULT_DOWNLOAD_FORMAT,
};
pub use error::{MediaError, MediaResult};
pub use events::{EventSink, MemorySink};
pub use fs_utils::{discard_partial_output, ensure_writable, FolderPolicy};
pub use pipeline::SegmentPipeline;
