//! Real-time event types pushed to WebSocket subscribers.
//!
//! Subscribers receive plain text, not JSON: the text form of each event is
//! produced by [`StreamEvent::to_text`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One of the two external processes of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Video downloader writing the muxed stream to stdout
    Download,
    /// Media transcoder trimming stdin into the segment file
    Transcode,
}

impl Stage {
    /// Tool name used to label the stage's output.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Download => "yt-dlp",
            Stage::Transcode => "ffmpeg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Transcode => "transcode",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Event broadcast to every connected subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One diagnostic line from a stage
    StageOutput { stage: Stage, line: String },

    /// Segment written successfully
    Complete { path: String },

    /// Job failed
    Error { message: String },
}

impl StreamEvent {
    /// Create a stage output event.
    pub fn stage_output(stage: Stage, line: impl Into<String>) -> Self {
        StreamEvent::StageOutput {
            stage,
            line: line.into(),
        }
    }

    /// Create a completion event.
    pub fn complete(path: impl Into<String>) -> Self {
        StreamEvent::Complete { path: path.into() }
    }

    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// Text pushed over the socket.
    pub fn to_text(&self) -> String {
        match self {
            StreamEvent::StageOutput { stage, line } => format!("{} stderr: {}", stage.label(), line),
            StreamEvent::Complete { path } => format!("Download complete: {}", path),
            StreamEvent::Error { message } => message.clone(),
        }
    }

    /// Short name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::StageOutput { .. } => "stage_output",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rendering() {
        assert_eq!(
            StreamEvent::stage_output(Stage::Download, "[download]  12.0% of 40MiB").to_text(),
            "yt-dlp stderr: [download]  12.0% of 40MiB"
        );
        assert_eq!(
            StreamEvent::stage_output(Stage::Transcode, "frame=  120").to_text(),
            "ffmpeg stderr: frame=  120"
        );
        assert_eq!(
            StreamEvent::complete("/tmp/out/ABC123_segment.mp4").to_text(),
            "Download complete: /tmp/out/ABC123_segment.mp4"
        );
        assert_eq!(
            StreamEvent::error("ffmpeg process exited with code 1").to_text(),
            "ffmpeg process exited with code 1"
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&StreamEvent::stage_output(Stage::Transcode, "x")).unwrap();
        assert!(json.contains("\"type\":\"stage_output\""));
        assert!(json.contains("\"stage\":\"transcode\""));
    }
}
