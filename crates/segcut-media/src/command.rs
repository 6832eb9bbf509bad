//! Command builders for the downloader and transcoder stages.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use segcut_models::Stage;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Default downloader format selector (720p H.264 video + AAC audio).
pub const DEFAULT_DOWNLOAD_FORMAT: &str = "136+140";

/// Program plus leading arguments used to launch an external tool.
///
/// Leading arguments allow launchers such as `python3 -m yt_dlp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    base_args: Vec<String>,
}

impl ToolCommand {
    /// Create a tool command from a bare program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command line, e.g. `python3 -m yt_dlp`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            base_args: parts.collect(),
        })
    }

    /// Add leading arguments placed before the stage arguments.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn base_args(&self) -> &[String] {
        &self.base_args
    }

    /// Resolve the program on `PATH`.
    pub fn resolve(&self, stage: Stage) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::ToolNotFound(stage))
    }
}

/// A fully built invocation of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    stage: Stage,
    program: String,
    args: Vec<String>,
}

impl StageInvocation {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Command line for logging.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Build a tokio command with stderr captured.
    ///
    /// The caller decides how stdin and stdout are wired.
    pub(crate) fn to_command(&self, stdin: Stdio, stdout: Stdio) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Builder for the downloader stage.
///
/// Produces `<tool> -f <format> -o - <url>`, streaming the muxed result to stdout.
#[derive(Debug, Clone)]
pub struct DownloadCommand {
    tool: ToolCommand,
    url: String,
    format: String,
}

impl DownloadCommand {
    pub fn new(tool: ToolCommand, url: impl Into<String>) -> Self {
        Self {
            tool,
            url: url.into(),
            format: DEFAULT_DOWNLOAD_FORMAT.to_string(),
        }
    }

    /// Set the format selector.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn build(&self) -> StageInvocation {
        let mut args = self.tool.base_args().to_vec();
        args.push("-f".to_string());
        args.push(self.format.clone());
        args.push("-o".to_string());
        args.push("-".to_string());
        args.push(self.url.clone());

        StageInvocation {
            stage: Stage::Download,
            program: self.tool.program().to_string(),
            args,
        }
    }
}

/// Builder for the transcoder stage.
///
/// Reads the downloader stream from stdin, trims it to `[start, end]` with
/// codec copy and writes the output file.
#[derive(Debug, Clone)]
pub struct TranscodeCommand {
    tool: ToolCommand,
    output: PathBuf,
    start_secs: u64,
    end_secs: u64,
}

impl TranscodeCommand {
    pub fn new(tool: ToolCommand, output: impl AsRef<Path>, start_secs: u64, end_secs: u64) -> Self {
        Self {
            tool,
            output: output.as_ref().to_path_buf(),
            start_secs,
            end_secs,
        }
    }

    pub fn build(&self) -> StageInvocation {
        let mut args = self.tool.base_args().to_vec();

        // Without -y ffmpeg would ask for confirmation on its piped stdin
        args.extend(
            [
                "-y",
                "-i",
                "pipe:0",
                "-ss",
                &self.start_secs.to_string(),
                "-to",
                &self.end_secs.to_string(),
                "-c",
                "copy",
            ]
            .map(str::to_string),
        );
        args.push(self.output.to_string_lossy().to_string());

        StageInvocation {
            stage: Stage::Transcode,
            program: self.tool.program().to_string(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_command_builder() {
        let cmd = DownloadCommand::new(
            ToolCommand::new("yt-dlp"),
            "https://www.youtube.com/watch?v=ABC123",
        )
        .build();

        assert_eq!(cmd.stage(), Stage::Download);
        assert_eq!(cmd.program(), "yt-dlp");
        assert_eq!(
            cmd.args(),
            ["-f", "136+140", "-o", "-", "https://www.youtube.com/watch?v=ABC123"]
        );
    }

    #[test]
    fn test_download_command_custom_format() {
        let cmd = DownloadCommand::new(ToolCommand::new("yt-dlp"), "https://x.test/watch?v=a")
            .format("best")
            .build();

        assert_eq!(cmd.args(), ["-f", "best", "-o", "-", "https://x.test/watch?v=a"]);
    }

    #[test]
    fn test_transcode_command_builder() {
        let cmd = TranscodeCommand::new(
            ToolCommand::new("ffmpeg"),
            "/tmp/out/ABC123_segment.mp4",
            10,
            20,
        )
        .build();

        assert_eq!(cmd.stage(), Stage::Transcode);
        assert_eq!(
            cmd.display(),
            "ffmpeg -y -i pipe:0 -ss 10 -to 20 -c copy /tmp/out/ABC123_segment.mp4"
        );
    }

    #[test]
    fn test_tool_command_parse() {
        let tool = ToolCommand::parse("python3 -m yt_dlp").unwrap();
        assert_eq!(tool.program(), "python3");
        assert_eq!(tool.base_args(), ["-m", "yt_dlp"]);

        let cmd = DownloadCommand::new(tool, "https://x.test/watch?v=a").build();
        assert_eq!(cmd.program(), "python3");
        assert_eq!(&cmd.args()[..3], ["-m", "yt_dlp", "-f"]);

        assert!(ToolCommand::parse("   ").is_none());
    }

    #[test]
    fn test_resolve_missing_tool() {
        let tool = ToolCommand::new("definitely-not-a-real-tool-segcut");
        assert!(matches!(
            tool.resolve(Stage::Download),
            Err(MediaError::ToolNotFound(Stage::Download))
        ));
    }
}
