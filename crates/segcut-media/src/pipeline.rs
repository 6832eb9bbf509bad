//! Two-stage piped subprocess orchestration.
//!
//! The downloader's stdout is streamed into the transcoder's stdin by a copy
//! task, so the payload is never buffered in full. Both stderr streams are
//! forwarded line by line to an [`EventSink`].
//!
//! Terminal rules:
//! - the transcoder's exit status decides the job whenever it exits first
//! - a downloader that fails while the pipe is still intact aborts the job and
//!   kills the transcoder, which would otherwise trim a truncated stream
//! - a transcoder that finishes first (the trim end was reached) ends the job;
//!   the downloader is killed

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use segcut_models::{Stage, StreamEvent};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::StageInvocation;
use crate::error::{MediaError, MediaResult};
use crate::events::EventSink;
use crate::fs_utils::discard_partial_output;

/// How long to wait for stderr readers after both stages are done.
///
/// Grandchildren of a stage can keep its stderr open after the stage exits.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a download stage piped into a transcode stage.
#[derive(Debug, Clone)]
pub struct SegmentPipeline {
    drain_timeout: Duration,
}

impl Default for SegmentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

enum FirstExit {
    Downloader(std::io::Result<ExitStatus>),
    Transcoder(std::io::Result<ExitStatus>),
}

impl SegmentPipeline {
    pub fn new() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Set how long stderr readers may lag behind process exit.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Run both stages and publish the terminal event.
    ///
    /// Returns the output path on success. On failure the partial output is
    /// removed and the error is also published as [`StreamEvent::Error`].
    pub async fn run(
        &self,
        download: &StageInvocation,
        transcode: &StageInvocation,
        output: &Path,
        sink: Arc<dyn EventSink>,
    ) -> MediaResult<PathBuf> {
        let start = Instant::now();
        let result = self.execute(download, transcode, Arc::clone(&sink)).await;

        match result {
            Ok(()) => {
                info!(
                    output = %output.display(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Segment created"
                );
                sink.publish(StreamEvent::complete(output.display().to_string()))
                    .await;
                Ok(output.to_path_buf())
            }
            Err(e) => {
                warn!(
                    output = %output.display(),
                    stage = e.stage().map(|s| s.label()).unwrap_or("-"),
                    "Segment job failed: {}",
                    e
                );
                discard_partial_output(output).await;
                sink.publish(StreamEvent::error(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        download: &StageInvocation,
        transcode: &StageInvocation,
        sink: Arc<dyn EventSink>,
    ) -> MediaResult<()> {
        debug!("Running download stage: {}", download.display());
        let mut downloader = download
            .to_command(Stdio::null(), Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::spawn(Stage::Download, e))?;

        debug!("Running transcode stage: {}", transcode.display());
        let mut transcoder = match transcode.to_command(Stdio::piped(), Stdio::null()).spawn() {
            Ok(child) => child,
            Err(e) => {
                let _ = downloader.kill().await;
                return Err(MediaError::spawn(Stage::Transcode, e));
            }
        };

        // Children are kill_on_drop, so early returns below do not leak processes
        let download_out = downloader.stdout.take().ok_or(MediaError::MissingStream {
            stage: Stage::Download,
            stream: "stdout",
        })?;
        let transcode_in = transcoder.stdin.take().ok_or(MediaError::MissingStream {
            stage: Stage::Transcode,
            stream: "stdin",
        })?;
        let download_err = downloader.stderr.take().ok_or(MediaError::MissingStream {
            stage: Stage::Download,
            stream: "stderr",
        })?;
        let transcode_err = transcoder.stderr.take().ok_or(MediaError::MissingStream {
            stage: Stage::Transcode,
            stream: "stderr",
        })?;

        let pipe_broken = Arc::new(AtomicBool::new(false));
        let pipe_task = tokio::spawn(pump(download_out, transcode_in, Arc::clone(&pipe_broken)));

        let readers = [
            tokio::spawn(forward_stderr(Stage::Download, download_err, Arc::clone(&sink))),
            tokio::spawn(forward_stderr(Stage::Transcode, transcode_err, sink)),
        ];

        let outcome = await_exit(&mut downloader, &mut transcoder, &pipe_broken).await;

        pipe_task.abort();
        self.drain(readers).await;

        outcome
    }

    /// Wait for both stderr readers; a reader still running at the deadline is
    /// aborted so nothing is published after the terminal event.
    async fn drain(&self, readers: [JoinHandle<usize>; 2]) {
        let deadline = Instant::now() + self.drain_timeout;
        for mut reader in readers {
            match tokio::time::timeout_at(deadline.into(), &mut reader).await {
                Ok(Ok(lines)) => debug!(lines, "Stage output drained"),
                Ok(Err(e)) => warn!("Stage output reader failed: {}", e),
                Err(_) => {
                    reader.abort();
                    // Resolves once the task has actually stopped
                    let _ = reader.await;
                    warn!(
                        "Stage output still open after {:?}, reader aborted",
                        self.drain_timeout
                    );
                }
            }
        }
    }
}

/// Wait until the job's outcome is known, killing the other stage as needed.
async fn await_exit(
    downloader: &mut Child,
    transcoder: &mut Child,
    pipe_broken: &AtomicBool,
) -> MediaResult<()> {
    // Downloader first: when both have exited, its failure explains the transcoder's
    let first = tokio::select! {
        biased;
        status = downloader.wait() => FirstExit::Downloader(status),
        status = transcoder.wait() => FirstExit::Transcoder(status),
    };

    match first {
        FirstExit::Downloader(Err(e)) => {
            let _ = transcoder.kill().await;
            Err(MediaError::Io(e))
        }
        FirstExit::Downloader(Ok(status)) if status.success() => {
            debug!("Download stage finished, waiting for transcoder");
            let status = transcoder.wait().await?;
            check_status(Stage::Transcode, status)
        }
        FirstExit::Downloader(Ok(status)) => {
            if pipe_broken.load(Ordering::SeqCst) {
                // Transcoder stopped reading first; its own status decides
                debug!(code = ?status.code(), "Downloader exited after the pipe closed");
                let status = transcoder.wait().await?;
                return check_status(Stage::Transcode, status);
            }
            warn!(code = ?status.code(), "Download stage failed, stopping transcoder");
            let _ = transcoder.kill().await;
            Err(MediaError::stage_failed(Stage::Download, status.code()))
        }
        FirstExit::Transcoder(status) => {
            if let Ok(None) = downloader.try_wait() {
                debug!("Transcoder finished before the download ended, stopping downloader");
            }
            let _ = downloader.kill().await;
            check_status(Stage::Transcode, status?)
        }
    }
}

fn check_status(stage: Stage, status: ExitStatus) -> MediaResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(MediaError::stage_failed(stage, status.code()))
    }
}

/// Stream the downloader's stdout into the transcoder's stdin.
///
/// Sets `broken` when the copy fails, which is how an early transcoder exit
/// is told apart from a downloader failure.
async fn pump(mut from: ChildStdout, mut to: ChildStdin, broken: Arc<AtomicBool>) {
    match tokio::io::copy(&mut from, &mut to).await {
        Ok(bytes) => debug!(bytes, "Download stream finished"),
        Err(e) => {
            broken.store(true, Ordering::SeqCst);
            debug!("Pipe closed before the download stream ended: {}", e);
        }
    }
    // EOF for the transcoder
    let _ = to.shutdown().await;
}

/// Forward every stderr line of a stage to the sink, in order.
async fn forward_stderr<R>(stage: Stage, stream: R, sink: Arc<dyn EventSink>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut forwarded = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf);
                for line in split_lines(&chunk) {
                    info!("{} stderr: {}", stage, line);
                    sink.publish(StreamEvent::stage_output(stage, line)).await;
                    forwarded += 1;
                }
            }
            Err(e) => {
                warn!(stage = %stage, "Failed to read stage output: {}", e);
                break;
            }
        }
    }

    forwarded
}

/// Split a chunk on `\n` and `\r` (ffmpeg redraws its status line with `\r`).
///
/// Line content is kept verbatim; only the empty fragments between
/// terminators are dropped.
fn split_lines(chunk: &str) -> impl Iterator<Item = &str> {
    chunk.split(['\r', '\n']).filter(|line| !line.is_empty())
}


#[cfg(all(test, unix))]
mod process_tests {
    use std::time::Duration;

    use segcut_models::{Stage, StreamEvent};
    use tempfile::TempDir;

    use super::*;
    use crate::command::{DownloadCommand, ToolCommand, TranscodeCommand};
    use crate::events::MemorySink;

    const URL: &str = "https://www.youtube.com/watch?v=ABC123";

    /// Fake tool: `sh -c <script> <name> <stage args...>`.
    fn fake(script: &str) -> ToolCommand {
        ToolCommand::new("sh").with_base_args(["-c", script, "fake"])
    }

    /// Transcoder prelude binding `$out` to the last argument.
    const LAST_ARG: &str = "for out; do :; done; ";

    fn transcoder(body: &str) -> ToolCommand {
        fake(&format!("{}{}", LAST_ARG, body))
    }

    fn lines_for(events: &[StreamEvent], wanted: Stage) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::StageOutput { stage, line } if *stage == wanted => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    async fn run(
        download: ToolCommand,
        transcode: ToolCommand,
        output: &Path,
    ) -> (MediaResult<PathBuf>, Vec<StreamEvent>) {
        let sink = Arc::new(MemorySink::new());
        let download = DownloadCommand::new(download, URL).build();
        let transcode = TranscodeCommand::new(transcode, output, 10, 20).build();

        let result = tokio::time::timeout(
            Duration::from_secs(20),
            SegmentPipeline::new()
                .with_drain_timeout(Duration::from_secs(2))
                .run(&download, &transcode, output, sink.clone()),
        )
        .await
        .expect("pipeline must not hang");

        let events = sink.events().await;
        (result, events)
    }

    #[test]
    fn test_check_status() {
        let ok = std::process::Command::new("true").status().unwrap();
        assert!(check_status(Stage::Transcode, ok).is_ok());

        let failed = std::process::Command::new("false").status().unwrap();
        let err = check_status(Stage::Transcode, failed).unwrap_err();
        assert_eq!(err.to_string(), "ffmpeg process exited with code 1");
    }

    #[tokio::test]
    async fn test_success_pipes_stdout_and_forwards_stderr_in_order() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");

        let (result, events) = run(
            fake("echo 'dl line 1' >&2; echo 'dl line 2' >&2; printf 'payload'; echo 'dl line 3' >&2"),
            transcoder("echo 'tc start' >&2; cat > \"$out\"; echo 'tc done' >&2"),
            &output,
        )
        .await;

        assert_eq!(result.unwrap(), output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "payload");

        assert_eq!(lines_for(&events, Stage::Download), ["dl line 1", "dl line 2", "dl line 3"]);
        assert_eq!(lines_for(&events, Stage::Transcode), ["tc start", "tc done"]);
        assert_eq!(
            events.last().unwrap(),
            &StreamEvent::complete(output.display().to_string())
        );
    }

    #[tokio::test]
    async fn test_transcoder_arguments_reach_the_process() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("args.mp4");

        let (result, events) = run(
            fake("printf 'x'"),
            transcoder("echo \"$@\" >&2; cat > \"$out\""),
            &output,
        )
        .await;

        assert!(result.is_ok());
        let args = lines_for(&events, Stage::Transcode);
        assert_eq!(
            args,
            [format!("-y -i pipe:0 -ss 10 -to 20 -c copy {}", output.display())]
        );
    }

    #[tokio::test]
    async fn test_transcoder_failure_reports_exit_code_and_discards_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");

        let (result, events) = run(
            fake("printf 'payload'"),
            transcoder("cat > \"$out\"; echo 'Invalid data found' >&2; exit 1"),
            &output,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            MediaError::StageFailed { stage: Stage::Transcode, exit_code: Some(1) }
        ));
        assert_eq!(err.to_string(), "ffmpeg process exited with code 1");
        assert!(!output.exists(), "partial output must be removed");
        assert_eq!(lines_for(&events, Stage::Transcode), ["Invalid data found"]);
        assert_eq!(
            events.last().unwrap(),
            &StreamEvent::error("ffmpeg process exited with code 1")
        );
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_downloader_failure_stops_waiting_transcoder() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");

        let (result, events) = run(
            fake("echo 'ERROR: Video unavailable' >&2; exit 2"),
            transcoder("cat > \"$out\"; exec sleep 30"),
            &output,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            MediaError::StageFailed { stage: Stage::Download, exit_code: Some(2) }
        ));
        assert!(!output.exists());
        assert_eq!(lines_for(&events, Stage::Download), ["ERROR: Video unavailable"]);
        assert_eq!(
            events.last().unwrap(),
            &StreamEvent::error("yt-dlp process exited with code 2")
        );
    }

    #[tokio::test]
    async fn test_transcoder_finishing_early_stops_downloader() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");

        let (result, _events) = run(
            fake("printf 'head'; exec sleep 30"),
            transcoder("head -c 4 > \"$out\""),
            &output,
        )
        .await;

        assert_eq!(result.unwrap(), output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "head");
    }

    #[tokio::test]
    async fn test_missing_downloader_never_starts_transcoder() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");
        let marker = dir.path().join("transcoder-ran");

        let (result, events) = run(
            ToolCommand::new("/nonexistent/segcut/yt-dlp"),
            fake(&format!("touch '{}'; cat > /dev/null", marker.display())),
            &output,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, MediaError::Spawn { stage: Stage::Download, .. }));
        assert!(err.to_string().starts_with("Error during yt-dlp processing:"));
        assert!(!marker.exists());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_missing_transcoder_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");

        let (result, _events) = run(
            fake("exec sleep 30"),
            ToolCommand::new("/nonexistent/segcut/ffmpeg"),
            &output,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, MediaError::Spawn { stage: Stage::Transcode, .. }));
        assert!(err.to_string().starts_with("Error during ffmpeg processing:"));
    }

    #[tokio::test]
    async fn test_lingering_stderr_is_cut_off_at_the_terminal_event() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("ABC123_segment.mp4");
        let sink = Arc::new(MemorySink::new());

        // The background writer keeps the downloader's stderr open after it exits
        let download = DownloadCommand::new(
            fake("(sleep 1; echo 'late line' >&2) > /dev/null & printf 'data'"),
            URL,
        )
        .build();
        let transcode = TranscodeCommand::new(transcoder("cat > \"$out\""), &output, 10, 20).build();

        let result = SegmentPipeline::new()
            .with_drain_timeout(Duration::from_millis(200))
            .run(&download, &transcode, &output, sink.clone())
            .await;
        assert_eq!(result.unwrap(), output);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let events = sink.events().await;
        assert_eq!(
            events.last().unwrap(),
            &StreamEvent::complete(output.display().to_string())
        );
        assert!(lines_for(&events, Stage::Download).is_empty());
    }

    #[tokio::test]
    async fn test_carriage_return_progress_lines_are_split() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("progress.mp4");

        let (result, events) = run(
            fake("printf 'data'"),
            transcoder("cat > \"$out\"; printf 'frame=1\\rframe=2\\r\\nsummary\\n' >&2"),
            &output,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(
            lines_for(&events, Stage::Transcode),
            ["frame=1", "frame=2", "summary"]
        );
    }
}
