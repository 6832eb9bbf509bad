//! Segment extraction job service.
//!
//! Runs one request end to end: folder check, video id, command building,
//! then the piped pipeline on its own task so the job finishes even if the
//! HTTP client goes away.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use segcut_media::{
    ensure_writable, DownloadCommand, EventSink, MediaError, SegmentPipeline, TranscodeCommand,
};
use segcut_models::{
    download_link, extract_video_id, segment_file_name, ExtractRequest, ExtractResponse,
    StreamEvent,
};
use segcut_models::timestamp::format_offset;
use tracing::{info, warn};

use crate::config::SegmentConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Service that turns an [`ExtractRequest`] into a segment file.
#[derive(Clone)]
pub struct SegmentJobService {
    config: SegmentConfig,
    pipeline: SegmentPipeline,
    sink: Arc<dyn EventSink>,
}

impl SegmentJobService {
    pub fn new(config: SegmentConfig, pipeline: SegmentPipeline, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            pipeline,
            sink,
        }
    }

    /// Run a job and return the public link of the produced segment.
    pub async fn extract(&self, request: &ExtractRequest) -> ApiResult<ExtractResponse> {
        let started = Instant::now();
        metrics::record_job_started();

        match self.run(request).await {
            Ok(response) => {
                metrics::record_job_completed(started.elapsed().as_secs_f64());
                Ok(response)
            }
            Err(e) => {
                metrics::record_job_failed(failure_reason(&e), started.elapsed().as_secs_f64());
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ExtractRequest) -> ApiResult<ExtractResponse> {
        if let Err(e) = ensure_writable(&request.folder_path, self.config.folder_policy).await {
            warn!(folder = %request.folder_path, "Folder check failed: {:?}", e);
            return Err(self.reject(ApiError::FolderPermission(e)).await);
        }

        let video_id = match extract_video_id(&request.link) {
            Ok(id) => id,
            Err(e) => return Err(self.reject(ApiError::from(e)).await),
        };

        let output = Path::new(&request.folder_path).join(segment_file_name(&video_id));
        let start = request.start_in_seconds.as_secs();
        let end = request.end_in_seconds.as_secs();

        let download = DownloadCommand::new(self.config.downloader.clone(), request.link.as_str())
            .format(self.config.download_format.as_str())
            .build();
        let transcode = TranscodeCommand::new(self.config.transcoder.clone(), &output, start, end)
            .build();

        info!(
            video_id = %video_id,
            start = %format_offset(start),
            end = %format_offset(end),
            duration_secs = request.duration_secs(),
            output = %output.display(),
            "Starting segment job"
        );

        let pipeline = self.pipeline.clone();
        let sink = Arc::clone(&self.sink);
        let job = tokio::spawn(async move {
            pipeline.run(&download, &transcode, &output, sink).await
        });

        match job.await {
            Ok(Ok(_)) => Ok(ExtractResponse {
                download_link: download_link(&video_id),
            }),
            // Already published by the pipeline
            Ok(Err(e)) => Err(ApiError::Media(e)),
            Err(e) => Err(self.reject(ApiError::internal(format!("job task failed: {}", e))).await),
        }
    }

    /// Publish a failure that happened outside the pipeline.
    async fn reject(&self, error: ApiError) -> ApiError {
        self.sink.publish(StreamEvent::error(error.to_string())).await;
        error
    }
}

fn failure_reason(error: &ApiError) -> &'static str {
    match error {
        ApiError::FolderPermission(_) => "folder",
        ApiError::InvalidVideoUrl(_) => "invalid_url",
        ApiError::Media(MediaError::Spawn { .. }) => "spawn",
        ApiError::Media(e) => e.stage().map(|s| s.as_str()).unwrap_or("media"),
        _ => "internal",
    }
}
