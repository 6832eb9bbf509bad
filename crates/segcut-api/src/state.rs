//! Application state.

use std::sync::Arc;

use segcut_media::SegmentPipeline;

use crate::broadcast::SubscriberRegistry;
use crate::config::ApiConfig;
use crate::services::SegmentJobService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub subscribers: Arc<SubscriberRegistry>,
    pub jobs: SegmentJobService,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Self {
        let subscribers = Arc::new(SubscriberRegistry::new(config.ws_buffer_size));
        let jobs = SegmentJobService::new(
            config.segment.clone(),
            SegmentPipeline::new(),
            subscribers.clone(),
        );

        Self {
            config,
            subscribers,
            jobs,
        }
    }
}
