//! Business logic services.

pub mod segment_job;

pub use segment_job::SegmentJobService;
