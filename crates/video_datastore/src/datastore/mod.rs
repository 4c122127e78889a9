use std::future::Future;

pub mod postgres;

use chrono::{DateTime, Utc};

use crate::{
    domain::{NewVideo, Video, VideoMetrics, VideoSnapshot},
    error::DataStoreError,
};

pub type Result<T> = std::result::Result<T, DataStoreError>;

/// Storage contract for videos and their snapshot history. Every method is
/// one short-lived request/response unit backed by a single transaction;
/// callers may invoke them concurrently and apply their own timeouts.
pub trait DataStore {
    /// Creates the video row if absent, otherwise updates its metric
    /// columns and `updated_at`. `id`, `published_at` and `created_at` are
    /// never touched by the update arm. Atomic per video id.
    fn upsert_video(&self, video: &NewVideo) -> impl Future<Output = Result<Video>> + Send;

    /// Records one observation: computes deltas against the most recent
    /// snapshot of the video (zero baseline if none) and inserts a new
    /// snapshot with `measured_at` as its measurement timestamp.
    fn append_snapshot(
        &self,
        video_id: &str,
        metrics: VideoMetrics,
        measured_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<VideoSnapshot>> + Send;

    /// Removes the video and, atomically, all its snapshots. Administrative
    /// action; not part of the normal observation lifecycle.
    fn delete_video(&self, video_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn get_video(&self, video_id: &str) -> impl Future<Output = Result<Option<Video>>> + Send;

    fn list_videos_by_creator(
        &self,
        creator_id: &str,
    ) -> impl Future<Output = Result<Vec<Video>>> + Send;

    /// All snapshots of a video, ordered by measurement time ascending.
    fn list_snapshots(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<Vec<VideoSnapshot>>> + Send;

    fn latest_snapshot(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<Option<VideoSnapshot>>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn upsert_video(&self, video: &NewVideo) -> Result<Video> {
        (**self).upsert_video(video).await
    }

    async fn append_snapshot(
        &self,
        video_id: &str,
        metrics: VideoMetrics,
        measured_at: DateTime<Utc>,
    ) -> Result<VideoSnapshot> {
        (**self).append_snapshot(video_id, metrics, measured_at).await
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        (**self).delete_video(video_id).await
    }

    async fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        (**self).get_video(video_id).await
    }

    async fn list_videos_by_creator(&self, creator_id: &str) -> Result<Vec<Video>> {
        (**self).list_videos_by_creator(creator_id).await
    }

    async fn list_snapshots(&self, video_id: &str) -> Result<Vec<VideoSnapshot>> {
        (**self).list_snapshots(video_id).await
    }

    async fn latest_snapshot(&self, video_id: &str) -> Result<Option<VideoSnapshot>> {
        (**self).latest_snapshot(video_id).await
    }
}
