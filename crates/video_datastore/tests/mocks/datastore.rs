use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use video_datastore::{
    DataStore, DataStoreError, NewVideo, Video, VideoMetrics, VideoSnapshot,
};

type Result<T> = std::result::Result<T, DataStoreError>;

#[derive(Default)]
struct State {
    videos: HashMap<String, Video>,
    snapshots: Vec<VideoSnapshot>,
}

/// In-memory stand-in for the Postgres store. Shares the validation and
/// delta functions with the real implementation, so the contract tests
/// exercise the same write semantics without a running database.
#[derive(Clone, Default)]
pub struct MemDataStore {
    state: Arc<Mutex<State>>,
}

impl DataStore for MemDataStore {
    async fn upsert_video(&self, video: &NewVideo) -> Result<Video> {
        video.metrics.validate()?;

        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let row = state
            .videos
            .entry(video.id.clone())
            .and_modify(|existing| {
                existing.views_count = video.metrics.views_count;
                existing.likes_count = video.metrics.likes_count;
                existing.comments_count = video.metrics.comments_count;
                existing.reports_count = video.metrics.reports_count;
                existing.updated_at = now;
            })
            .or_insert_with(|| Video {
                id: video.id.clone(),
                creator_id: video.creator_id.clone(),
                published_at: video.published_at,
                views_count: video.metrics.views_count,
                likes_count: video.metrics.likes_count,
                comments_count: video.metrics.comments_count,
                reports_count: video.metrics.reports_count,
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn append_snapshot(
        &self,
        video_id: &str,
        metrics: VideoMetrics,
        measured_at: DateTime<Utc>,
    ) -> Result<VideoSnapshot> {
        metrics.validate()?;

        let mut state = self.state.lock().unwrap();
        if !state.videos.contains_key(video_id) {
            return Err(DataStoreError::Referential {
                video_id: video_id.to_string(),
            });
        }

        let previous = state
            .snapshots
            .iter()
            .filter(|s| s.video_id == video_id)
            .max_by_key(|s| s.created_at)
            .map(|s| s.metrics());
        let deltas = metrics.deltas_from(previous);

        let snapshot = VideoSnapshot {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            views_count: metrics.views_count,
            likes_count: metrics.likes_count,
            comments_count: metrics.comments_count,
            reports_count: metrics.reports_count,
            delta_views_count: deltas.views_count,
            delta_likes_count: deltas.likes_count,
            delta_comments_count: deltas.comments_count,
            delta_reports_count: deltas.reports_count,
            created_at: measured_at,
            updated_at: Utc::now(),
        };
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.videos.remove(video_id).is_none() {
            return Err(DataStoreError::Referential {
                video_id: video_id.to_string(),
            });
        }
        // Cascade: no orphan snapshot may persist.
        state.snapshots.retain(|s| s.video_id != video_id);
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        let state = self.state.lock().unwrap();
        Ok(state.videos.get(video_id).cloned())
    }

    async fn list_videos_by_creator(&self, creator_id: &str) -> Result<Vec<Video>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .videos
            .values()
            .filter(|v| v.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self, video_id: &str) -> Result<Vec<VideoSnapshot>> {
        let state = self.state.lock().unwrap();
        let mut snapshots: Vec<_> = state
            .snapshots
            .iter()
            .filter(|s| s.video_id == video_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.created_at);
        Ok(snapshots)
    }

    async fn latest_snapshot(&self, video_id: &str) -> Result<Option<VideoSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshots
            .iter()
            .filter(|s| s.video_id == video_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}
