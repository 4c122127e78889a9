use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataStoreError;

/// Current-state record for one tracked video. Created when the video is
/// first observed, then mutated in place on every subsequent observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    /// Platform-native video id, externally assigned. Immutable.
    pub id: String,
    /// Owning creator. One creator owns many videos.
    pub creator_id: String,
    /// Original publication time of the video. Immutable once set.
    pub published_at: DateTime<Utc>,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`DataStore::upsert_video`](crate::DataStore::upsert_video).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideo {
    pub id: String,
    pub creator_id: String,
    pub published_at: DateTime<Utc>,
    pub metrics: VideoMetrics,
}

/// Point-in-time measurement of a video's metrics, plus the change in each
/// metric since the immediately preceding snapshot of the same video.
/// Append-only in normal operation; destroyed only by the parent video's
/// cascading delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoSnapshot {
    pub id: String,
    pub video_id: String,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    pub delta_views_count: i64,
    pub delta_likes_count: i64,
    pub delta_comments_count: i64,
    pub delta_reports_count: i64,
    /// When the measurement was taken. Supplied by the caller, not the store.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoSnapshot {
    /// The absolute metric values observed at this snapshot.
    pub fn metrics(&self) -> VideoMetrics {
        VideoMetrics {
            views_count: self.views_count,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            reports_count: self.reports_count,
        }
    }

    pub fn deltas(&self) -> MetricDeltas {
        MetricDeltas {
            views_count: self.delta_views_count,
            likes_count: self.delta_likes_count,
            comments_count: self.delta_comments_count,
            reports_count: self.delta_reports_count,
        }
    }
}

/// Absolute engagement metric values for one video at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
}

/// Signed change between two consecutive absolute metric readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
}

impl VideoMetrics {
    /// Rejects negative values before anything reaches the database.
    /// Non-negativity is a domain rule enforced by the writer.
    pub fn validate(&self) -> Result<(), DataStoreError> {
        for (field, value) in [
            ("views_count", self.views_count),
            ("likes_count", self.likes_count),
            ("comments_count", self.comments_count),
            ("reports_count", self.reports_count),
        ] {
            if value < 0 {
                return Err(DataStoreError::Validation { field, value });
            }
        }
        Ok(())
    }

    /// Deltas of `self` measured against `previous`, or against a zero
    /// baseline when there is no prior snapshot (the first snapshot's deltas
    /// equal its absolute values).
    pub fn deltas_from(&self, previous: Option<VideoMetrics>) -> MetricDeltas {
        let prev = previous.unwrap_or_default();
        MetricDeltas {
            views_count: self.views_count - prev.views_count,
            likes_count: self.likes_count - prev.likes_count,
            comments_count: self.comments_count - prev.comments_count,
            reports_count: self.reports_count - prev.reports_count,
        }
    }
}
