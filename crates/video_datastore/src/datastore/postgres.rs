use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    datastore::{DataStore, Result},
    domain::{NewVideo, Video, VideoMetrics, VideoSnapshot},
    error::DataStoreError,
};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Construction-time settings for [`PgDataStore`]. The connection URL is
/// assembled by the caller; this crate never derives credentials or
/// hostnames itself.
#[derive(Debug, Clone)]
pub struct DataStoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection, so no operation
    /// blocks indefinitely.
    pub acquire_timeout: Duration,
}

impl DataStoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        DataStoreConfig {
            database_url: database_url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    /// Establish connection to the database and provision the `videos` and
    /// `video_snapshots` tables if they do not exist. Idempotent; safe to
    /// call on every process start. A failure here is fatal: the process
    /// must not serve requests against an unverified schema.
    pub async fn init(config: &DataStoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .map_err(DataStoreError::init)?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .map_err(DataStoreError::init)?;

        Ok(PgDataStore { pool })
    }

    /// Drains the connection pool. Call once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Drops both tables and recreates the schema from empty. Deliberate
    /// administrative action only; never invoked by [`PgDataStore::init`].
    pub async fn reset_schema(&self) -> Result<()> {
        tracing::warn!("Resetting datastore schema, all data will be lost");

        sqlx::query("DROP TABLE IF EXISTS video_snapshots, videos CASCADE")
            .execute(&self.pool)
            .await
            .map_err(DataStoreError::classify)?;
        // Clear sqlx's migration bookkeeping so the migrator re-applies.
        sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
            .execute(&self.pool)
            .await
            .map_err(DataStoreError::classify)?;

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(DataStoreError::init)?;

        Ok(())
    }
}

impl DataStore for PgDataStore {
    async fn upsert_video(&self, video: &NewVideo) -> Result<Video> {
        video.metrics.validate()?;

        let row = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos
                (id, creator_id, published_at,
                 views_count, likes_count, comments_count, reports_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                views_count = EXCLUDED.views_count,
                likes_count = EXCLUDED.likes_count,
                comments_count = EXCLUDED.comments_count,
                reports_count = EXCLUDED.reports_count,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(&video.id)
        .bind(&video.creator_id)
        .bind(video.published_at)
        .bind(video.metrics.views_count)
        .bind(video.metrics.likes_count)
        .bind(video.metrics.comments_count)
        .bind(video.metrics.reports_count)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, video_id = %video.id, "Failed to upsert video")
        })
        .map_err(DataStoreError::classify)?;

        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    async fn append_snapshot(
        &self,
        video_id: &str,
        metrics: VideoMetrics,
        measured_at: DateTime<Utc>,
    ) -> Result<VideoSnapshot> {
        metrics.validate()?;

        // Dropped (and thus rolled back) on any early return below.
        let mut tx = self.pool.begin().await.map_err(DataStoreError::classify)?;

        // Lock the parent row so concurrent appends for the same video
        // serialize and the delta baseline cannot change under us.
        // Cross-video appends stay fully parallel.
        let parent = sqlx::query_scalar::<_, String>("SELECT id FROM videos WHERE id = $1 FOR UPDATE")
            .bind(video_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DataStoreError::classify)?;

        if parent.is_none() {
            return Err(DataStoreError::Referential {
                video_id: video_id.to_string(),
            });
        }

        let previous = sqlx::query_as::<_, VideoSnapshot>(
            r#"
            SELECT * FROM video_snapshots
            WHERE video_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DataStoreError::classify)?;

        let deltas = metrics.deltas_from(previous.map(|s| s.metrics()));

        let snapshot = sqlx::query_as::<_, VideoSnapshot>(
            r#"
            INSERT INTO video_snapshots
                (id, video_id,
                 views_count, likes_count, comments_count, reports_count,
                 delta_views_count, delta_likes_count,
                 delta_comments_count, delta_reports_count,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(video_id)
        .bind(metrics.views_count)
        .bind(metrics.likes_count)
        .bind(metrics.comments_count)
        .bind(metrics.reports_count)
        .bind(deltas.views_count)
        .bind(deltas.likes_count)
        .bind(deltas.comments_count)
        .bind(deltas.reports_count)
        .bind(measured_at)
        .fetch_one(&mut *tx)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, video_id = %video_id, "Failed to insert snapshot")
        })
        .map_err(DataStoreError::classify)?;

        tx.commit().await.map_err(DataStoreError::classify)?;

        Ok(snapshot)
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        // Snapshots go with the parent via ON DELETE CASCADE, all-or-nothing.
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(video_id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| {
                tracing::error!(error = ?e, video_id = %video_id, "Failed to delete video")
            })
            .map_err(DataStoreError::classify)?;

        if result.rows_affected() == 0 {
            return Err(DataStoreError::Referential {
                video_id: video_id.to_string(),
            });
        }

        tracing::info!(video_id = %video_id, "Deleted video and its snapshots");
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DataStoreError::classify)
    }

    async fn list_videos_by_creator(&self, creator_id: &str) -> Result<Vec<Video>> {
        sqlx::query_as::<_, Video>(
            "SELECT * FROM videos WHERE creator_id = $1 ORDER BY published_at DESC",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DataStoreError::classify)
    }

    async fn list_snapshots(&self, video_id: &str) -> Result<Vec<VideoSnapshot>> {
        sqlx::query_as::<_, VideoSnapshot>(
            r#"
            SELECT * FROM video_snapshots
            WHERE video_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DataStoreError::classify)
    }

    async fn latest_snapshot(&self, video_id: &str) -> Result<Option<VideoSnapshot>> {
        sqlx::query_as::<_, VideoSnapshot>(
            r#"
            SELECT * FROM video_snapshots
            WHERE video_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DataStoreError::classify)
    }
}
