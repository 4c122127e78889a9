/// Failure taxonomy surfaced by every datastore operation. Nothing is
/// swallowed; callers decide whether a variant is retryable.
#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    /// Malformed input, rejected before any write. Not retryable as-is.
    #[error("{field} must be non-negative, got {value}")]
    Validation { field: &'static str, value: i64 },
    /// The operation referenced a video that does not exist.
    #[error("video {video_id} does not exist")]
    Referential { video_id: String },
    /// Concurrent-write anomaly detected by the database's isolation
    /// enforcement. Retry the whole operation.
    #[error("concurrent write conflict: {0}")]
    Conflict(#[source] sqlx::Error),
    /// Connecting or provisioning the schema failed. Fatal at startup.
    #[error("datastore initialization failed: {0}")]
    Initialization(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Transient connectivity failure. Safe to retry with backoff.
    #[error("datastore unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

// Postgres SQLSTATE codes the taxonomy cares about.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

impl DataStoreError {
    pub(crate) fn init(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataStoreError::Initialization(Box::new(err))
    }

    /// Maps a low-level sqlx failure onto the taxonomy. Referential and
    /// validation failures are detected at call sites, where the offending
    /// input is known; everything that reaches this point is either a
    /// conflict, a connectivity problem, or an unclassified database error.
    pub(crate) fn classify(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.to_string());
                let err = sqlx::Error::Database(db);
                match code.as_deref() {
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
                    | Some(UNIQUE_VIOLATION) => DataStoreError::Conflict(err),
                    _ => DataStoreError::Database(err),
                }
            }
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                DataStoreError::Unavailable(e)
            }
            e => DataStoreError::Database(e),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataStoreError::Conflict(_) | DataStoreError::Unavailable(_)
        )
    }
}
