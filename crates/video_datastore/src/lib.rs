//! # Video DataStore Module
//!
//! This module persists time-series engagement metrics for videos in a
//! PostgreSQL database: one current-state row per video and an append-only
//! history of point-in-time snapshots, each carrying absolute metric values
//! and their deltas since the prior snapshot.
//!
//! The module uses sqlx for database operations and provides an abstraction
//! layer for the write and read operations on videos and their snapshots.

mod datastore;
mod domain;
mod error;

pub use datastore::postgres::{DataStoreConfig, PgDataStore};
pub use datastore::DataStore;
pub use domain::{MetricDeltas, NewVideo, Video, VideoMetrics, VideoSnapshot};
pub use error::DataStoreError;
