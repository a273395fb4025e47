//! Persisted render job records.
//!
//! A job is created `running` before any automation starts and moves exactly
//! once to `done` or `error`. Stores enforce that transition rule.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{JobStore, JobStoreError};
pub use types::{Job, JobPatch, JobStatus};
