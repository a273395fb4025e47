//! Job storage trait.

use thiserror::Error;

use super::types::{Job, JobPatch, JobStatus};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job already exists: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl JobStoreError {
    /// Rejects a patch whose status change is not allowed from `current`.
    pub(crate) fn check_transition(
        id: &str,
        current: JobStatus,
        patch: &JobPatch,
    ) -> Result<(), JobStoreError> {
        match patch.status {
            Some(next) if !current.can_transition_to(next) => Err(JobStoreError::InvalidTransition {
                id: id.to_string(),
                from: current,
                to: next,
            }),
            _ => Ok(()),
        }
    }
}

/// Trait for job storage backends.
pub trait JobStore: Send + Sync {
    /// Insert a new record.
    fn create(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Apply a partial update and return the updated record.
    fn update(&self, id: &str, patch: &JobPatch) -> Result<Job, JobStoreError>;

    /// Get a job by id.
    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError>;

    /// Most recent jobs first.
    fn list_recent(&self, limit: usize) -> Result<Vec<Job>, JobStoreError>;
}
