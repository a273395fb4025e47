//! Job record types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Parse the stored lowercase form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    /// `done` and `error` are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Only `running -> done` and `running -> error` are allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Running, JobStatus::Done) | (JobStatus::Running, JobStatus::Error)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one render submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    pub input_path: PathBuf,
    /// Final artifact; set only when `done`.
    pub output_path: Option<PathBuf>,
    /// Public URL of the final artifact; set only when `done`.
    pub output_url: Option<String>,
    /// Source video URL on the external site, when known.
    pub video_url: Option<String>,
    /// Requested variant hint, recorded as submitted.
    pub demo_index: i32,
    /// Failure message; set only when `error`.
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl Job {
    /// New record in `running` state.
    pub fn running(id: impl Into<String>, input_path: impl Into<PathBuf>, demo_index: i32) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            status: JobStatus::Running,
            input_path: input_path.into(),
            output_path: None,
            output_url: None,
            video_url: None,
            demo_index,
            error: None,
            duration_ms: None,
        }
    }

    /// Applies the set fields of `patch`.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref output_path) = patch.output_path {
            self.output_path = Some(output_path.clone());
        }
        if let Some(ref output_url) = patch.output_url {
            self.output_url = Some(output_url.clone());
        }
        if let Some(ref video_url) = patch.video_url {
            self.video_url = Some(video_url.clone());
        }
        if let Some(ref error) = patch.error {
            self.error = Some(error.clone());
        }
        if let Some(duration_ms) = patch.duration_ms {
            self.duration_ms = Some(duration_ms);
        }
    }
}

/// Partial update of a [`Job`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub output_path: Option<PathBuf>,
    pub output_url: Option<String>,
    pub video_url: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl JobPatch {
    /// Successful completion with its artifact.
    pub fn done(output_path: impl Into<PathBuf>, output_url: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: Some(JobStatus::Done),
            output_path: Some(output_path.into()),
            output_url: Some(output_url.into()),
            duration_ms: Some(duration_ms),
            ..Default::default()
        }
    }

    /// Failure with its message.
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error: Some(error.into()),
            duration_ms: Some(duration_ms),
            ..Default::default()
        }
    }

    pub fn with_video_url(mut self, video_url: impl Into<String>) -> Self {
        self.video_url = Some(video_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Running.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Error.can_transition_to(JobStatus::Done));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Done.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_roundtrips_through_str() {
        for status in [JobStatus::Running, JobStatus::Done, JobStatus::Error] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("queued"), None);
    }

    #[test]
    fn test_apply_done_patch() {
        let mut job = Job::running("abc", "storage/inputs/abc.png", 0);
        let patch = JobPatch::done("storage/outputs/abc.webp", "http://x/abc.webp", 1200)
            .with_video_url("https://cdn/XYZ/foo.mp4");
        job.apply(&patch);

        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.output_path, Some(PathBuf::from("storage/outputs/abc.webp")));
        assert_eq!(job.video_url.as_deref(), Some("https://cdn/XYZ/foo.mp4"));
        assert_eq!(job.duration_ms, Some(1200));
        assert!(job.error.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let job = Job::running("abc", "in.png", 2);
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["status"], "running");
        assert_eq!(json["demoIndex"], 2);
        assert!(json.get("inputPath").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json["outputUrl"].is_null());
    }
}
