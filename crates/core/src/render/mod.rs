//! Render module: the public entry point of the pipeline.
//!
//! [`RenderService::submit`] admits at most one job at a time through an
//! [`AdmissionSlot`], records it, drives the wizard, and turns the fetched
//! video into the final loop. A failed download degrades to a screenshot
//! ([`ArtifactOutcome::Degraded`]); every other fault marks the job `error`.
//!
//! # Example
//!
//! ```ignore
//! use sketchloop_core::render::{RenderService, SubmitRequest};
//!
//! let job = service
//!     .submit(SubmitRequest::new(image_bytes).with_original_name("cat.png"))
//!     .await?;
//! println!("{} -> {:?}", job.id, job.output_url);
//! ```

mod config;
mod error;
mod service;
mod slot;
mod types;

pub use config::StorageConfig;
pub use error::RenderError;
pub use service::{RenderService, RenderSettings};
pub use slot::{AdmissionPermit, AdmissionSlot};
pub use types::{ArtifactOutcome, JobPaths, SubmitRequest};
