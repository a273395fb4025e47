//! HTTP surface for the sketchloop render pipeline.

pub mod api;
pub mod metrics;
pub mod state;
