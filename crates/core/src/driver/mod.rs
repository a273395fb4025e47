//! Driver module: scripted navigation of the external animation wizard.
//!
//! [`WizardStateMachine`] owns the flow and its timing, and speaks only to a
//! [`WizardSession`]. [`ChromiumLauncher`] produces real sessions over the
//! DevTools protocol; `crate::testing` provides scripted ones.
//!
//! The animation id arrives on a network response while the wizard is still
//! being clicked through. It is captured into a one-shot cell
//! ([`animation_id_channel`]) so extraction can either read it or wait for it.

mod artifact;
mod capture;
mod chromium;
mod config;
mod error;
mod machine;
mod traits;

pub use artifact::{parse_asset_name, ArtifactReference, AssetUrls};
pub use capture::{animation_id_channel, AnimationIdCell, AnimationIdPublisher};
pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use config::{BrowserSettings, WizardConfig};
pub use error::DriverError;
pub use machine::{Picker, WizardOutcome, WizardState, WizardStateMachine};
pub use traits::{
    ConsentOutcome, ScreenshotScope, SessionLauncher, StepProbe, ThumbnailLookup, WizardSession,
};
