//! Trait definitions for the driver module.
//!
//! The state machine talks to the browser only through [`WizardSession`], so
//! it can be exercised against a scripted session in tests.

use std::path::Path;

use async_trait::async_trait;

use super::capture::AnimationIdCell;
use super::error::DriverError;

/// What the consent step found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// An "Accept" button inside the consent modal footer was clicked.
    Modal,
    /// A page-level "Accept" button was clicked.
    Generic,
    /// Nothing to dismiss.
    Absent,
}

/// Result of one wizard-loop probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepProbe {
    /// The terminal marker is on the page.
    Terminal,
    /// A visible, enabled "Next" control was clicked.
    Advanced,
    /// Neither marker nor "Next" control was found.
    Idle,
}

/// Outcome of looking up the selected result's thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailLookup {
    /// No selected result element on the page.
    Missing,
    /// A selected result exists but has no `src`.
    NoSource,
    /// The selected thumbnail's `src` attribute.
    Source(String),
}

/// Which area the fallback screenshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotScope {
    /// Just the drawing canvas.
    Canvas,
    /// The whole page, used when no canvas is found.
    FullPage,
}

impl ScreenshotScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::FullPage => "full_page",
        }
    }
}

/// One live browser session positioned on the wizard.
///
/// Every method is a single semantic step; timing and retries live in the
/// state machine.
#[async_trait]
pub trait WizardSession: Send {
    /// Starts watching network responses whose URL contains `fragment`.
    ///
    /// Must be called before [`open`](Self::open) so no response is missed.
    async fn intercept_animation_id(&mut self, fragment: &str) -> Result<AnimationIdCell, DriverError>;

    /// Navigates to `url` and waits for the page to load.
    async fn open(&mut self, url: &str) -> Result<(), DriverError>;

    /// Dismisses a consent overlay if one is present. Best effort.
    async fn dismiss_consent(&mut self) -> ConsentOutcome;

    /// Supplies `image` through the page's file chooser.
    async fn upload(&mut self, image: &Path) -> Result<(), DriverError>;

    /// Checks for the terminal marker, else clicks "Next" if it can.
    async fn probe_step(&mut self) -> Result<StepProbe, DriverError>;

    /// Counts the clickable entries in the results grid.
    ///
    /// Returns `None` when the grid container is absent.
    async fn list_results(&mut self) -> Result<Option<usize>, DriverError>;

    /// Clicks result `index` from the last [`list_results`](Self::list_results).
    async fn click_result(&mut self, index: usize) -> Result<(), DriverError>;

    /// Reads the selected result's thumbnail source.
    async fn selected_thumbnail(&mut self) -> Result<ThumbnailLookup, DriverError>;

    /// Writes a PNG screenshot to `path`.
    async fn capture_screenshot(&mut self, path: &Path) -> Result<ScreenshotScope, DriverError>;

    /// Tears down the session. Called exactly once per launched session.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Starts fresh, isolated browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Returns the name of this launcher implementation.
    fn name(&self) -> &str;

    /// Launches a new session.
    async fn launch(&self) -> Result<Box<dyn WizardSession>, DriverError>;
}
