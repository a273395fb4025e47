//! Wizard state machine.
//!
//! Drives one [`WizardSession`] through:
//!
//! ```text
//! Init -> ConsentCheck -> Upload -> WizardLoop -> AnimationSelection -> Extraction
//! ```
//!
//! The wizard loop is bounded by `max_attempts`. Running out of attempts
//! skips selection and goes straight to extraction, which then waits on the
//! captured animation id under its own, separate bound.
//!
//! The machine never closes the session; the caller owns it and tears it
//! down on every exit path.

use std::path::Path;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::metrics;

use super::artifact::{parse_asset_name, ArtifactReference};
use super::capture::AnimationIdCell;
use super::config::WizardConfig;
use super::error::DriverError;
use super::traits::{ConsentOutcome, StepProbe, ThumbnailLookup, WizardSession};

/// Number of consent passes; a second overlay can follow the first.
const CONSENT_PASSES: usize = 2;

/// Picks a result index in `0..len`. `len` is never zero.
pub type Picker = fn(usize) -> usize;

fn random_index(len: usize) -> usize {
    rand::thread_rng().gen_range(0..len)
}

/// States of the wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Init,
    ConsentCheck,
    Upload,
    WizardLoop { attempt: u32 },
    AnimationSelection,
    Extraction,
}

/// Successful wizard run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardOutcome {
    /// Identifiers composing the asset URLs.
    pub reference: ArtifactReference,
    /// Probes spent in the wizard loop.
    pub attempts: u32,
    /// Whether the terminal marker was seen.
    pub reached_terminal: bool,
    /// Index clicked in the results grid, if any.
    pub selected_index: Option<usize>,
}

/// Explicit state machine over a [`WizardSession`].
pub struct WizardStateMachine {
    config: WizardConfig,
    picker: Picker,
}

impl WizardStateMachine {
    /// Create a machine that selects results uniformly at random.
    pub fn new(config: WizardConfig) -> Self {
        Self {
            config,
            picker: random_index,
        }
    }

    /// Replace the result picker (deterministic selection in tests).
    pub fn with_picker(mut self, picker: Picker) -> Self {
        self.picker = picker;
        self
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    /// Runs the wizard for `image` to completion.
    pub async fn run(
        &self,
        session: &mut dyn WizardSession,
        image: &Path,
    ) -> Result<WizardOutcome, DriverError> {
        let mut state = WizardState::Init;
        let mut cell: Option<AnimationIdCell> = None;
        let mut attempts = 0u32;
        let mut reached_terminal = false;
        let mut selected_index = None;

        loop {
            debug!(?state, "Wizard state");
            state = match state {
                WizardState::Init => {
                    cell = Some(
                        session
                            .intercept_animation_id(&self.config.animation_endpoint_fragment)
                            .await?,
                    );
                    info!("Opening {}", self.config.start_url);
                    session.open(&self.config.start_url).await?;
                    WizardState::ConsentCheck
                }

                WizardState::ConsentCheck => {
                    for pass in 1..=CONSENT_PASSES {
                        match session.dismiss_consent().await {
                            ConsentOutcome::Absent => {
                                debug!(pass, "No consent overlay found");
                            }
                            outcome => {
                                info!(pass, ?outcome, "Dismissed consent overlay");
                            }
                        }
                    }
                    WizardState::Upload
                }

                WizardState::Upload => {
                    info!("Uploading {}", image.display());
                    session.upload(image).await?;
                    WizardState::WizardLoop { attempt: 1 }
                }

                WizardState::WizardLoop { attempt } => {
                    if attempt > self.config.max_attempts {
                        warn!(
                            max_attempts = self.config.max_attempts,
                            "Wizard never showed the terminal marker, waiting for the animation id anyway"
                        );
                        WizardState::Extraction
                    } else {
                        attempts = attempt;
                        sleep(self.config.step_settle()).await;

                        match session.probe_step().await {
                            Ok(StepProbe::Terminal) => {
                                info!(attempt, "Reached animation selection");
                                reached_terminal = true;
                                WizardState::AnimationSelection
                            }
                            Ok(StepProbe::Advanced) => {
                                debug!(attempt, "Clicked Next");
                                WizardState::WizardLoop {
                                    attempt: attempt + 1,
                                }
                            }
                            Ok(StepProbe::Idle) => {
                                debug!(attempt, "No Next control found, waiting");
                                WizardState::WizardLoop {
                                    attempt: attempt + 1,
                                }
                            }
                            Err(e) => {
                                warn!(attempt, "Wizard step check failed, retrying: {}", e);
                                WizardState::WizardLoop {
                                    attempt: attempt + 1,
                                }
                            }
                        }
                    }
                }

                WizardState::AnimationSelection => {
                    selected_index = self.select_result(session).await?;
                    WizardState::Extraction
                }

                WizardState::Extraction => {
                    let cell = cell
                        .as_mut()
                        .ok_or_else(|| DriverError::extraction("Response interception was never registered"))?;
                    let reference = self.extract(session, cell).await?;

                    metrics::WIZARD_ATTEMPTS
                        .with_label_values(&[if reached_terminal { "true" } else { "false" }])
                        .observe(attempts as f64);

                    info!(
                        animation_id = %reference.animation_id,
                        asset_name = %reference.asset_name,
                        "Extracted artifact reference"
                    );

                    return Ok(WizardOutcome {
                        reference,
                        attempts,
                        reached_terminal,
                        selected_index,
                    });
                }
            };
        }
    }

    async fn select_result(&self, session: &mut dyn WizardSession) -> Result<Option<usize>, DriverError> {
        sleep(self.config.results_settle()).await;

        let count = match session.list_results().await? {
            None => {
                warn!("Results grid not found");
                return Ok(None);
            }
            Some(0) => {
                warn!("Results grid is empty");
                return Ok(None);
            }
            Some(count) => count,
        };

        let index = (self.picker)(count).min(count - 1);
        info!("Selecting result {} of {}", index, count);
        session.click_result(index).await?;
        sleep(self.config.selection_settle()).await;

        Ok(Some(index))
    }

    async fn extract(
        &self,
        session: &mut dyn WizardSession,
        cell: &mut AnimationIdCell,
    ) -> Result<ArtifactReference, DriverError> {
        let animation_id = match cell.get() {
            Some(id) => id,
            None => {
                info!("Waiting for the animation id response");
                cell.wait(self.config.extraction_timeout()).await?
            }
        };

        let src = match session.selected_thumbnail().await? {
            ThumbnailLookup::Source(src) => src,
            ThumbnailLookup::Missing => {
                return Err(DriverError::extraction("No selected animation on the page"));
            }
            ThumbnailLookup::NoSource => {
                return Err(DriverError::extraction("Selected animation has no src attribute"));
            }
        };

        let asset_name = parse_asset_name(&src)?;
        Ok(ArtifactReference::new(animation_id, asset_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{IdDelivery, MockSession, SessionScript};

    fn thumbnail() -> ThumbnailLookup {
        ThumbnailLookup::Source("https://cdn.example.com/media/foo.abc123.gif".to_string())
    }

    #[tokio::test]
    async fn test_happy_path() {
        let script = SessionScript {
            probes: vec![StepProbe::Advanced, StepProbe::Advanced, StepProbe::Terminal],
            result_count: Some(4),
            thumbnail: thumbnail(),
            id_delivery: IdDelivery::Immediately("XYZ".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate()).with_picker(|_| 2);

        let outcome = machine.run(&mut session, Path::new("in.png")).await.unwrap();

        assert_eq!(outcome.reference, ArtifactReference::new("XYZ", "foo"));
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.reached_terminal);
        assert_eq!(outcome.selected_index, Some(2));

        let log = session.log().await;
        assert_eq!(log.consent_checks, 2);
        assert_eq!(log.clicked, vec![2]);
        assert!(log.intercepted_before_open);
    }

    #[tokio::test]
    async fn test_failed_step_check_is_retried() {
        let script = SessionScript {
            probes: vec![StepProbe::Advanced, StepProbe::Terminal],
            failing_steps: 2,
            result_count: Some(3),
            thumbnail: thumbnail(),
            id_delivery: IdDelivery::Immediately("XYZ".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate()).with_picker(|_| 0);

        let outcome = machine.run(&mut session, Path::new("in.png")).await.unwrap();

        assert!(outcome.reached_terminal);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.reference, ArtifactReference::new("XYZ", "foo"));
        assert_eq!(session.log().await.probes, 4);
    }

    #[tokio::test]
    async fn test_exhausted_loop_still_extracts() {
        let script = SessionScript {
            probes: vec![StepProbe::Idle],
            thumbnail: thumbnail(),
            id_delivery: IdDelivery::Immediately("XYZ".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let config = WizardConfig {
            max_attempts: 3,
            ..WizardConfig::immediate()
        };
        let machine = WizardStateMachine::new(config);

        let outcome = machine.run(&mut session, Path::new("in.png")).await.unwrap();

        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.reached_terminal);
        assert_eq!(outcome.selected_index, None);
        assert_eq!(session.log().await.probes, 3);
    }

    #[tokio::test]
    async fn test_extraction_times_out() {
        let script = SessionScript {
            probes: vec![StepProbe::Terminal],
            result_count: Some(1),
            thumbnail: thumbnail(),
            id_delivery: IdDelivery::Never,
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let config = WizardConfig {
            extraction_timeout_secs: 1,
            ..WizardConfig::immediate()
        };
        let machine = WizardStateMachine::new(config);

        let err = machine.run(&mut session, Path::new("in.png")).await.unwrap_err();
        assert!(matches!(err, DriverError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_missing_selection_fails_extraction() {
        let script = SessionScript {
            probes: vec![StepProbe::Terminal],
            result_count: None,
            thumbnail: ThumbnailLookup::Missing,
            id_delivery: IdDelivery::Immediately("XYZ".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate());

        let err = machine.run(&mut session, Path::new("in.png")).await.unwrap_err();
        assert!(matches!(err, DriverError::Extraction(_)));
        assert!(session.log().await.clicked.is_empty());
    }

    #[tokio::test]
    async fn test_bad_thumbnail_src_fails_extraction() {
        let script = SessionScript {
            probes: vec![StepProbe::Terminal],
            result_count: Some(1),
            thumbnail: ThumbnailLookup::Source("https://cdn.example.com/foo.png".to_string()),
            id_delivery: IdDelivery::Immediately("XYZ".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate());

        let err = machine.run(&mut session, Path::new("in.png")).await.unwrap_err();
        assert!(matches!(err, DriverError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_upload_failure_stops_the_run() {
        let script = SessionScript {
            fail_upload: true,
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate());

        let err = machine.run(&mut session, Path::new("in.png")).await.unwrap_err();
        assert!(matches!(err, DriverError::Upload(_)));
        assert_eq!(session.log().await.probes, 0);
    }

    #[tokio::test]
    async fn test_id_published_during_selection() {
        let script = SessionScript {
            probes: vec![StepProbe::Terminal],
            result_count: Some(3),
            thumbnail: thumbnail(),
            id_delivery: IdDelivery::OnSelection("LATE".to_string()),
            ..Default::default()
        };
        let mut session = MockSession::new(script);
        let machine = WizardStateMachine::new(WizardConfig::immediate());

        let outcome = machine.run(&mut session, Path::new("in.png")).await.unwrap();
        assert_eq!(outcome.reference.animation_id, "LATE");
        assert!(outcome.selected_index.unwrap() < 3);
    }
}
