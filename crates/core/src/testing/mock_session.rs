//! Scripted wizard sessions for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::driver::{
    animation_id_channel, AnimationIdCell, AnimationIdPublisher, ConsentOutcome, DriverError,
    ScreenshotScope, SessionLauncher, StepProbe, ThumbnailLookup, WizardSession,
};

/// Fake PNG written by scripted screenshots.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock";

/// When the scripted session publishes the animation id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdDelivery {
    /// As soon as interception is registered.
    Immediately(String),
    /// When a result is clicked.
    OnSelection(String),
    /// Never; extraction will wait until its bound.
    #[default]
    Never,
}

/// Behaviour of a [`MockSession`].
#[derive(Debug, Clone)]
pub struct SessionScript {
    /// Probe results in order; the last one repeats. Empty means `Terminal`.
    pub probes: Vec<StepProbe>,
    /// Leading step checks that fail as if the page re-rendered mid-check.
    /// They are counted in the log but do not consume `probes`.
    pub failing_steps: u32,
    /// Results grid size; `None` when the grid is missing.
    pub result_count: Option<usize>,
    pub thumbnail: ThumbnailLookup,
    pub id_delivery: IdDelivery,
    pub consent: ConsentOutcome,
    pub fail_upload: bool,
    /// Whether the page has a canvas for the fallback screenshot.
    pub has_canvas: bool,
    pub fail_screenshot: bool,
}

impl Default for SessionScript {
    fn default() -> Self {
        Self {
            probes: Vec::new(),
            failing_steps: 0,
            result_count: None,
            thumbnail: ThumbnailLookup::Missing,
            id_delivery: IdDelivery::Never,
            consent: ConsentOutcome::Absent,
            fail_upload: false,
            has_canvas: true,
            fail_screenshot: false,
        }
    }
}

impl SessionScript {
    /// A session that walks the wizard cleanly and yields `animation_id`/`asset_name`.
    pub fn happy(animation_id: &str, asset_name: &str) -> Self {
        Self {
            probes: vec![StepProbe::Advanced, StepProbe::Advanced, StepProbe::Terminal],
            result_count: Some(6),
            thumbnail: ThumbnailLookup::Source(format!(
                "https://cdn.example.com/thumbs/{}.dance.gif",
                asset_name
            )),
            id_delivery: IdDelivery::Immediately(animation_id.to_string()),
            ..Default::default()
        }
    }
}

/// What a session was asked to do.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub opened: Option<String>,
    pub intercepted_before_open: bool,
    pub consent_checks: usize,
    pub uploaded: Option<PathBuf>,
    pub probes: u32,
    pub clicked: Vec<usize>,
    pub screenshots: Vec<PathBuf>,
    pub closes: u32,
}

/// Scripted implementation of [`WizardSession`].
pub struct MockSession {
    script: SessionScript,
    log: Arc<RwLock<SessionLog>>,
    publisher: Option<AnimationIdPublisher>,
    intercepting: bool,
}

impl MockSession {
    pub fn new(script: SessionScript) -> Self {
        Self::with_log(script, Arc::new(RwLock::new(SessionLog::default())))
    }

    fn with_log(script: SessionScript, log: Arc<RwLock<SessionLog>>) -> Self {
        Self {
            script,
            log,
            publisher: None,
            intercepting: false,
        }
    }

    /// Snapshot of what the session has done so far.
    pub async fn log(&self) -> SessionLog {
        self.log.read().await.clone()
    }
}

#[async_trait]
impl WizardSession for MockSession {
    async fn intercept_animation_id(&mut self, _fragment: &str) -> Result<AnimationIdCell, DriverError> {
        let (publisher, cell) = animation_id_channel();
        if let IdDelivery::Immediately(ref id) = self.script.id_delivery {
            publisher.publish(id.clone());
        }
        self.publisher = Some(publisher);
        self.intercepting = true;
        Ok(cell)
    }

    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        let mut log = self.log.write().await;
        log.opened = Some(url.to_string());
        log.intercepted_before_open = self.intercepting;
        Ok(())
    }

    async fn dismiss_consent(&mut self) -> ConsentOutcome {
        self.log.write().await.consent_checks += 1;
        self.script.consent
    }

    async fn upload(&mut self, image: &Path) -> Result<(), DriverError> {
        if self.script.fail_upload {
            return Err(DriverError::upload("File chooser never opened"));
        }
        self.log.write().await.uploaded = Some(image.to_path_buf());
        Ok(())
    }

    async fn probe_step(&mut self) -> Result<StepProbe, DriverError> {
        let mut log = self.log.write().await;
        let call = log.probes;
        log.probes += 1;
        if call < self.script.failing_steps {
            return Err(DriverError::Protocol(
                "Execution context was destroyed".to_string(),
            ));
        }
        let index = (call - self.script.failing_steps) as usize;

        let probe = self
            .script
            .probes
            .get(index)
            .or_else(|| self.script.probes.last())
            .copied()
            .unwrap_or(StepProbe::Terminal);
        Ok(probe)
    }

    async fn list_results(&mut self) -> Result<Option<usize>, DriverError> {
        Ok(self.script.result_count)
    }

    async fn click_result(&mut self, index: usize) -> Result<(), DriverError> {
        let count = self.script.result_count.unwrap_or(0);
        if index >= count {
            return Err(DriverError::Protocol(format!(
                "Result {} out of range ({} listed)",
                index, count
            )));
        }

        self.log.write().await.clicked.push(index);
        if let (IdDelivery::OnSelection(id), Some(publisher)) =
            (&self.script.id_delivery, &self.publisher)
        {
            publisher.publish(id.clone());
        }
        Ok(())
    }

    async fn selected_thumbnail(&mut self) -> Result<ThumbnailLookup, DriverError> {
        Ok(self.script.thumbnail.clone())
    }

    async fn capture_screenshot(&mut self, path: &Path) -> Result<ScreenshotScope, DriverError> {
        if self.script.fail_screenshot {
            return Err(DriverError::Screenshot("page crashed".to_string()));
        }
        tokio::fs::write(path, FAKE_PNG)
            .await
            .map_err(|e| DriverError::Screenshot(e.to_string()))?;
        self.log.write().await.screenshots.push(path.to_path_buf());

        Ok(if self.script.has_canvas {
            ScreenshotScope::Canvas
        } else {
            ScreenshotScope::FullPage
        })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.publisher = None;
        self.log.write().await.closes += 1;
        Ok(())
    }
}

/// Launcher handing out [`MockSession`]s that share one script.
///
/// # Example
///
/// ```rust,ignore
/// use sketchloop_core::testing::{MockLauncher, SessionScript};
///
/// let launcher = MockLauncher::new(SessionScript::happy("XYZ", "foo"));
/// // ... run a job ...
/// assert_eq!(launcher.launch_count().await, 1);
/// assert_eq!(launcher.close_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockLauncher {
    script: Arc<RwLock<SessionScript>>,
    sessions: Arc<RwLock<Vec<Arc<RwLock<SessionLog>>>>>,
    fail_launch: Arc<RwLock<bool>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new(SessionScript::default())
    }
}

impl MockLauncher {
    pub fn new(script: SessionScript) -> Self {
        Self {
            script: Arc::new(RwLock::new(script)),
            sessions: Arc::new(RwLock::new(Vec::new())),
            fail_launch: Arc::new(RwLock::new(false)),
        }
    }

    /// Script used by sessions launched from now on.
    pub async fn set_script(&self, script: SessionScript) {
        *self.script.write().await = script;
    }

    pub async fn set_fail_launch(&self, fail: bool) {
        *self.fail_launch.write().await = fail;
    }

    pub async fn launch_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Total `close` calls across all launched sessions.
    pub async fn close_count(&self) -> u32 {
        let mut total = 0;
        for log in self.sessions.read().await.iter() {
            total += log.read().await.closes;
        }
        total
    }

    /// Logs of every launched session, oldest first.
    pub async fn session_logs(&self) -> Vec<SessionLog> {
        let mut logs = Vec::new();
        for log in self.sessions.read().await.iter() {
            logs.push(log.read().await.clone());
        }
        logs
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn launch(&self) -> Result<Box<dyn WizardSession>, DriverError> {
        if *self.fail_launch.read().await {
            return Err(DriverError::Launch("mock launch failure".to_string()));
        }

        let log = Arc::new(RwLock::new(SessionLog::default()));
        self.sessions.write().await.push(log.clone());

        let script = self.script.read().await.clone();
        Ok(Box::new(MockSession::with_log(script, log)))
    }
}
