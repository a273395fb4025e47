//! Chromium-backed wizard session over the DevTools protocol.
//!
//! All knowledge of the external site's markup (selectors, button labels)
//! lives in this file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::capture::{animation_id_channel, AnimationIdCell, ResponseMatcher};
use super::config::{BrowserSettings, WizardConfig};
use super::error::DriverError;
use super::traits::{
    ConsentOutcome, ScreenshotScope, SessionLauncher, StepProbe, ThumbnailLookup, WizardSession,
};

const CONSENT_FOOTER: &str = "div.modal-footer.pb-4";
const CONSENT_MODAL_ACCEPT: &str =
    "//div[contains(@class, 'modal-footer')]//button[contains(normalize-space(.), 'Accept')]";
const CONSENT_GENERIC_ACCEPT: &str = "//button[contains(normalize-space(.), 'Accept')]";
const UPLOAD_BUTTON: &str = "//button[contains(normalize-space(.), 'Upload Photo')]";
const NEXT_BUTTON: &str = "//button[contains(normalize-space(.), 'Next')]";
const RESULTS_GRID: &str = ".grid-container";
const RESULT_ITEM: &str = "div:has(img)";
const SELECTED_THUMBNAIL: &str = ".item-grid-selected img";
const CANVAS: &str = "canvas";

const IS_VISIBLE_JS: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; \
}";
const IS_ENABLED_JS: &str = "function() { return !this.disabled; }";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const CONSENT_SETTLE: Duration = Duration::from_millis(1000);

impl From<CdpError> for DriverError {
    fn from(err: CdpError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

/// Launches a fresh Chromium process per session.
pub struct ChromiumLauncher {
    browser: BrowserSettings,
    wizard: WizardConfig,
}

impl ChromiumLauncher {
    pub fn new(browser: BrowserSettings, wizard: WizardConfig) -> Self {
        Self { browser, wizard }
    }

    fn browser_config(&self) -> Result<BrowserConfig, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.browser.window_width, self.browser.window_height)
            .launch_timeout(Duration::from_secs(self.browser.launch_timeout_secs));

        if !self.browser.headless {
            builder = builder.with_head();
        }
        if self.browser.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &self.browser.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(DriverError::Launch)
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn launch(&self) -> Result<Box<dyn WizardSession>, DriverError> {
        let config = self.browser_config()?;

        info!(headless = self.browser.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(DriverError::Launch(e.to_string()));
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            interceptor: None,
            results: Vec::new(),
            config: self.wizard.clone(),
            closed: false,
        }))
    }
}

/// One browser process with a single page on the wizard.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    interceptor: Option<JoinHandle<()>>,
    results: Vec<Element>,
    config: WizardConfig,
    closed: bool,
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        self.handler_task.abort();
    }
}

enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
}

async fn find(page: &Page, locator: &Locator<'_>) -> Option<Element> {
    match locator {
        Locator::Css(selector) => page.find_element(*selector).await.ok(),
        Locator::XPath(xpath) => page.find_xpath(*xpath).await.ok(),
    }
}

async fn js_flag(element: &Element, function: &str) -> bool {
    match element.call_js_fn(function, false).await {
        Ok(returns) => returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Polls until the element exists and is visible, or `limit` runs out.
async fn wait_visible(page: &Page, locator: Locator<'_>, limit: Duration) -> Option<Element> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(element) = find(page, &locator).await {
            if js_flag(&element, IS_VISIBLE_JS).await {
                return Some(element);
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn read_body(page: &Page, request_id: RequestId) -> Result<String, DriverError> {
    let response = page.execute(GetResponseBodyParams::new(request_id)).await?;
    if response.base64_encoded {
        let bytes = BASE64
            .decode(&response.body)
            .map_err(|e| DriverError::Protocol(format!("Bad base64 response body: {}", e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        Ok(response.body.clone())
    }
}

impl ChromiumSession {
    async fn click_accept(&self, xpath: &str, limit: Duration) -> bool {
        let Some(button) = wait_visible(&self.page, Locator::XPath(xpath), limit).await else {
            return false;
        };
        match button.click().await {
            Ok(_) => {
                sleep(CONSENT_SETTLE).await;
                true
            }
            Err(e) => {
                debug!("Accept button click failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl WizardSession for ChromiumSession {
    async fn intercept_animation_id(&mut self, fragment: &str) -> Result<AnimationIdCell, DriverError> {
        self.page.execute(NetworkEnableParams::default()).await?;
        let mut responses = self.page.event_listener::<EventResponseReceived>().await?;
        let mut finished = self.page.event_listener::<EventLoadingFinished>().await?;

        let (publisher, cell) = animation_id_channel();
        let page = self.page.clone();
        let fragment = fragment.to_string();

        let task = tokio::spawn(async move {
            let mut matcher = ResponseMatcher::new();
            loop {
                let ready = tokio::select! {
                    biased;
                    Some(event) = responses.next() => {
                        let status = event.response.status;
                        if !event.response.url.contains(&fragment) || !(200..300).contains(&status) {
                            continue;
                        }
                        debug!(url = %event.response.url, status, "Matched animation response");
                        matcher.on_response(event.request_id.clone())
                    }
                    Some(event) = finished.next() => matcher.on_finished(event.request_id.clone()),
                    else => break,
                };
                let Some(request_id) = ready else {
                    continue;
                };

                match read_body(&page, request_id).await {
                    Ok(body) => {
                        let id = body.trim();
                        if id.is_empty() {
                            warn!("Animation response body was empty");
                            continue;
                        }
                        if publisher.publish(id) {
                            info!(animation_id = id, "Captured animation id");
                        }
                        break;
                    }
                    Err(e) => warn!("Failed to read animation response body: {}", e),
                }
            }
        });

        if let Some(previous) = self.interceptor.replace(task) {
            previous.abort();
        }
        Ok(cell)
    }

    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn dismiss_consent(&mut self) -> ConsentOutcome {
        let limit = self.config.consent_timeout();

        if wait_visible(&self.page, Locator::Css(CONSENT_FOOTER), limit).await.is_some() {
            debug!("Consent modal footer detected");
            if self.click_accept(CONSENT_MODAL_ACCEPT, limit).await {
                return ConsentOutcome::Modal;
            }
            return ConsentOutcome::Absent;
        }

        if self.click_accept(CONSENT_GENERIC_ACCEPT, limit).await {
            return ConsentOutcome::Generic;
        }
        ConsentOutcome::Absent
    }

    async fn upload(&mut self, image: &Path) -> Result<(), DriverError> {
        let limit = self.config.selector_timeout();
        let button = wait_visible(&self.page, Locator::XPath(UPLOAD_BUTTON), limit)
            .await
            .ok_or_else(|| DriverError::upload("Upload button never became visible"))?;

        let image = tokio::fs::canonicalize(image)
            .await
            .map_err(|e| DriverError::upload(format!("{}: {}", image.display(), e)))?;

        self.page
            .execute(SetInterceptFileChooserDialogParams::new(true))
            .await?;
        let mut choosers = self.page.event_listener::<EventFileChooserOpened>().await?;

        // The chooser listener is live before the click goes out.
        let (opened, clicked) = tokio::join!(timeout(limit, choosers.next()), button.click());
        clicked.map_err(|e| DriverError::upload(format!("Upload click failed: {}", e)))?;

        let chooser = match opened {
            Ok(Some(chooser)) => chooser,
            Ok(None) => return Err(DriverError::upload("File chooser event stream closed")),
            Err(_) => return Err(DriverError::upload("File chooser never opened")),
        };
        let backend_node_id = chooser
            .backend_node_id
            .clone()
            .ok_or_else(|| DriverError::upload("File chooser has no input element"))?;

        let params = SetFileInputFilesParams::builder()
            .files(vec![image.to_string_lossy().into_owned()])
            .backend_node_id(backend_node_id)
            .build()
            .map_err(DriverError::Upload)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| DriverError::upload(e.to_string()))?;

        info!("Image supplied to file chooser");
        Ok(())
    }

    async fn probe_step(&mut self) -> Result<StepProbe, DriverError> {
        let marker = serde_json::to_string(&self.config.terminal_marker)
            .map_err(|e| DriverError::Protocol(e.to_string()))?;
        let expression = format!(
            "document.body ? document.body.textContent.includes({}) : false",
            marker
        );
        // The page re-renders between steps; a destroyed context or a
        // detached button just means nothing can be done this round.
        let at_terminal = match self.page.evaluate(expression).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!("Terminal marker check failed: {}", e);
                return Ok(StepProbe::Idle);
            }
        };
        if at_terminal {
            return Ok(StepProbe::Terminal);
        }

        let Some(next) = find(&self.page, &Locator::XPath(NEXT_BUTTON)).await else {
            return Ok(StepProbe::Idle);
        };
        if !js_flag(&next, IS_VISIBLE_JS).await || !js_flag(&next, IS_ENABLED_JS).await {
            return Ok(StepProbe::Idle);
        }

        if let Err(e) = next.click().await {
            debug!("Next button click failed: {}", e);
            return Ok(StepProbe::Idle);
        }
        Ok(StepProbe::Advanced)
    }

    async fn list_results(&mut self) -> Result<Option<usize>, DriverError> {
        let Ok(grid) = self.page.find_element(RESULTS_GRID).await else {
            self.results.clear();
            return Ok(None);
        };
        self.results = match grid.find_elements(RESULT_ITEM).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to enumerate results: {}", e);
                Vec::new()
            }
        };
        Ok(Some(self.results.len()))
    }

    async fn click_result(&mut self, index: usize) -> Result<(), DriverError> {
        let item = self.results.get(index).ok_or_else(|| {
            DriverError::Protocol(format!(
                "Result {} out of range ({} listed)",
                index,
                self.results.len()
            ))
        })?;
        item.click().await?;
        Ok(())
    }

    async fn selected_thumbnail(&mut self) -> Result<ThumbnailLookup, DriverError> {
        let Ok(thumbnail) = self.page.find_element(SELECTED_THUMBNAIL).await else {
            return Ok(ThumbnailLookup::Missing);
        };
        Ok(match thumbnail.attribute("src").await? {
            Some(src) => ThumbnailLookup::Source(src),
            None => ThumbnailLookup::NoSource,
        })
    }

    async fn capture_screenshot(&mut self, path: &Path) -> Result<ScreenshotScope, DriverError> {
        let (bytes, scope) = match self.page.find_element(CANVAS).await {
            Ok(canvas) => (
                canvas
                    .screenshot(CaptureScreenshotFormat::Png)
                    .await
                    .map_err(|e| DriverError::Screenshot(e.to_string()))?,
                ScreenshotScope::Canvas,
            ),
            Err(_) => {
                let params = ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build();
                (
                    self.page
                        .screenshot(params)
                        .await
                        .map_err(|e| DriverError::Screenshot(e.to_string()))?,
                    ScreenshotScope::FullPage,
                )
            }
        };

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| DriverError::Screenshot(format!("{}: {}", path.display(), e)))?;
        Ok(scope)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        self.results.clear();

        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler_task.abort();

        result.map(|_| ()).map_err(DriverError::from)
    }
}
