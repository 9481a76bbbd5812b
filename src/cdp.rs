//! Chrome DevTools Protocol renderer implementation

use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::Tab;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use url::Url;

use crate::session::{RenderSession, Renderer};
use crate::strategy::{mm_to_inches, px_to_inches};
use crate::wait::{poll_until, IdleTracker, PageActivity};
use crate::{DocumentDimensions, DocumentMetrics, Error, PdfStrategy, RenderConfig, Result, WaitPolicy};

/// Extra Chrome flags. The setuid sandbox is unavailable in most containers.
const LAUNCH_ARGS: &[&str] = &["--disable-setuid-sandbox", "--font-render-hinting=medium"];

/// How often page state is polled while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Headroom on top of the navigation budget before Chrome's idle watchdog
/// kills the browser
const IDLE_BROWSER_HEADROOM: Duration = Duration::from_secs(60);

/// Reports ready state and the number of finished resource loads. The
/// resource timing buffer holds 250 entries by default, after which the count
/// would stop moving, so the first call raises the limit and starts an
/// observer that keeps counting regardless of the buffer.
const ACTIVITY_JS: &str = r#"(function() {
    let tracker = window.__tallpdfActivity;
    if (!tracker) {
        tracker = window.__tallpdfActivity = { resources: 0, observed: false };
        if (typeof performance.setResourceTimingBufferSize === 'function') {
            performance.setResourceTimingBufferSize(100000);
        }
        if (typeof PerformanceObserver === 'function') {
            try {
                new PerformanceObserver(function(list) {
                    tracker.resources += list.getEntries().length;
                }).observe({ type: 'resource', buffered: true });
                tracker.observed = true;
            } catch (e) {}
        }
    }
    const resources = tracker.observed
        ? tracker.resources
        : performance.getEntriesByType('resource').length;
    return JSON.stringify({ readyState: document.readyState, resources: resources });
})()"#;

const MEASURE_JS: &str = r#"(function() {
    const extents = function(el) {
        if (!el) return null;
        return {
            scrollWidth: el.scrollWidth,
            offsetWidth: el.offsetWidth,
            clientWidth: el.clientWidth,
            scrollHeight: el.scrollHeight,
            offsetHeight: el.offsetHeight,
            clientHeight: el.clientHeight
        };
    };
    return JSON.stringify({ root: extents(document.documentElement), body: extents(document.body) });
})()"#;

/// Launches a fresh headless Chrome per session (uses the `headless_chrome` crate)
#[derive(Debug, Clone, Default)]
pub struct CdpRenderer;

impl CdpRenderer {
    pub fn new() -> Self {
        CdpRenderer
    }
}

impl Renderer for CdpRenderer {
    type Session = CdpSession;

    fn open(&self, config: &RenderConfig) -> Result<CdpSession> {
        let scale_arg = format!("--force-device-scale-factor={}", config.device_scale_factor);
        let mut args: Vec<&OsStr> = LAUNCH_ARGS.iter().map(OsStr::new).collect();
        args.push(OsStr::new(&scale_arg));

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .args(args)
            .idle_browser_timeout(config.wait.navigation_timeout + IDLE_BROWSER_HEADROOM)
            .build()
            .map_err(|e| Error::LaunchFailure(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::LaunchFailure(format!("Failed to launch browser: {}", e)))?;

        // Cookie/storage isolated context with a single page. If this fails the
        // browser is dropped here, which kills the child process.
        let (context_id, tab) = {
            let context = browser
                .new_context()
                .map_err(|e| Error::LaunchFailure(format!("Failed to create browser context: {}", e)))?;
            let tab = context
                .new_tab()
                .map_err(|e| Error::LaunchFailure(format!("Failed to create tab: {}", e)))?;
            (context.get_id().to_string(), tab)
        };

        debug!("launched browser with isolated context {}", context_id);

        Ok(CdpSession {
            browser,
            tab,
            context_id,
        })
    }
}

/// One headless Chrome process, context and tab
pub struct CdpSession {
    browser: Browser,
    tab: Arc<Tab>,
    context_id: String,
}

impl CdpSession {
    /// Evaluate `script` and return its string result.
    fn eval_string(&self, script: &str) -> std::result::Result<String, String> {
        let remote = self
            .tab
            .evaluate(script, false)
            .map_err(|e| format!("Evaluation failed: {}", e))?;
        match remote.value {
            Some(serde_json::Value::String(s)) => Ok(s),
            Some(other) => Err(format!("Expected a string result, got {}", other)),
            None => Err("No value returned from evaluation".into()),
        }
    }

    fn navigate(&self, url: &Url, wait: &WaitPolicy) -> Result<()> {
        self.tab.set_default_timeout(wait.navigation_timeout);

        self.tab
            .navigate_to(url.as_str())
            .map_err(|e| Error::NavigationFailure(format!("Navigation to {} failed: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::NavigationFailure(format!("Wait for navigation failed: {}", e)))?;

        // Chrome swaps in an internal error page instead of failing the load
        let landed = self.eval_string("location.href").map_err(Error::NavigationFailure)?;
        if landed.starts_with("chrome-error://") {
            return Err(Error::NavigationFailure(format!("{} could not be loaded", url)));
        }

        Ok(())
    }

    /// Poll until the document is complete and its resource count has been
    /// stable for the idle window.
    fn wait_for_network_idle(&self, wait: &WaitPolicy, deadline: Instant) -> Result<()> {
        let mut tracker = IdleTracker::new(wait.network_idle);

        let idle = poll_until(deadline, POLL_INTERVAL, |now| {
            let raw = self
                .eval_string(ACTIVITY_JS)
                .map_err(|e| Error::NavigationFailure(format!("Network activity check failed: {}", e)))?;
            let activity: PageActivity = serde_json::from_str(&raw)
                .map_err(|e| Error::NavigationFailure(format!("Malformed network activity report: {}", e)))?;
            Ok(tracker.observe(activity, now))
        })?;

        if !idle {
            return Err(Error::NavigationFailure(format!(
                "Page did not reach network idle within {}ms",
                wait.navigation_timeout.as_millis()
            )));
        }
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str, deadline: Instant) -> Result<()> {
        let literal = serde_json::to_string(selector)
            .map_err(|e| Error::Other(format!("Failed to encode selector: {}", e)))?;
        let script = format!("String(document.querySelector({}) !== null)", literal);

        let found = poll_until(deadline, POLL_INTERVAL, |_| {
            self.eval_string(&script)
                .map(|found| found == "true")
                .map_err(|e| Error::NavigationFailure(format!("Ready marker lookup failed: {}", e)))
        })?;

        if !found {
            return Err(Error::NavigationFailure(format!(
                "Ready marker '{}' did not appear in time",
                selector
            )));
        }
        Ok(())
    }
}

impl RenderSession for CdpSession {
    fn measure(&mut self, url: &Url, wait: &WaitPolicy) -> Result<DocumentDimensions> {
        let deadline = Instant::now() + wait.navigation_timeout;

        self.navigate(url, wait)?;
        self.wait_for_network_idle(wait, deadline)?;
        debug!("network idle reached for {}", url);

        match &wait.ready_selector {
            Some(selector) => self.wait_for_selector(selector, deadline)?,
            None => thread::sleep(wait.settle_delay),
        }

        let raw = self
            .eval_string(MEASURE_JS)
            .map_err(Error::MeasurementFailure)?;
        let metrics: DocumentMetrics = serde_json::from_str(&raw)
            .map_err(|e| Error::MeasurementFailure(format!("Malformed document metrics: {}", e)))?;

        Ok(DocumentDimensions::from_metrics(&metrics))
    }

    fn generate(&mut self, strategy: &PdfStrategy) -> Result<Vec<u8>> {
        self.tab
            .print_to_pdf(Some(print_options(strategy)))
            .map_err(|e| Error::GenerationFailure(format!("print_to_pdf ({}) failed: {}", strategy.kind(), e)))
    }

    fn close(self) -> Result<()> {
        let closed = self.tab.close(false);
        // Dropping the browser terminates the child process and with it the
        // isolated context.
        drop(self.tab);
        drop(self.browser);
        debug!("closed browser context {}", self.context_id);

        closed.map(|_| ()).map_err(|e| {
            warn!("Failed to close tab cleanly: {}", e);
            Error::Other(format!("Failed to close tab: {}", e))
        })
    }
}

/// Chrome print options for a strategy.
pub fn print_options(strategy: &PdfStrategy) -> PrintToPdfOptions {
    match strategy {
        PdfStrategy::TallSinglePage { width, height } => PrintToPdfOptions {
            print_background: Some(true),
            prefer_css_page_size: Some(false),
            paper_width: Some(px_to_inches(*width)),
            paper_height: Some(px_to_inches(*height)),
            margin_top: Some(0.0),
            margin_right: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            page_ranges: Some("1".to_string()),
            ..Default::default()
        },
        PdfStrategy::PaginatedFallback { format, margins } => {
            let (paper_width, paper_height) = format.size_inches();
            PrintToPdfOptions {
                print_background: Some(true),
                prefer_css_page_size: Some(false),
                paper_width: Some(paper_width),
                paper_height: Some(paper_height),
                margin_top: Some(mm_to_inches(margins.top)),
                margin_right: Some(mm_to_inches(margins.right)),
                margin_bottom: Some(mm_to_inches(margins.bottom)),
                margin_left: Some(mm_to_inches(margins.left)),
                ..Default::default()
            }
        }
    }
}
