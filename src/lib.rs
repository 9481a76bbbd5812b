//! Tall PDF renderer
//!
//! Converts a fully rendered, dynamically sized web document (a multi-section
//! report page) into a PDF. A headless browser loads the page, waits for it
//! to settle, and measures its full size. The document is then printed either
//! as one continuous page matching its true dimensions or, when it is taller
//! than the engine can print on a single page, as a paginated fallback.
//!
//! # Features
//!
//! - **CDP Backend** (default): Uses Chrome DevTools Protocol via headless Chrome
//! - **Pluggable renderer**: the pipeline only talks to the [`Renderer`] and
//!   [`RenderSession`] traits, so it can be driven by [`RecordingRenderer`]
//!   in tests
//! - **Guaranteed teardown**: sessions are closed on every exit path
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tallpdf::{cdp::CdpRenderer, RenderConfig, RenderRequest};
//!
//! let config = RenderConfig::default();
//! let request = RenderRequest::parse("http://localhost:8080")?;
//! let pdf = tallpdf::render_pdf(&CdpRenderer::new(), &request, &config)?;
//! std::fs::write("report.pdf", pdf)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cdp"))]
//! # fn main() {}
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

pub mod error;
pub use error::{Error, Result};

pub mod strategy;
pub use strategy::{Margins, PaperFormat, PdfStrategy, StrategyConfig};

pub mod session;
pub use session::{RenderSession, Renderer, SessionGuard};

pub mod pipeline;
pub use pipeline::render_pdf;

pub mod wait;
pub use wait::{IdleTracker, PageActivity};

// Fake renderer used by tests and for exercising the pipeline without Chrome
pub mod recording;
pub use recording::{FailurePoint, RecordingRenderer};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod filename;
pub mod service;
pub use service::PdfService;

pub mod routes;
pub mod server;
pub mod cli;

/// Query markers that switch the report into its print presentation
/// (no navigation chrome, no tooltips).
pub const DEFAULT_PRINT_PARAMS: &[(&str, &str)] = &[("print", "1"), ("pdf", "1")];

/// Configuration for a single render
///
/// The defaults match a desktop report layout: a 1200px wide viewport at a
/// device pixel ratio of 1, so the measured size does not depend on the
/// machine running the render.
///
/// # Examples
///
/// ```
/// let cfg = tallpdf::RenderConfig::default();
/// assert_eq!(cfg.viewport.width, 1200);
/// assert_eq!(cfg.strategy.max_tall_height, 45_000);
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Viewport the document is laid out in
    pub viewport: Viewport,
    /// Fixed device pixel ratio
    pub device_scale_factor: f64,
    /// How long and on what to wait before measuring
    pub wait: WaitPolicy,
    /// Single-page ceiling and fallback page setup
    pub strategy: StrategyConfig,
    /// Explicit Chrome/Chromium binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            wait: WaitPolicy::default(),
            strategy: StrategyConfig::default(),
            chrome_path: None,
        }
    }
}

impl RenderConfig {
    /// Reject values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if !(self.device_scale_factor > 0.0) {
            return Err(Error::ConfigError(format!(
                "device scale factor must be positive, got {}",
                self.device_scale_factor
            )));
        }
        if self.wait.network_idle.is_zero() {
            return Err(Error::ConfigError("network idle window must be non-zero".into()));
        }
        if let Some(selector) = &self.wait.ready_selector {
            if selector.trim().is_empty() {
                return Err(Error::ConfigError("ready selector must not be blank".into()));
            }
        }
        self.strategy.validate()
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
        }
    }
}

/// Stabilization policy applied between navigation and measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Budget for navigation, network idle and the ready marker
    pub navigation_timeout: Duration,
    /// Quiet window with no new resource activity that counts as network idle
    pub network_idle: Duration,
    /// Fixed delay after network idle for content that paints late (charts)
    pub settle_delay: Duration,
    /// DOM marker the document adds once it has finished rendering. When set,
    /// it is polled for instead of sleeping for `settle_delay`.
    pub ready_selector: Option<String>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            network_idle: Duration::from_millis(500),
            settle_delay: Duration::from_millis(1200),
            ready_selector: None,
        }
    }
}

/// What to render: the document root plus the display-mode markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Document root the renderer navigates to
    pub base_url: Url,
    /// Query pairs appended to `base_url`
    pub print_params: Vec<(String, String)>,
}

impl RenderRequest {
    /// Request for `base_url` with the default print-mode markers.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            print_params: DEFAULT_PRINT_PARAMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Parse a base URL string.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("invalid base document URL '{}': {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "base document URL '{}' cannot carry a query",
                base_url
            )));
        }
        Ok(Self::new(url))
    }

    /// The URL actually loaded: the base path as a directory (`/app` becomes
    /// `/app/`) with the print markers appended to any query it already has.
    pub fn target_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        if !self.print_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.print_params {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

/// Rendered size of a document in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentDimensions {
    pub width: u32,
    pub height: u32,
}

impl DocumentDimensions {
    /// Largest extent reported by the root element or the body.
    ///
    /// Either element can under-report when content is floated or
    /// absolutely positioned, so every extent of both is considered.
    pub fn from_metrics(metrics: &DocumentMetrics) -> Self {
        let mut dims = metrics.root.dimensions();
        if let Some(body) = &metrics.body {
            let b = body.dimensions();
            dims.width = dims.width.max(b.width);
            dims.height = dims.height.max(b.height);
        }
        dims
    }
}

/// Raw size readings taken inside the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct DocumentMetrics {
    /// `document.documentElement`
    pub root: ElementExtents,
    /// `document.body`, absent for body-less documents
    pub body: Option<ElementExtents>,
}

/// Scroll, offset and client extents of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementExtents {
    pub scroll_width: u32,
    pub offset_width: u32,
    pub client_width: u32,
    pub scroll_height: u32,
    pub offset_height: u32,
    pub client_height: u32,
}

impl ElementExtents {
    fn dimensions(&self) -> DocumentDimensions {
        DocumentDimensions {
            width: self.scroll_width.max(self.offset_width).max(self.client_width),
            height: self.scroll_height.max(self.offset_height).max(self.client_height),
        }
    }
}
