//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::strategy::{PaperFormat, StrategyConfig};
use crate::{RenderConfig, RenderRequest, Result, WaitPolicy};

#[derive(Debug, Parser)]
#[command(name = "tallpdf", version, about = "Render a report page to a single tall PDF")]
pub struct Cli {
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP adapter
    Serve,
    /// Render once and write the PDF to disk
    Render(RenderOnceArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    /// Listening port
    #[arg(long, env = "PORT", default_value_t = 8787, global = true)]
    pub port: u16,
}

impl ServeArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Args)]
pub struct RenderOnceArgs {
    /// Output file; defaults to "<Locality> Locality Report.pdf"
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Locality used for the default file name
    #[arg(long, default_value = "")]
    pub locality: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Document root the renderer navigates to
    #[arg(long, env = "BASE_DOCUMENT_URL", default_value = "http://localhost:8080", global = true)]
    pub base_document_url: String,

    /// Tallest document (px) printed as a single page
    #[arg(long, env = "MAX_TALL_HEIGHT", default_value_t = 45_000, global = true)]
    pub max_tall_height: u32,

    /// Minimum single-page width (px)
    #[arg(long, env = "MIN_PAGE_WIDTH", default_value_t = 1200, global = true)]
    pub min_width: u32,

    /// Delay after network idle before measuring (ms)
    #[arg(long, env = "SETTLE_DELAY_MS", default_value_t = 1200, global = true)]
    pub settle_delay_ms: u64,

    /// Quiet window that counts as network idle (ms)
    #[arg(long, env = "NETWORK_IDLE_MS", default_value_t = 500, global = true)]
    pub network_idle_ms: u64,

    /// Budget for navigation and stabilization (ms)
    #[arg(long, env = "NAVIGATION_TIMEOUT_MS", default_value_t = 30_000, global = true)]
    pub navigation_timeout_ms: u64,

    /// CSS selector the document adds once rendering is complete
    #[arg(long, env = "READY_SELECTOR", global = true)]
    pub ready_selector: Option<String>,

    /// Paper format of the paginated fallback (a3, a4, letter, legal)
    #[arg(long, env = "FALLBACK_FORMAT", default_value = "a4", global = true)]
    pub fallback_format: PaperFormat,

    /// Chrome/Chromium binary
    #[arg(long, env = "CHROME_PATH", global = true)]
    pub chrome_path: Option<PathBuf>,
}

impl RenderArgs {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            wait: WaitPolicy {
                navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
                network_idle: Duration::from_millis(self.network_idle_ms),
                settle_delay: Duration::from_millis(self.settle_delay_ms),
                ready_selector: self.ready_selector.clone(),
            },
            strategy: StrategyConfig {
                max_tall_height: self.max_tall_height,
                min_width: self.min_width,
                fallback_format: self.fallback_format,
                ..Default::default()
            },
            chrome_path: self.chrome_path.clone(),
            ..Default::default()
        }
    }

    pub fn render_request(&self) -> Result<RenderRequest> {
        RenderRequest::parse(&self.base_document_url)
    }
}
