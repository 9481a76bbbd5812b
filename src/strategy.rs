//! PDF strategy selection
//!
//! Browser PDF engines have a practical ceiling on how tall a single page can
//! be. Documents under the ceiling are printed as one page sized to the
//! document, anything taller falls back to a fixed paper format and lets the
//! engine paginate.

use std::fmt;
use std::str::FromStr;

use crate::{DocumentDimensions, Error, Result};

/// CSS pixels per inch
pub const PX_PER_INCH: f64 = 96.0;
/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Convert CSS pixels to inches.
pub fn px_to_inches(px: u32) -> f64 {
    f64::from(px) / PX_PER_INCH
}

/// Convert millimetres to inches.
pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// How the PDF is produced for a measured document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PdfStrategy {
    /// One page with the document's exact size, no margins
    TallSinglePage { width: u32, height: u32 },
    /// Fixed paper format with margins, paginated by the engine
    PaginatedFallback { format: PaperFormat, margins: Margins },
}

impl PdfStrategy {
    /// Pick the strategy for a measured document.
    ///
    /// Heights up to and including `max_tall_height` get a single page whose
    /// height is the measured height and whose width is floored at
    /// `min_width`. Anything taller is paginated regardless of width.
    pub fn select(dims: DocumentDimensions, config: &StrategyConfig) -> Self {
        if dims.height <= config.max_tall_height {
            PdfStrategy::TallSinglePage {
                width: dims.width.max(config.min_width),
                height: dims.height,
            }
        } else {
            PdfStrategy::PaginatedFallback {
                format: config.fallback_format,
                margins: config.fallback_margins,
            }
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PdfStrategy::TallSinglePage { .. } => "tall-single-page",
            PdfStrategy::PaginatedFallback { .. } => "paginated-fallback",
        }
    }
}

impl fmt::Display for PdfStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfStrategy::TallSinglePage { width, height } => {
                write!(f, "{} ({}x{}px)", self.kind(), width, height)
            }
            PdfStrategy::PaginatedFallback { format, margins } => {
                write!(f, "{} ({}, {}mm margins)", self.kind(), format, margins.top)
            }
        }
    }
}

/// Thresholds and page setup used by [`PdfStrategy::select`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    /// Tallest document (px) still printed as a single page
    pub max_tall_height: u32,
    /// Minimum page width (px) for the single-page strategy
    pub min_width: u32,
    /// Paper format of the paginated fallback
    pub fallback_format: PaperFormat,
    /// Margins of the paginated fallback
    pub fallback_margins: Margins,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_tall_height: 45_000,
            min_width: 1200,
            fallback_format: PaperFormat::A4,
            fallback_margins: Margins::uniform(8.0),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tall_height == 0 {
            return Err(Error::ConfigError("max tall height must be non-zero".into()));
        }
        if !self.fallback_margins.all_positive() {
            return Err(Error::ConfigError(format!(
                "fallback margins must be positive on every side, got {:?}",
                self.fallback_margins
            )));
        }
        Ok(())
    }
}

/// Standard paper formats for the paginated fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperFormat {
    A3,
    #[default]
    A4,
    Letter,
    Legal,
}

impl PaperFormat {
    /// Portrait `(width, height)` in inches.
    pub fn size_inches(&self) -> (f64, f64) {
        match self {
            PaperFormat::A3 => (mm_to_inches(297.0), mm_to_inches(420.0)),
            PaperFormat::A4 => (mm_to_inches(210.0), mm_to_inches(297.0)),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaperFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(PaperFormat::A3),
            "a4" => Ok(PaperFormat::A4),
            "letter" => Ok(PaperFormat::Letter),
            "legal" => Ok(PaperFormat::Legal),
            other => Err(Error::ConfigError(format!(
                "unknown paper format '{}' (expected a3, a4, letter or legal)",
                other
            ))),
        }
    }
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    /// Same margin on all four sides.
    pub const fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    pub const fn zero() -> Self {
        Self::uniform(0.0)
    }

    pub fn all_positive(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|m| *m > 0.0)
    }
}
