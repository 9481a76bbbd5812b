//! A renderer that never starts a browser
//!
//! `RecordingRenderer` reports fixed dimensions, returns a tiny placeholder
//! PDF, and records every call so tests can assert on the strategy that was
//! chosen and on session teardown. A failure can be injected at any stage.

use std::sync::{Arc, Mutex, MutexGuard};

use url::Url;

use crate::session::{RenderSession, Renderer};
use crate::{DocumentDimensions, Error, PdfStrategy, RenderConfig, Result, WaitPolicy};

/// Placeholder document returned by [`RecordingSession::generate`]
pub const PLACEHOLDER_PDF: &[u8] = b"%PDF-1.7\n% recording renderer\n%%EOF\n";

/// Stage at which a [`RecordingRenderer`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Launch,
    Navigate,
    Measure,
    Generate,
    Close,
}

/// Calls observed by a [`RecordingRenderer`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallLog {
    pub opened: usize,
    pub closed: usize,
    pub measured_urls: Vec<String>,
    pub generated: Vec<PdfStrategy>,
}

impl CallLog {
    /// Sessions opened but not closed.
    pub fn leaked(&self) -> usize {
        self.opened.saturating_sub(self.closed)
    }
}

/// Fake renderer; clones share the same call log
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    dims: DocumentDimensions,
    fail_at: Option<FailurePoint>,
    log: Arc<Mutex<CallLog>>,
}

impl RecordingRenderer {
    pub fn new(dims: DocumentDimensions) -> Self {
        Self {
            dims,
            fail_at: None,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Fail with the matching error when `point` is reached.
    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    /// Snapshot of the calls so far.
    pub fn log(&self) -> CallLog {
        lock(&self.log).clone()
    }
}

impl Renderer for RecordingRenderer {
    type Session = RecordingSession;

    fn open(&self, _config: &RenderConfig) -> Result<RecordingSession> {
        if self.fail_at == Some(FailurePoint::Launch) {
            return Err(Error::LaunchFailure("injected launch failure".into()));
        }
        lock(&self.log).opened += 1;
        Ok(RecordingSession {
            dims: self.dims,
            fail_at: self.fail_at,
            log: self.log.clone(),
        })
    }
}

/// Session handed out by [`RecordingRenderer`]
#[derive(Debug)]
pub struct RecordingSession {
    dims: DocumentDimensions,
    fail_at: Option<FailurePoint>,
    log: Arc<Mutex<CallLog>>,
}

impl RenderSession for RecordingSession {
    fn measure(&mut self, url: &Url, _wait: &WaitPolicy) -> Result<DocumentDimensions> {
        lock(&self.log).measured_urls.push(url.to_string());
        match self.fail_at {
            Some(FailurePoint::Navigate) => Err(Error::NavigationFailure(format!(
                "injected navigation failure for {}",
                url
            ))),
            Some(FailurePoint::Measure) => {
                Err(Error::MeasurementFailure("injected measurement failure".into()))
            }
            _ => Ok(self.dims),
        }
    }

    fn generate(&mut self, strategy: &PdfStrategy) -> Result<Vec<u8>> {
        lock(&self.log).generated.push(*strategy);
        if self.fail_at == Some(FailurePoint::Generate) {
            return Err(Error::GenerationFailure("injected generation failure".into()));
        }
        Ok(PLACEHOLDER_PDF.to_vec())
    }

    fn close(self) -> Result<()> {
        lock(&self.log).closed += 1;
        if self.fail_at == Some(FailurePoint::Close) {
            return Err(Error::Other("injected close failure".into()));
        }
        Ok(())
    }
}

fn lock(log: &Mutex<CallLog>) -> MutexGuard<'_, CallLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
