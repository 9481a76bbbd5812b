//! Renderer abstraction and scoped session release
//!
//! A [`Renderer`] opens one isolated [`RenderSession`] per request. The
//! session owns a browser process, so it is wrapped in a [`SessionGuard`]
//! that closes it exactly once: explicitly on success, or on drop when an
//! earlier stage bails out with `?`.

use log::{debug, warn};

use crate::{DocumentDimensions, Error, PdfStrategy, RenderConfig, Result, WaitPolicy};
use url::Url;

/// Factory for isolated render sessions
pub trait Renderer: Send + Sync {
    type Session: RenderSession;

    /// Launch an isolated browser context with one page.
    fn open(&self, config: &RenderConfig) -> Result<Self::Session>;
}

/// One browser context and page, used for a single request
pub trait RenderSession {
    /// Navigate to `url`, wait according to `wait`, and measure the
    /// fully rendered document.
    fn measure(&mut self, url: &Url, wait: &WaitPolicy) -> Result<DocumentDimensions>;

    /// Print the loaded document with the given strategy.
    fn generate(&mut self, strategy: &PdfStrategy) -> Result<Vec<u8>>;

    /// Close the page, context and browser.
    fn close(self) -> Result<()>;
}

/// Closes the wrapped session on every exit path
pub struct SessionGuard<S: RenderSession> {
    session: Option<S>,
}

impl<S: RenderSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Borrow the live session.
    pub fn session(&mut self) -> Result<&mut S> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Other("render session already closed".into()))
    }

    /// Close the session now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: RenderSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("closing render session on early exit");
            if let Err(e) = session.close() {
                warn!("Failed to close render session: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl RenderSession for CountingSession {
        fn measure(&mut self, _url: &Url, _wait: &WaitPolicy) -> Result<DocumentDimensions> {
            Ok(DocumentDimensions::default())
        }

        fn generate(&mut self, _strategy: &PdfStrategy) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn close(self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(Error::Other("close failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn session(closes: &Arc<AtomicUsize>, fail_close: bool) -> CountingSession {
        CountingSession {
            closes: closes.clone(),
            fail_close,
        }
    }

    #[test]
    fn explicit_close_runs_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let guard = SessionGuard::new(session(&closes, false));
        guard.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_closes_unclosed_session() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SessionGuard::new(session(&closes, false));
            assert!(guard.session().is_ok());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_error_is_reported_but_not_repeated() {
        let closes = Arc::new(AtomicUsize::new(0));
        let guard = SessionGuard::new(session(&closes, true));
        assert!(guard.close().is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        {
            let _guard = SessionGuard::new(session(&closes, true));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }
}
