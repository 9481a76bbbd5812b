//! Page stabilization primitives
//!
//! The browser side only reports snapshots of page activity; deciding when a
//! page counts as network idle, and how long to keep polling, happens here.

use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::Result;

/// One reading of page load state
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageActivity {
    /// `document.readyState`
    pub ready_state: String,
    /// Resource loads completed so far
    pub resources: usize,
}

impl PageActivity {
    pub fn is_complete(&self) -> bool {
        self.ready_state == "complete"
    }
}

/// Network-idle condition: the page is `complete` and no reading has changed
/// for `window`.
#[derive(Debug)]
pub struct IdleTracker {
    window: Duration,
    last: Option<PageActivity>,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            quiet_since: None,
        }
    }

    /// Record a reading taken at `now` and report whether the page is idle.
    pub fn observe(&mut self, activity: PageActivity, now: Instant) -> bool {
        if self.last.as_ref() != Some(&activity) {
            self.last = Some(activity);
            self.quiet_since = Some(now);
            return false;
        }

        match (&self.last, self.quiet_since) {
            (Some(last), Some(since)) => last.is_complete() && now.saturating_duration_since(since) >= self.window,
            _ => false,
        }
    }
}

/// Run `check` every `interval` until it returns `true` or `deadline` passes.
///
/// Returns `Ok(false)` on timeout. `check` is always run at least once and
/// its errors end the wait.
pub fn poll_until<F>(deadline: Instant, interval: Duration, mut check: F) -> Result<bool>
where
    F: FnMut(Instant) -> Result<bool>,
{
    loop {
        let now = Instant::now();
        if check(now)? {
            return Ok(true);
        }
        if now >= deadline {
            return Ok(false);
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn activity(state: &str, resources: usize) -> PageActivity {
        PageActivity {
            ready_state: state.to_string(),
            resources,
        }
    }

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn first_reading_is_never_idle() {
        let mut t = IdleTracker::new(WINDOW);
        assert!(!t.observe(activity("complete", 3), Instant::now()));
    }

    #[test]
    fn new_activity_resets_the_window() {
        let start = Instant::now();
        let mut t = IdleTracker::new(WINDOW);
        assert!(!t.observe(activity("complete", 3), start));
        assert!(!t.observe(activity("complete", 4), start + Duration::from_millis(400)));
        // 500ms after the first reading but only 200ms after the last change
        assert!(!t.observe(activity("complete", 4), start + Duration::from_millis(600)));
        assert!(t.observe(activity("complete", 4), start + Duration::from_millis(900)));
    }

    #[test]
    fn loading_page_is_never_idle() {
        let start = Instant::now();
        let mut t = IdleTracker::new(WINDOW);
        for ms in [0, 500, 1_000, 10_000] {
            assert!(!t.observe(activity("loading", 0), start + Duration::from_millis(ms)));
        }
        assert!(!t.observe(activity("interactive", 0), start + Duration::from_millis(10_000)));
        assert!(!t.observe(activity("interactive", 0), start + Duration::from_millis(20_000)));
    }

    #[test]
    fn idle_exactly_at_the_window_boundary() {
        let start = Instant::now();
        let mut t = IdleTracker::new(WINDOW);
        t.observe(activity("complete", 7), start);
        assert!(!t.observe(activity("complete", 7), start + WINDOW - Duration::from_millis(1)));
        assert!(t.observe(activity("complete", 7), start + WINDOW));
    }

    #[test]
    fn ready_state_change_counts_as_activity() {
        let start = Instant::now();
        let mut t = IdleTracker::new(WINDOW);
        t.observe(activity("interactive", 2), start);
        assert!(!t.observe(activity("complete", 2), start + Duration::from_secs(5)));
        assert!(t.observe(activity("complete", 2), start + Duration::from_secs(6)));
    }

    #[test]
    fn deadline_expires_while_page_stays_busy() {
        let mut t = IdleTracker::new(Duration::from_millis(5));
        let mut resources = 0;
        let deadline = Instant::now() + Duration::from_millis(30);

        let idle = poll_until(deadline, Duration::from_millis(1), |now| {
            resources += 1;
            Ok(t.observe(activity("complete", resources), now))
        })
        .unwrap();

        assert!(!idle);
        assert!(resources > 1);
    }

    #[test]
    fn quiet_page_becomes_idle_before_deadline() {
        let mut t = IdleTracker::new(Duration::from_millis(5));
        let deadline = Instant::now() + Duration::from_secs(5);
        let idle = poll_until(deadline, Duration::from_millis(1), |now| {
            Ok(t.observe(activity("complete", 12), now))
        })
        .unwrap();
        assert!(idle);
    }

    #[test]
    fn poll_stops_when_check_succeeds() {
        let mut calls = 0;
        let found = poll_until(Instant::now() + Duration::from_secs(5), Duration::from_millis(1), |_| {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();
        assert!(found);
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_runs_once_after_deadline_and_propagates_errors() {
        let mut calls = 0;
        let expired = Instant::now() - Duration::from_millis(1);
        assert!(!poll_until(expired, Duration::from_millis(1), |_| {
            calls += 1;
            Ok(false)
        })
        .unwrap());
        assert_eq!(calls, 1);

        let err = poll_until(expired, Duration::from_millis(1), |_| {
            Err(Error::NavigationFailure("evaluation failed".into()))
        })
        .unwrap_err();
        assert_eq!(err.stage(), "navigate");
    }

    #[test]
    fn activity_reading_parses() {
        let a: PageActivity = serde_json::from_str(r#"{"readyState":"complete","resources":312}"#).unwrap();
        assert!(a.is_complete());
        assert_eq!(a.resources, 312);
    }
}
