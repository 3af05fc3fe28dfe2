//! Bounded-retry bookkeeping. Errors are classified by response status:
//! 404 and 403 will not succeed on retry and short-circuit immediately;
//! everything else may be retried, at most three attempts per rolling
//! 60-second window and cache key.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reqwest::StatusCode;

use crate::api::ClientError;
use crate::platform::Clock;

pub const MAX_ATTEMPTS: u32 = 3;
pub const ATTEMPT_WINDOW_MS: i64 = 60_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Terminal,
    Retryable,
}

pub fn classify(error: &ClientError) -> ErrorClass {
    match error.status() {
        Some(StatusCode::NOT_FOUND) | Some(StatusCode::FORBIDDEN) => ErrorClass::Terminal,
        _ => ErrorClass::Retryable,
    }
}

#[derive(Clone, Copy, Debug)]
struct AttemptWindow {
    failures: u32,
    window_start_ms: i64,
}

pub struct RetryGate {
    clock: Rc<dyn Clock>,
    windows: RefCell<HashMap<String, AttemptWindow>>,
}

impl RetryGate {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: RefCell::new(HashMap::new()),
        }
    }

    /// False once the key has burned its attempt budget inside the current
    /// window. An elapsed window is discarded, so the next failure opens a
    /// fresh one.
    pub fn can_attempt(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut windows = self.windows.borrow_mut();
        let elapsed = matches!(
            windows.get(key),
            Some(window) if now - window.window_start_ms >= ATTEMPT_WINDOW_MS
        );
        if elapsed {
            windows.remove(key);
            return true;
        }
        windows
            .get(key)
            .map_or(true, |window| window.failures < MAX_ATTEMPTS)
    }

    pub fn record_failure(&self, key: &str) {
        let now = self.clock.now_ms();
        let mut windows = self.windows.borrow_mut();
        let window = windows.entry(key.to_string()).or_insert(AttemptWindow {
            failures: 0,
            window_start_ms: now,
        });
        if now - window.window_start_ms >= ATTEMPT_WINDOW_MS {
            *window = AttemptWindow {
                failures: 0,
                window_start_ms: now,
            };
        }
        window.failures += 1;
        if window.failures >= MAX_ATTEMPTS {
            tracing::warn!(
                "retry budget exhausted for {key} ({} failures this window)",
                window.failures
            );
        }
    }

    pub fn record_success(&self, key: &str) {
        self.windows.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakeClock;

    fn api_error(status: StatusCode) -> ClientError {
        ClientError::Api {
            status,
            code: None,
            message: "boom".into(),
        }
    }

    #[test]
    fn not_found_and_forbidden_are_terminal() {
        assert_eq!(
            classify(&api_error(StatusCode::NOT_FOUND)),
            ErrorClass::Terminal
        );
        assert_eq!(
            classify(&api_error(StatusCode::FORBIDDEN)),
            ErrorClass::Terminal
        );
    }

    #[test]
    fn server_errors_and_decode_failures_are_retryable() {
        assert_eq!(
            classify(&api_error(StatusCode::INTERNAL_SERVER_ERROR)),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify(&api_error(StatusCode::BAD_GATEWAY)),
            ErrorClass::Retryable
        );
        let decode = ClientError::Decode(serde_json::from_str::<u32>("oops").unwrap_err());
        assert_eq!(classify(&decode), ErrorClass::Retryable);
    }

    #[test]
    fn three_failures_exhaust_the_window() {
        let clock = FakeClock::at(0);
        let gate = RetryGate::new(Rc::new(clock.clone()));

        for _ in 0..MAX_ATTEMPTS {
            assert!(gate.can_attempt("k"));
            gate.record_failure("k");
        }
        assert!(!gate.can_attempt("k"));

        // still inside the window
        clock.advance(ATTEMPT_WINDOW_MS - 1);
        assert!(!gate.can_attempt("k"));
    }

    #[test]
    fn budget_resets_once_the_window_elapses() {
        let clock = FakeClock::at(0);
        let gate = RetryGate::new(Rc::new(clock.clone()));
        for _ in 0..MAX_ATTEMPTS {
            gate.record_failure("k");
        }
        assert!(!gate.can_attempt("k"));

        clock.advance(ATTEMPT_WINDOW_MS);
        assert!(gate.can_attempt("k"));

        // the next failure opens a new window rather than extending the old
        gate.record_failure("k");
        assert!(gate.can_attempt("k"));
    }

    #[test]
    fn success_discards_the_window() {
        let clock = FakeClock::at(0);
        let gate = RetryGate::new(Rc::new(clock.clone()));
        gate.record_failure("k");
        gate.record_failure("k");
        gate.record_success("k");

        for _ in 0..MAX_ATTEMPTS {
            assert!(gate.can_attempt("k"));
            gate.record_failure("k");
        }
        assert!(!gate.can_attempt("k"));
    }

    #[test]
    fn windows_are_scoped_per_key() {
        let clock = FakeClock::at(0);
        let gate = RetryGate::new(Rc::new(clock));
        for _ in 0..MAX_ATTEMPTS {
            gate.record_failure("a");
        }
        assert!(!gate.can_attempt("a"));
        assert!(gate.can_attempt("b"));
    }
}
