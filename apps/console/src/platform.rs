use std::rc::Rc;

use futures::future::LocalBoxFuture;

/// Wall-clock source, injected wherever freshness decisions are made so
/// tests can substitute a controllable clock.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Async timer source. The browser build sleeps on the event loop; tests
/// drive time by hand instead of waiting.
pub trait Sleeper {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}

#[cfg(target_arch = "wasm32")]
pub struct BrowserClock;

#[cfg(target_arch = "wasm32")]
impl Clock for BrowserClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub struct SystemClock;

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[cfg(target_arch = "wasm32")]
pub struct BrowserSleeper;

#[cfg(target_arch = "wasm32")]
impl Sleeper for BrowserSleeper {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(gloo_timers::future::TimeoutFuture::new(ms))
    }
}

/// Native builds exist for CI compilation and unit tests only; there is no
/// event loop to park on, so sleeping resolves immediately.
#[cfg(not(target_arch = "wasm32"))]
pub struct ImmediateSleeper;

#[cfg(not(target_arch = "wasm32"))]
impl Sleeper for ImmediateSleeper {
    fn sleep(&self, _ms: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }
}

pub fn default_clock() -> Rc<dyn Clock> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(BrowserClock)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Rc::new(SystemClock)
    }
}

pub fn default_sleeper() -> Rc<dyn Sleeper> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(BrowserSleeper)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Rc::new(ImmediateSleeper)
    }
}
