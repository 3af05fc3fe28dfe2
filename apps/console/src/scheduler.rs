//! Timed and event-driven refresh. A 5-minute interval reloads the
//! dashboard unconditionally; regaining tab focus reloads only when the
//! active cache entry has gone stale; a company-changed broadcast forces
//! an immediate reload. All wiring is torn down by `stop()`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub const REFRESH_INTERVAL_MS: i64 = 5 * 60 * 1000;
pub const FOCUS_STALE_MS: i64 = 2 * 60 * 1000;
pub const COMPANY_CHANGED_EVENT: &str = "atrio:company-changed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    Interval,
    Focus,
    CompanyChanged,
}

/// Focus only triggers a reload once the entry is older than the stale
/// threshold; a missing entry always counts as stale.
pub fn should_refresh_on_focus(entry_age_ms: Option<i64>) -> bool {
    entry_age_ms.map_or(true, |age| age > FOCUS_STALE_MS)
}

pub struct RefreshScheduler {
    cancelled: Rc<Cell<bool>>,
    #[cfg(target_arch = "wasm32")]
    listeners: RefCell<
        Vec<(
            &'static str,
            wasm_bindgen::closure::Closure<dyn FnMut(web_sys::Event)>,
        )>,
    >,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
            #[cfg(target_arch = "wasm32")]
            listeners: RefCell::new(Vec::new()),
        }
    }

    #[allow(unused_variables)]
    pub fn start(
        &self,
        on_refresh: impl Fn(RefreshReason) + 'static,
        entry_age_ms: impl Fn() -> Option<i64> + 'static,
    ) {
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::closure::Closure;
            use wasm_bindgen::JsCast;

            let on_refresh: Rc<dyn Fn(RefreshReason)> = Rc::new(on_refresh);

            {
                let cancelled = Rc::clone(&self.cancelled);
                let on_refresh = Rc::clone(&on_refresh);
                wasm_bindgen_futures::spawn_local(async move {
                    loop {
                        gloo_timers::future::TimeoutFuture::new(REFRESH_INTERVAL_MS as u32).await;
                        if cancelled.get() {
                            break;
                        }
                        on_refresh(RefreshReason::Interval);
                    }
                });
            }

            let Some(window) = web_sys::window() else {
                tracing::warn!("refresh scheduler has no window to attach to");
                return;
            };

            let focus = {
                let cancelled = Rc::clone(&self.cancelled);
                let on_refresh = Rc::clone(&on_refresh);
                Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    if cancelled.get() {
                        return;
                    }
                    let age = entry_age_ms();
                    if should_refresh_on_focus(age) {
                        on_refresh(RefreshReason::Focus);
                    } else {
                        tracing::debug!("focus regained but cache is fresh, skipping reload");
                    }
                }) as Box<dyn FnMut(web_sys::Event)>)
            };

            let company_changed = {
                let cancelled = Rc::clone(&self.cancelled);
                let on_refresh = Rc::clone(&on_refresh);
                Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    if !cancelled.get() {
                        on_refresh(RefreshReason::CompanyChanged);
                    }
                }) as Box<dyn FnMut(web_sys::Event)>)
            };

            for (name, closure) in [
                ("focus", focus),
                (COMPANY_CHANGED_EVENT, company_changed),
            ] {
                if window
                    .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
                    .is_err()
                {
                    tracing::warn!("failed to attach {name} listener");
                }
                self.listeners.borrow_mut().push((name, closure));
            }
        }
    }

    pub fn stop(&self) {
        self.cancelled.set(true);
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            if let Some(window) = web_sys::window() {
                for (name, closure) in self.listeners.borrow_mut().drain(..) {
                    let _ = window
                        .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
                }
            }
        }
    }
}

/// Notify every open listener that the active company changed.
pub fn broadcast_company_changed() {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            if let Ok(event) = web_sys::Event::new(COMPANY_CHANGED_EVENT) {
                let _ = window.dispatch_event(&event);
            }
        }
    }
}

/// Debounced invocation keyed by name. Scheduling under a key supersedes
/// the pending call for that key; `cancel_all` guarantees nothing fires
/// after unmount. Timer lifetimes are owned here, not by ad hoc closures.
#[derive(Clone, Default)]
pub struct Debouncer {
    generations: Rc<RefCell<HashMap<String, u64>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(unused_variables)]
    pub fn schedule(&self, key: &str, delay_ms: u32, callback: impl FnOnce() + 'static) {
        let token = self.bump(key);
        #[cfg(target_arch = "wasm32")]
        {
            let generations = Rc::clone(&self.generations);
            let key = key.to_string();
            wasm_bindgen_futures::spawn_local(async move {
                gloo_timers::future::TimeoutFuture::new(delay_ms).await;
                if generations.borrow().get(&key).copied() == Some(token) {
                    callback();
                }
            });
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            // no timer to park on outside the browser; fire synchronously
            if self.is_current(key, token) {
                callback();
            }
        }
    }

    /// Invalidate the pending call for `key` and return the new token.
    pub fn bump(&self, key: &str) -> u64 {
        let mut generations = self.generations.borrow_mut();
        let token = generations.get(key).copied().unwrap_or(0) + 1;
        generations.insert(key.to_string(), token);
        token
    }

    pub fn is_current(&self, key: &str, token: u64) -> bool {
        self.generations.borrow().get(key).copied() == Some(token)
    }

    pub fn cancel_all(&self) {
        self.generations.borrow_mut().clear();
    }
}
