//! Company (tenant) resolution. After login the active company is picked
//! asynchronously and persisted by the selection flow; a dashboard fetch
//! requested before that lands must wait for it rather than fail. The
//! resolver polls the persisted slot under a bounded deadline and falls
//! back to the company embedded in the user profile.

use std::rc::Rc;

use crate::models::AuthenticatedUser;
use crate::platform::{Clock, Sleeper};
use crate::storage::KeyValueStore;

pub const COMPANY_KEY: &str = "atrio.company";
pub const RESOLVE_BUDGET_MS: i64 = 3_000;
pub const RESOLVE_POLL_MS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompanySource {
    Persisted,
    UserProfile,
    Unresolved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanyContext {
    pub company_id: Option<String>,
    pub source: CompanySource,
}

impl CompanyContext {
    pub fn is_resolved(&self) -> bool {
        self.company_id.is_some()
    }
}

pub struct CompanyResolver {
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    sleeper: Rc<dyn Sleeper>,
}

impl CompanyResolver {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        sleeper: Rc<dyn Sleeper>,
    ) -> Self {
        Self {
            store,
            clock,
            sleeper,
        }
    }

    pub async fn resolve(&self, user: Option<&AuthenticatedUser>) -> CompanyContext {
        self.resolve_within(RESOLVE_BUDGET_MS, RESOLVE_POLL_MS, user)
            .await
    }

    /// Polls the persisted company id until `max_wait_ms` elapses. Reads
    /// only; the single failure mode is timing out into `Unresolved`.
    pub async fn resolve_within(
        &self,
        max_wait_ms: i64,
        poll_ms: u32,
        user: Option<&AuthenticatedUser>,
    ) -> CompanyContext {
        let deadline = self.clock.now_ms() + max_wait_ms;
        loop {
            if let Some(company_id) = self.persisted() {
                return CompanyContext {
                    company_id: Some(company_id),
                    source: CompanySource::Persisted,
                };
            }
            if self.clock.now_ms() >= deadline {
                break;
            }
            self.sleeper.sleep(poll_ms).await;
        }

        if let Some(company_id) = user
            .and_then(|user| user.company_id.clone())
            .filter(|id| !id.is_empty())
        {
            tracing::debug!("company resolution fell back to the user profile");
            return CompanyContext {
                company_id: Some(company_id),
                source: CompanySource::UserProfile,
            };
        }

        tracing::debug!("company resolution exhausted its {max_wait_ms}ms budget");
        CompanyContext {
            company_id: None,
            source: CompanySource::Unresolved,
        }
    }

    pub fn persist(&self, company_id: &str) {
        self.store.set(COMPANY_KEY, company_id);
    }

    pub fn clear(&self) {
        self.store.remove(COMPANY_KEY);
    }

    pub fn persisted(&self) -> Option<String> {
        self.store.get(COMPANY_KEY).filter(|id| !id.is_empty())
    }
}
