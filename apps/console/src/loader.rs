//! Dashboard fetch orchestration: company resolution, cache lookup,
//! retry gating, the network call, and the single-flight guard that keeps
//! concurrent triggers (mount, filter change, timer, focus) from issuing
//! duplicate requests for the same key.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::api::{ClientError, ConsoleClient};
use crate::cache::OverviewCache;
use crate::filters::DashboardQuery;
use crate::models::{AuthenticatedUser, DashboardOverview};
use crate::platform::{Clock, Sleeper};
use crate::retry::{classify, ErrorClass, RetryGate};
use crate::storage::KeyValueStore;
use crate::tenant::CompanyResolver;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoadError {
    /// The company id could not be resolved inside the wait budget. Local
    /// condition; no request was made.
    #[error("no company is available for this account yet")]
    CompanyUnavailable,
    /// 404/403: retrying cannot succeed.
    #[error("{message}")]
    Terminal { status: u16, message: String },
    /// Network failure, timeout, or server error; may succeed later.
    #[error("{message}")]
    Transient { message: String },
    /// Attempt budget burned inside the current window. Local condition.
    #[error("too many failed attempts, please retry in a minute")]
    RateLimited,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// Fetched from the network and written to the cache.
    Fresh(Rc<DashboardOverview>),
    /// Served from a cache entry younger than the TTL.
    Cached(Rc<DashboardOverview>),
    /// The active key changed while the request was in flight; the
    /// response was dropped without touching cache or UI.
    Superseded,
}

impl LoadOutcome {
    pub fn payload(&self) -> Option<Rc<DashboardOverview>> {
        match self {
            Self::Fresh(payload) | Self::Cached(payload) => Some(Rc::clone(payload)),
            Self::Superseded => None,
        }
    }
}

type SharedResult = Result<Rc<DashboardOverview>, LoadError>;

/// Seam over the HTTP call so the orchestrator can be exercised without a
/// browser or a backend.
pub trait OverviewTransport {
    fn fetch_overview(
        &self,
        company_id: &str,
        query: &DashboardQuery,
    ) -> LocalBoxFuture<'static, Result<DashboardOverview, ClientError>>;
}

impl OverviewTransport for ConsoleClient {
    fn fetch_overview(
        &self,
        company_id: &str,
        query: &DashboardQuery,
    ) -> LocalBoxFuture<'static, Result<DashboardOverview, ClientError>> {
        let client = self.clone();
        let company_id = company_id.to_string();
        let query = query.clone();
        Box::pin(async move { client.get_dashboard_overview(&company_id, &query).await })
    }
}

pub type SharedLoader = Rc<OverviewLoader>;

pub struct OverviewLoader {
    resolver: CompanyResolver,
    cache: OverviewCache,
    retry: RetryGate,
    transport: Rc<dyn OverviewTransport>,
    inflight: RefCell<HashMap<String, Vec<oneshot::Sender<SharedResult>>>>,
    current_key: RefCell<Option<String>>,
    company_missing: Cell<bool>,
}

impl OverviewLoader {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        sleeper: Rc<dyn Sleeper>,
        transport: Rc<dyn OverviewTransport>,
    ) -> Self {
        let resolver = CompanyResolver::new(Rc::clone(&store), Rc::clone(&clock), sleeper);
        let cache = OverviewCache::new(store, Rc::clone(&clock));
        let retry = RetryGate::new(clock);
        Self {
            resolver,
            cache,
            retry,
            transport,
            inflight: RefCell::new(HashMap::new()),
            current_key: RefCell::new(None),
            company_missing: Cell::new(false),
        }
    }

    /// One load attempt. Every external trigger (mount, filter change,
    /// timer, focus, manual refresh) maps to exactly one call; the loader
    /// never loops on its own.
    pub async fn load(
        &self,
        user: Option<&AuthenticatedUser>,
        query: &DashboardQuery,
    ) -> Result<LoadOutcome, LoadError> {
        if self.company_missing.get() {
            return Err(LoadError::CompanyUnavailable);
        }

        let context = self.resolver.resolve(user).await;
        let Some(company_id) = context.company_id else {
            // remember the miss so scheduled refreshes stop re-running the
            // resolver poll; only a manual reset or a company-changed
            // event clears this
            self.company_missing.set(true);
            tracing::warn!("dashboard load skipped: company not yet available");
            return Err(LoadError::CompanyUnavailable);
        };

        let key = format!("{company_id}.{}", query.fingerprint());
        self.current_key.replace(Some(key.clone()));

        if let Some(entry) = self.cache.get(&company_id, query) {
            tracing::debug!("dashboard overview served from cache for {company_id}");
            return Ok(LoadOutcome::Cached(Rc::new(entry.data)));
        }

        if !self.retry.can_attempt(&key) {
            return Err(LoadError::RateLimited);
        }

        // single-flight: piggyback on an identical request already in
        // flight instead of issuing a duplicate
        {
            let mut inflight = self.inflight.borrow_mut();
            if let Some(waiters) = inflight.get_mut(&key) {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                drop(inflight);
                return match receiver.await {
                    Ok(Ok(payload)) => {
                        if self.is_current(&key) {
                            Ok(LoadOutcome::Fresh(payload))
                        } else {
                            Ok(LoadOutcome::Superseded)
                        }
                    }
                    Ok(Err(err)) => Err(err),
                    Err(_) => Ok(LoadOutcome::Superseded),
                };
            }
            inflight.insert(key.clone(), Vec::new());
        }

        let result = self.transport.fetch_overview(&company_id, query).await;

        let shared: SharedResult = match result {
            Ok(payload) => {
                self.retry.record_success(&key);
                Ok(Rc::new(payload))
            }
            Err(err) => match classify(&err) {
                ErrorClass::Terminal => {
                    let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
                    tracing::warn!("dashboard fetch rejected with {status}, not retrying");
                    Err(LoadError::Terminal {
                        status,
                        message: terminal_message(status),
                    })
                }
                ErrorClass::Retryable => {
                    self.retry.record_failure(&key);
                    tracing::warn!("dashboard fetch failed: {err}");
                    Err(LoadError::Transient {
                        message: err.to_string(),
                    })
                }
            },
        };

        if let Some(waiters) = self.inflight.borrow_mut().remove(&key) {
            for waiter in waiters {
                let _ = waiter.send(shared.clone());
            }
        }

        match shared {
            Ok(payload) => {
                // the cache write is the last step, and only for the
                // still-current key: a superseded response must not
                // clobber a newer entry or reach the UI
                if self.is_current(&key) {
                    self.cache.put(&company_id, query, &payload);
                    Ok(LoadOutcome::Fresh(payload))
                } else {
                    tracing::debug!("discarding superseded dashboard response for {key}");
                    Ok(LoadOutcome::Superseded)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Persist a newly selected company. The switch clears that company's
    /// cache so the next load starts from fresh data, and lifts the
    /// no-company guard.
    pub fn select_company(&self, company_id: &str) {
        self.resolver.persist(company_id);
        self.company_missing.set(false);
        self.cache.invalidate_company(company_id);
    }

    pub fn reset_company_guard(&self) {
        self.company_missing.set(false);
    }

    pub fn persisted_company(&self) -> Option<String> {
        self.resolver.persisted()
    }

    pub fn company_guard_active(&self) -> bool {
        self.company_missing.get()
    }

    pub fn invalidate_company(&self, company_id: &str) {
        self.cache.invalidate_company(company_id);
    }

    pub fn cache_age_ms(&self, company_id: &str, query: &DashboardQuery) -> Option<i64> {
        self.cache.entry_age_ms(company_id, query)
    }

    fn is_current(&self, key: &str) -> bool {
        self.current_key.borrow().as_deref() == Some(key)
    }
}

fn terminal_message(status: u16) -> String {
    match status {
        404 => "dashboard analytics are not available for this company".into(),
        403 => "you do not have access to dashboard analytics".into(),
        other => format!("request rejected with status {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardStatistics;
    use crate::platform::testing::{FakeClock, TickingSleeper};
    use crate::storage::MemoryStore;
    use crate::tenant::COMPANY_KEY;
    use futures::executor::block_on;
    use reqwest::StatusCode;
    use std::collections::VecDeque;

    fn overview(revenue: f64) -> DashboardOverview {
        DashboardOverview {
            statistics: DashboardStatistics {
                total_revenue: revenue,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn transient_error() -> ClientError {
        ClientError::EmptyResponse(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn terminal_error() -> ClientError {
        ClientError::Api {
            status: StatusCode::NOT_FOUND,
            code: None,
            message: "missing".into(),
        }
    }

    /// Transport that counts calls, remembers the last query, and pops a
    /// scripted response per call (falling back to a default payload).
    struct ScriptedTransport {
        calls: Cell<u32>,
        last_query: RefCell<Option<DashboardQuery>>,
        responses: RefCell<VecDeque<Result<DashboardOverview, ClientError>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<DashboardOverview, ClientError>>) -> Rc<Self> {
            Rc::new(Self {
                calls: Cell::new(0),
                last_query: RefCell::new(None),
                responses: RefCell::new(responses.into()),
            })
        }
    }

    impl OverviewTransport for ScriptedTransport {
        fn fetch_overview(
            &self,
            _company_id: &str,
            query: &DashboardQuery,
        ) -> LocalBoxFuture<'static, Result<DashboardOverview, ClientError>> {
            self.calls.set(self.calls.get() + 1);
            self.last_query.replace(Some(query.clone()));
            let response = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(overview(0.0)));
            Box::pin(futures::future::ready(response))
        }
    }

    /// Transport whose responses are released by the test, to force real
    /// interleavings of concurrent loads.
    struct GatedTransport {
        calls: Cell<u32>,
        gates: RefCell<VecDeque<Option<oneshot::Receiver<Result<DashboardOverview, ClientError>>>>>,
    }

    impl GatedTransport {
        fn new(
            gates: Vec<Option<oneshot::Receiver<Result<DashboardOverview, ClientError>>>>,
        ) -> Rc<Self> {
            Rc::new(Self {
                calls: Cell::new(0),
                gates: RefCell::new(gates.into()),
            })
        }
    }

    impl OverviewTransport for GatedTransport {
        fn fetch_overview(
            &self,
            _company_id: &str,
            _query: &DashboardQuery,
        ) -> LocalBoxFuture<'static, Result<DashboardOverview, ClientError>> {
            self.calls.set(self.calls.get() + 1);
            let gate = self.gates.borrow_mut().pop_front().flatten();
            Box::pin(async move {
                match gate {
                    Some(receiver) => receiver.await.unwrap_or_else(|_| Err(transient_error())),
                    None => Ok(overview(0.0)),
                }
            })
        }
    }

    fn loader_for(
        transport: Rc<dyn OverviewTransport>,
    ) -> (OverviewLoader, FakeClock, MemoryStore) {
        let clock = FakeClock::at(0);
        let store = MemoryStore::new();
        store.set(COMPANY_KEY, "c1");
        let loader = OverviewLoader::new(
            Rc::new(store.clone()),
            Rc::new(clock.clone()),
            Rc::new(TickingSleeper::new(clock.clone())),
            transport,
        );
        (loader, clock, store)
    }

    #[test]
    fn identical_queries_within_ttl_hit_the_network_once() {
        let transport = ScriptedTransport::new(vec![Ok(overview(7.0))]);
        let (loader, clock, _) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        let first = block_on(loader.load(None, &query)).expect("first load");
        assert!(matches!(first, LoadOutcome::Fresh(_)));

        clock.advance(60_000);
        let second = block_on(loader.load(None, &query)).expect("second load");
        match second {
            LoadOutcome::Cached(payload) => assert_eq!(*payload, overview(7.0)),
            other => panic!("expected cache hit, got {other:?}"),
        }
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn changed_query_misses_and_refetches_with_new_parameters() {
        let transport = ScriptedTransport::new(vec![Ok(overview(1.0)), Ok(overview(2.0))]);
        let (loader, _, _) = loader_for(transport.clone());

        let thirty_days = DashboardQuery::default();
        block_on(loader.load(None, &thirty_days)).expect("first load");

        let custom = DashboardQuery {
            date_range: crate::filters::DateRange::Custom,
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-31".into()),
            ..Default::default()
        };
        let outcome = block_on(loader.load(None, &custom)).expect("second load");
        assert!(matches!(outcome, LoadOutcome::Fresh(_)));
        assert_eq!(transport.calls.get(), 2);
        assert_eq!(transport.last_query.borrow().as_ref(), Some(&custom));
    }

    #[test]
    fn fourth_transient_failure_is_rejected_locally() {
        let transport = ScriptedTransport::new(vec![
            Err(transient_error()),
            Err(transient_error()),
            Err(transient_error()),
            Err(transient_error()),
        ]);
        let (loader, _, _) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        for _ in 0..3 {
            let err = block_on(loader.load(None, &query)).expect_err("transient failure");
            assert!(matches!(err, LoadError::Transient { .. }));
        }
        assert_eq!(transport.calls.get(), 3);

        let err = block_on(loader.load(None, &query)).expect_err("rate limited");
        assert_eq!(err, LoadError::RateLimited);
        assert_eq!(transport.calls.get(), 3);
    }

    #[test]
    fn retry_budget_reopens_after_the_window() {
        let transport = ScriptedTransport::new(vec![
            Err(transient_error()),
            Err(transient_error()),
            Err(transient_error()),
            Ok(overview(5.0)),
        ]);
        let (loader, clock, _) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        for _ in 0..3 {
            let _ = block_on(loader.load(None, &query));
        }
        assert_eq!(
            block_on(loader.load(None, &query)),
            Err(LoadError::RateLimited)
        );

        clock.advance(crate::retry::ATTEMPT_WINDOW_MS);
        let outcome = block_on(loader.load(None, &query)).expect("window reopened");
        assert!(matches!(outcome, LoadOutcome::Fresh(_)));
        assert_eq!(transport.calls.get(), 4);
    }

    #[test]
    fn not_found_is_terminal_and_never_retried_within_the_call() {
        let transport = ScriptedTransport::new(vec![Err(terminal_error())]);
        let (loader, _, _) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        let err = block_on(loader.load(None, &query)).expect_err("terminal");
        assert!(matches!(err, LoadError::Terminal { status: 404, .. }));
        assert_eq!(transport.calls.get(), 1);

        // terminal failures do not consume retry budget; an explicit new
        // trigger attempts again
        let outcome = block_on(loader.load(None, &query)).expect("manual retry");
        assert!(matches!(outcome, LoadOutcome::Fresh(_)));
        assert_eq!(transport.calls.get(), 2);
    }

    #[test]
    fn unresolved_company_makes_no_network_call_and_arms_the_guard() {
        let transport = ScriptedTransport::new(Vec::new());
        let clock = FakeClock::at(0);
        let store = MemoryStore::new();
        let loader = OverviewLoader::new(
            Rc::new(store.clone()),
            Rc::new(clock.clone()),
            Rc::new(TickingSleeper::new(clock.clone())),
            transport.clone(),
        );
        let query = DashboardQuery::default();

        assert_eq!(
            block_on(loader.load(None, &query)),
            Err(LoadError::CompanyUnavailable)
        );
        assert_eq!(transport.calls.get(), 0);
        assert!(loader.company_guard_active());

        // the company shows up later, but the guard suppresses automatic
        // resolution until it is explicitly reset
        store.set(COMPANY_KEY, "c1");
        assert_eq!(
            block_on(loader.load(None, &query)),
            Err(LoadError::CompanyUnavailable)
        );
        assert_eq!(transport.calls.get(), 0);

        loader.reset_company_guard();
        let outcome = block_on(loader.load(None, &query)).expect("after reset");
        assert!(matches!(outcome, LoadOutcome::Fresh(_)));
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn switching_companies_never_reuses_the_other_entry() {
        let transport = ScriptedTransport::new(vec![Ok(overview(1.0)), Ok(overview(2.0))]);
        let (loader, _, store) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        block_on(loader.load(None, &query)).expect("first company");

        store.set(COMPANY_KEY, "c2");
        let outcome = block_on(loader.load(None, &query)).expect("second company");
        match outcome {
            LoadOutcome::Fresh(payload) => assert_eq!(*payload, overview(2.0)),
            other => panic!("expected a fresh fetch, got {other:?}"),
        }
        assert_eq!(transport.calls.get(), 2);
    }

    #[test]
    fn concurrent_loads_for_one_key_share_a_single_request() {
        let (release, gate) = oneshot::channel();
        let transport = GatedTransport::new(vec![Some(gate)]);
        let (loader, _, _) = loader_for(transport.clone());
        let query = DashboardQuery::default();

        let (first, second, _) = block_on(async {
            futures::join!(loader.load(None, &query), loader.load(None, &query), async {
                let _ = release.send(Ok(overview(3.0)));
            })
        });

        assert_eq!(transport.calls.get(), 1);
        let first = first.expect("leader");
        let second = second.expect("follower");
        assert_eq!(first.payload().as_deref(), Some(&overview(3.0)));
        assert_eq!(second.payload().as_deref(), Some(&overview(3.0)));
    }

    #[test]
    fn stale_response_is_discarded_after_a_query_change() {
        let (release, gate) = oneshot::channel();
        // first call (old query) blocks on the gate; second call (new
        // query) resolves immediately
        let transport = GatedTransport::new(vec![Some(gate), None]);
        let (loader, _, _) = loader_for(transport.clone());

        let old_query = DashboardQuery::default();
        let new_query = DashboardQuery {
            team_member: Some("ana".into()),
            ..Default::default()
        };

        let (old_outcome, new_outcome, _) = block_on(async {
            futures::join!(
                loader.load(None, &old_query),
                loader.load(None, &new_query),
                async {
                    let _ = release.send(Ok(overview(9.0)));
                }
            )
        });

        assert!(matches!(
            old_outcome.expect("old load"),
            LoadOutcome::Superseded
        ));
        assert!(matches!(
            new_outcome.expect("new load"),
            LoadOutcome::Fresh(_)
        ));
        // the stale response never reached the cache
        assert_eq!(loader.cache_age_ms("c1", &old_query), None);
        assert!(loader.cache_age_ms("c1", &new_query).is_some());
    }
}
