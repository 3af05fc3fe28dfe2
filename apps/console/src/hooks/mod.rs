pub mod companies;
pub mod dashboard;

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use reqwest::StatusCode;

use crate::api::ClientError;
use crate::filters::DashboardQuery;
use crate::loader::{OverviewLoader, OverviewTransport, SharedLoader};
use crate::models::DashboardOverview;
use crate::platform::{default_clock, default_sleeper, Clock};
use crate::scheduler::Debouncer;
use crate::storage::default_store;
use crate::API_CLIENT;

/// Everything the dashboard hooks share: the fetch orchestrator, the
/// clock it keeps freshness against, and the debouncer owning filter
/// timers. Provided once from the app root via context.
#[derive(Clone)]
pub struct DashboardService {
    pub loader: SharedLoader,
    pub clock: Rc<dyn Clock>,
    pub debouncer: Debouncer,
}

impl DashboardService {
    pub fn from_environment() -> Self {
        let clock = default_clock();
        let transport: Rc<dyn OverviewTransport> = match API_CLIENT.get() {
            Some(client) => Rc::new(client.clone()),
            None => Rc::new(UnconfiguredTransport),
        };
        let loader = Rc::new(OverviewLoader::new(
            default_store(),
            Rc::clone(&clock),
            default_sleeper(),
            transport,
        ));
        Self {
            loader,
            clock,
            debouncer: Debouncer::new(),
        }
    }
}

/// Stands in when bootstrap could not build the HTTP client; every fetch
/// degrades to a retryable error instead of panicking somewhere deep.
struct UnconfiguredTransport;

impl OverviewTransport for UnconfiguredTransport {
    fn fetch_overview(
        &self,
        _company_id: &str,
        _query: &DashboardQuery,
    ) -> LocalBoxFuture<'static, Result<DashboardOverview, ClientError>> {
        Box::pin(futures::future::ready(Err(ClientError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: None,
            message: "API client is not initialized".into(),
        })))
    }
}
