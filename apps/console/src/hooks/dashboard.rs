//! Dashboard hooks: `use_dashboard` drives loads on mount and on every
//! company/filter change, `use_refresh_scheduler` keeps the view fresh on
//! a timer, on tab focus, and on company-changed broadcasts.

use std::rc::Rc;

use dioxus::prelude::*;

use crate::filters::{DashboardQuery, DashboardQueryPatch};
use crate::hooks::DashboardService;
use crate::scheduler::{broadcast_company_changed, RefreshReason, RefreshScheduler};
use crate::state::{use_app_actions, use_app_state, AppActions, AppSignal};

#[derive(Clone)]
pub struct DashboardHandle {
    actions: AppActions,
    state: AppSignal,
    service: DashboardService,
}

impl DashboardHandle {
    /// Merge a filter update; the reactive load in `use_dashboard` picks
    /// up the changed query on the next render.
    pub fn set_filters(&self, patch: DashboardQueryPatch) {
        self.actions.apply_filters(&patch);
    }

    /// Debounced variant for free-typing inputs such as the custom date
    /// bounds. Scheduling under the same key supersedes the pending edit.
    pub fn set_filters_debounced(&self, key: &str, delay_ms: u32, patch: DashboardQueryPatch) {
        let actions = self.actions.clone();
        self.service.debouncer.schedule(key, delay_ms, move || {
            actions.apply_filters(&patch);
        });
    }

    /// Manual refresh: lift the no-company guard, drop the company's
    /// cached entries, and load again.
    pub fn refresh(&self) {
        self.service.loader.reset_company_guard();
        let snapshot = self.state.read();
        let company_id = snapshot.company_id.clone();
        let query = snapshot.query.clone();
        drop(snapshot);
        if let Some(company_id) = company_id.as_deref() {
            self.service.loader.invalidate_company(company_id);
        }
        spawn_load(self.service.clone(), self.actions.clone(), self.state, query);
    }

    pub fn select_company(&self, company_id: &str) {
        self.service.loader.select_company(company_id);
        self.actions.set_company(Some(company_id.to_string()));
        broadcast_company_changed();
    }
}

pub fn use_dashboard() -> DashboardHandle {
    let actions = use_app_actions();
    let state = use_app_state();
    let service = use_context::<DashboardService>();

    let snapshot = state.read();
    let company_id = snapshot.company_id.clone();
    let query = snapshot.query.clone();
    drop(snapshot);

    let future_service = service.clone();
    let future_actions = actions.clone();
    use_future(use_reactive!(|(company_id, query)| {
        let service = future_service.clone();
        let actions = future_actions.clone();
        async move {
            // company switches re-trigger the load; the loader re-reads
            // the persisted id itself
            let _ = company_id;
            run_load(service, actions, state, query).await;
        }
    }));

    // pending debounced filter edits must not fire into an unmounted view
    let drop_service = service.clone();
    use_drop(move || drop_service.debouncer.cancel_all());

    DashboardHandle {
        actions,
        state,
        service,
    }
}

pub fn use_refresh_scheduler() {
    let actions = use_app_actions();
    let state = use_app_state();
    let service = use_context::<DashboardService>();

    let scheduler = use_hook(|| Rc::new(RefreshScheduler::new()));

    {
        let scheduler = Rc::clone(&scheduler);
        use_hook(move || {
            let refresh_service = service.clone();
            let age_service = service.clone();
            scheduler.start(
                move |reason| {
                    let service = refresh_service.clone();
                    let actions = actions.clone();
                    let snapshot = state.read();
                    let company_id = snapshot.company_id.clone();
                    let query = snapshot.query.clone();
                    drop(snapshot);

                    if reason == RefreshReason::CompanyChanged {
                        service.loader.reset_company_guard();
                        if let Some(company_id) = company_id.as_deref() {
                            service.loader.invalidate_company(company_id);
                        }
                    }
                    tracing::debug!("scheduled dashboard refresh ({reason:?})");
                    spawn_load(service, actions, state, query);
                },
                move || {
                    let snapshot = state.read();
                    let company_id = snapshot.company_id.clone()?;
                    let query = snapshot.query.clone();
                    drop(snapshot);
                    age_service.loader.cache_age_ms(&company_id, &query)
                },
            );
        });
    }

    use_drop(move || scheduler.stop());
}

async fn run_load(
    service: DashboardService,
    actions: AppActions,
    state: AppSignal,
    query: DashboardQuery,
) {
    if !query.is_complete() {
        // a custom range with one bound missing; wait for the second date
        return;
    }

    actions.dashboard_loading();
    let user = state.read().session.user.clone();
    match service.loader.load(user.as_ref(), &query).await {
        Ok(outcome) => {
            // a superseded outcome carries no payload; a newer load owns
            // the view and nothing is surfaced here
            if let Some(payload) = outcome.payload() {
                actions.dashboard_ready((*payload).clone(), service.clock.now_ms());
            }
        }
        Err(err) => {
            actions.dashboard_failed(err);
        }
    }
}

#[allow(unused_variables)]
fn spawn_load(
    service: DashboardService,
    actions: AppActions,
    state: AppSignal,
    query: DashboardQuery,
) {
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(async move {
        run_load(service, actions, state, query).await;
    });
}
