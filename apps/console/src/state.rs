use dioxus::prelude::*;

use crate::filters::{DashboardQuery, DashboardQueryPatch};
use crate::loader::LoadError;
use crate::models::{AuthenticatedUser, CompanySummary, DashboardOverview};

pub type AppSignal = Signal<AppState>;

/// Per-key load lifecycle. Transitions are driven by the dashboard hook:
/// `Idle → Loading → Ready | Failed`, and back to `Loading` on any
/// subsequent trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the view renders. Outside the `Loading` phase exactly one of
/// `data` / `error` is meaningful, matching the phase.
#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    pub phase: LoadPhase,
    pub data: Option<DashboardOverview>,
    pub error: Option<LoadError>,
    pub loaded_at_ms: Option<i64>,
}

impl DashboardState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub user: Option<AuthenticatedUser>,
    pub companies: Vec<CompanySummary>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub company_id: Option<String>,
    pub query: DashboardQuery,
    pub session: SessionState,
    pub dashboard: DashboardState,
}

#[derive(Clone)]
pub struct AppActions {
    state: AppSignal,
}

impl AppActions {
    pub fn set_company(&self, company_id: Option<String>) {
        let mut signal = self.state;
        let mut state = signal.write();
        state.company_id = company_id;
        // a switch never shows the previous company's numbers
        state.dashboard.clear();
    }

    pub fn set_user(&self, user: Option<AuthenticatedUser>) {
        let mut signal = self.state;
        signal.write().session.user = user;
    }

    pub fn set_companies(&self, companies: Vec<CompanySummary>) {
        let mut signal = self.state;
        let mut state = signal.write();
        state.session.companies = companies;
        state.session.is_loading = false;
        state.session.error = None;
    }

    pub fn set_session_loading(&self, loading: bool) {
        let mut signal = self.state;
        signal.write().session.is_loading = loading;
    }

    pub fn set_session_error(&self, message: Option<String>) {
        let mut signal = self.state;
        let mut state = signal.write();
        state.session.error = message;
        state.session.is_loading = false;
    }

    /// Merge a partial filter update and return the resulting query. The
    /// caller decides whether the result is complete enough to fetch.
    pub fn apply_filters(&self, patch: &DashboardQueryPatch) -> DashboardQuery {
        let mut signal = self.state;
        let mut state = signal.write();
        let next = patch.apply_to(&state.query);
        state.query = next.clone();
        next
    }

    pub fn dashboard_loading(&self) {
        let mut signal = self.state;
        signal.write().dashboard.phase = LoadPhase::Loading;
    }

    pub fn dashboard_ready(&self, data: DashboardOverview, loaded_at_ms: i64) {
        let mut signal = self.state;
        let mut state = signal.write();
        state.dashboard.phase = LoadPhase::Ready;
        state.dashboard.data = Some(data);
        state.dashboard.error = None;
        state.dashboard.loaded_at_ms = Some(loaded_at_ms);
    }

    pub fn dashboard_failed(&self, error: LoadError) {
        let mut signal = self.state;
        let mut state = signal.write();
        state.dashboard.phase = LoadPhase::Failed;
        state.dashboard.data = None;
        state.dashboard.error = Some(error);
    }
}

pub fn use_app_state() -> AppSignal {
    use_context::<AppSignal>()
}

pub fn use_app_actions() -> AppActions {
    let state = use_app_state();
    AppActions { state }
}
