#![allow(non_snake_case)]

mod api;
mod cache;
mod config;
mod filters;
mod hooks;
mod loader;
mod models;
mod platform;
mod retry;
mod scheduler;
mod state;
mod storage;
mod tenant;
mod ui;

use api::ConsoleClient;
use config::AppConfig;
use dioxus::prelude::*;
use dioxus_router::prelude::*;
use hooks::DashboardService;
use once_cell::sync::OnceCell;
use state::AppState;
use tracing::{error, info};
use ui::dashboard::DashboardPanel;

pub(crate) static APP_CONFIG: OnceCell<AppConfig> = OnceCell::new();
pub(crate) static API_CLIENT: OnceCell<ConsoleClient> = OnceCell::new();

fn main() {
    console_error_panic_hook::set_once();
    init_logging();
    bootstrap_infrastructure();
    launch(App);
}

fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = dioxus_logger::init(tracing::Level::INFO);
    });
}

fn bootstrap_infrastructure() {
    let config = AppConfig::from_env();
    let _ = APP_CONFIG.set(config.clone());

    match ConsoleClient::new(config) {
        Ok(client) => {
            let _ = API_CLIENT.set(client);
            info!("console API client initialized");
        }
        Err(err) => {
            error!(?err, "failed to initialize the console API client");
        }
    }
}

#[component]
fn App() -> Element {
    let app_state = use_signal(AppState::default);

    use_context_provider(|| app_state);
    use_context_provider(DashboardService::from_environment);

    rsx! {
        div { class: "relative",
            Router::<Route> {}
        }
    }
}

#[derive(Clone, Routable, Debug, PartialEq)]
enum Route {
    #[route("/")]
    Dashboard {},
}

#[component]
fn Dashboard() -> Element {
    let api_endpoint = APP_CONFIG
        .get()
        .map(|c| c.api_base_url.clone())
        .unwrap_or_else(|| "API endpoint not configured".to_string());

    rsx! {
        div { class: "app-shell space-y-4",
            section { class: "rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
                h1 { class: "text-xl font-semibold text-slate-900", "Atrio Console" }
                p { class: "text-sm text-slate-600", "Backend: {api_endpoint}" }
            }
            DashboardPanel {}
        }
    }
}
