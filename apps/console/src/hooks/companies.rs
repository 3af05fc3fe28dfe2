//! Session bootstrap: load the signed-in user and the companies they can
//! act for, then settle the active company selection. The persisted
//! selection lands in the key-value store the resolver polls, which is
//! what lets a dashboard fetch requested during login eventually proceed.

use dioxus::prelude::*;

use crate::hooks::DashboardService;
use crate::state::{use_app_actions, use_app_state};
use crate::API_CLIENT;

pub fn use_company_loader() {
    let actions = use_app_actions();
    let state = use_app_state();
    let service = use_context::<DashboardService>();

    use_future(move || {
        let actions = actions.clone();
        let service = service.clone();
        async move {
            if !state.read().session.companies.is_empty() {
                return;
            }

            actions.set_session_loading(true);

            let Some(client) = API_CLIENT.get().cloned() else {
                actions.set_session_error(Some("API client is not initialized".into()));
                return;
            };

            match client.get_current_user().await {
                Ok(user) => actions.set_user(Some(user)),
                Err(err) => {
                    // the dashboard can still resolve a persisted company
                    // without the profile fallback
                    tracing::warn!("could not load the signed-in user: {err}");
                }
            }

            match client.get_companies().await {
                Ok(companies) => {
                    let persisted = service
                        .loader
                        .persisted_company()
                        .filter(|id| companies.iter().any(|company| &company.id == id));

                    if let Some(company_id) = persisted {
                        // adopt the earlier selection without touching its
                        // still-valid cache entries
                        actions.set_company(Some(company_id));
                    } else if let Some(first) = companies.first() {
                        service.loader.select_company(&first.id);
                        actions.set_company(Some(first.id.clone()));
                    }

                    actions.set_companies(companies);
                }
                Err(err) => {
                    tracing::error!("company list fetch failed: {err}");
                    actions.set_session_error(Some(format!("could not load companies: {err}")));
                }
            }
        }
    });
}
