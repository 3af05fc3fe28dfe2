//! Dashboard shell. Rendering stays deliberately thin: the widgets get
//! the surfaced load state and the filter bar feeds patches back through
//! the dashboard handle.

use dioxus::prelude::*;

use crate::filters::{CompareWith, DashboardQuery, DashboardQueryPatch, DateRange, Metric};
use crate::hooks::companies::use_company_loader;
use crate::hooks::dashboard::{use_dashboard, use_refresh_scheduler, DashboardHandle};
use crate::models::CompanySummary;
use crate::state::{use_app_state, LoadPhase};

#[component]
pub fn DashboardPanel() -> Element {
    use_company_loader();
    let handle = use_dashboard();
    use_refresh_scheduler();

    let state = use_app_state();
    let snapshot = state.read();
    let session = snapshot.session.clone();
    let company_id = snapshot.company_id.clone();
    let query = snapshot.query.clone();
    let dashboard = snapshot.dashboard.clone();
    drop(snapshot);

    let body = match dashboard.phase {
        LoadPhase::Idle | LoadPhase::Loading => rsx! {
            p { class: "text-sm text-slate-500", "Loading dashboard…" }
        },
        LoadPhase::Failed => {
            let message = dashboard
                .error
                .as_ref()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "something went wrong".into());
            let retry_handle = handle.clone();
            rsx! {
                div { class: "rounded-lg border border-red-200 bg-red-50 p-4 space-y-2",
                    p { class: "text-sm text-red-700", "{message}" }
                    button {
                        class: "rounded bg-red-600 px-3 py-1 text-xs font-semibold text-white",
                        onclick: move |_| retry_handle.refresh(),
                        "Try again"
                    }
                }
            }
        }
        LoadPhase::Ready => {
            let overview = dashboard.data.clone().unwrap_or_default();
            let stats = overview.statistics.clone();
            let revenue = format!("R$ {:.2}", stats.total_revenue);
            let generated_at = overview.generated_at.clone().unwrap_or_default();
            rsx! {
                div { class: "space-y-4",
                    div { class: "grid gap-3 md:grid-cols-4",
                        {stat_tile("Listed properties", stats.properties_listed.to_string(), None)}
                        {stat_tile("Properties sold", stats.properties_sold.to_string(), stats.sales_growth_pct)}
                        {stat_tile("Active leads", stats.active_leads.to_string(), stats.leads_growth_pct)}
                        {stat_tile("Revenue", revenue, stats.revenue_growth_pct)}
                    }
                    div { class: "grid gap-3 md:grid-cols-3 text-xs text-slate-600",
                        {section_count("Tasks", overview.tasks.len())}
                        {section_count("Leads", overview.leads.len())}
                        {section_count("Activities", overview.activities.len())}
                        {section_count("Documents", overview.documents.len())}
                        {section_count("Appointments", overview.appointments.len())}
                        {section_count("Top performers", overview.top_performers.len())}
                    }
                    if !generated_at.is_empty() {
                        p { class: "text-[11px] text-slate-400", "Generated at {generated_at}" }
                    }
                }
            }
        }
    };

    let session_note = match (&session.error, session.is_loading) {
        (Some(err), _) => rsx! {
            p { class: "text-xs text-red-500", "{err}" }
        },
        (None, true) => rsx! {
            p { class: "text-xs text-slate-500", "Loading companies…" }
        },
        (None, false) => rsx! {},
    };

    rsx! {
        section { class: "space-y-4",
            div { class: "flex flex-wrap items-center gap-3",
                {company_selector(&session.companies, company_id.clone(), handle.clone())}
                {filter_bar(&query, handle.clone())}
            }
            {session_note}
            {body}
        }
    }
}

fn company_selector(
    companies: &[CompanySummary],
    active: Option<String>,
    handle: DashboardHandle,
) -> Element {
    let active = active.unwrap_or_default();
    rsx! {
        select {
            class: "rounded border border-slate-300 px-2 py-1 text-sm",
            onchange: move |evt| {
                let value = evt.value();
                if !value.is_empty() {
                    handle.select_company(&value);
                }
            },
            for company in companies.iter() {
                option {
                    value: "{company.id}",
                    selected: company.id == active,
                    "{company.name}"
                }
            }
        }
    }
}

fn filter_bar(query: &DashboardQuery, handle: DashboardHandle) -> Element {
    let range_handle = handle.clone();
    let compare_handle = handle.clone();
    let metric_handle = handle.clone();
    let start_handle = handle.clone();
    let end_handle = handle;

    let active_range = query.date_range;
    let active_compare = query.compare_with;
    let active_metric = query.metric;
    let is_custom = query.date_range == DateRange::Custom;
    let start_value = query.start_date.clone().unwrap_or_default();
    let end_value = query.end_date.clone().unwrap_or_default();

    rsx! {
        div { class: "flex flex-wrap items-center gap-2 text-sm",
            select {
                class: "rounded border border-slate-300 px-2 py-1",
                onchange: move |evt| {
                    if let Some(range) = DateRange::parse(&evt.value()) {
                        range_handle.set_filters(DashboardQueryPatch {
                            date_range: Some(range),
                            ..Default::default()
                        });
                    }
                },
                for range in [
                    DateRange::Today,
                    DateRange::Last7Days,
                    DateRange::Last30Days,
                    DateRange::Last90Days,
                    DateRange::LastYear,
                    DateRange::Custom,
                ] {
                    option {
                        value: range.as_str(),
                        selected: range == active_range,
                        {range.as_str()}
                    }
                }
            }
            select {
                class: "rounded border border-slate-300 px-2 py-1",
                onchange: move |evt| {
                    compare_handle.set_filters(DashboardQueryPatch {
                        compare_with: Some(CompareWith::parse(&evt.value())),
                        ..Default::default()
                    });
                },
                option { value: "", selected: active_compare.is_none(), "no comparison" }
                option {
                    value: "previous_period",
                    selected: active_compare == Some(CompareWith::PreviousPeriod),
                    "previous period"
                }
                option {
                    value: "previous_year",
                    selected: active_compare == Some(CompareWith::PreviousYear),
                    "previous year"
                }
            }
            select {
                class: "rounded border border-slate-300 px-2 py-1",
                onchange: move |evt| {
                    if let Some(metric) = Metric::parse(&evt.value()) {
                        metric_handle.set_filters(DashboardQueryPatch {
                            metric: Some(metric),
                            ..Default::default()
                        });
                    }
                },
                for metric in [
                    Metric::All,
                    Metric::Sales,
                    Metric::Revenue,
                    Metric::Leads,
                    Metric::Conversions,
                ] {
                    option {
                        value: metric.as_str(),
                        selected: Some(metric) == active_metric
                            || (active_metric.is_none() && metric == Metric::All),
                        {metric.as_str()}
                    }
                }
            }
            if is_custom {
                input {
                    class: "rounded border border-slate-300 px-2 py-1",
                    r#type: "date",
                    value: "{start_value}",
                    oninput: move |evt| {
                        start_handle.set_filters_debounced(
                            "start-date",
                            300,
                            DashboardQueryPatch {
                                start_date: Some(evt.value()),
                                ..Default::default()
                            },
                        );
                    },
                }
                input {
                    class: "rounded border border-slate-300 px-2 py-1",
                    r#type: "date",
                    value: "{end_value}",
                    oninput: move |evt| {
                        end_handle.set_filters_debounced(
                            "end-date",
                            300,
                            DashboardQueryPatch {
                                end_date: Some(evt.value()),
                                ..Default::default()
                            },
                        );
                    },
                }
            }
        }
    }
}

fn stat_tile(label: &str, value: String, growth_pct: Option<f64>) -> Element {
    let growth = growth_pct
        .map(|pct| format!("{pct:+.1}%"))
        .unwrap_or_default();
    rsx! {
        div { class: "rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
            p { class: "text-xs text-slate-500", "{label}" }
            p { class: "text-xl font-semibold text-slate-900", "{value}" }
            if !growth.is_empty() {
                p { class: "text-[11px] text-slate-500", "{growth}" }
            }
        }
    }
}

fn section_count(label: &str, count: usize) -> Element {
    rsx! {
        div { class: "rounded border border-slate-200 bg-white p-3",
            span { class: "font-medium text-slate-700", "{label}: " }
            span { "{count}" }
        }
    }
}
