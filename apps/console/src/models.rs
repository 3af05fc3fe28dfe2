use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregate payload of `GET /dashboard/overview`. Every section the
/// backend computes lands here; the row-style collections stay untyped
/// because the console only counts and forwards them to the widgets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardOverview {
    pub statistics: DashboardStatistics,
    pub charts: DashboardCharts,
    pub goals: DashboardGoals,
    pub performance: DashboardPerformance,
    pub top_performers: Vec<TopPerformer>,
    pub tasks: Vec<Value>,
    pub leads: Vec<Value>,
    pub activities: Vec<Value>,
    pub documents: Vec<Value>,
    pub appointments: Vec<Value>,
    pub lead_sources: Vec<LeadSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStatistics {
    pub properties_listed: u64,
    pub properties_sold: u64,
    pub active_leads: u64,
    pub total_revenue: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_growth_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leads_growth_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_rate_pct: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardCharts {
    pub sales_over_time: Vec<SeriesPoint>,
    pub property_types: Vec<DistributionSlice>,
    pub locations: Vec<DistributionSlice>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_value: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributionSlice {
    pub label: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_pct: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardGoals {
    pub monthly_sales_target: f64,
    pub monthly_sales_progress: f64,
    pub monthly_revenue_target: f64,
    pub monthly_revenue_progress: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardPerformance {
    pub team: Value,
    pub business: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopPerformer {
    pub id: String,
    pub name: String,
    pub sales: u64,
    pub revenue: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadSource {
    pub source: String,
    pub count: u64,
}

/// `GET /auth/me`. The embedded `company_id` is the resolver's fallback
/// when no company selection has been persisted yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticatedUser {
    pub id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
}
