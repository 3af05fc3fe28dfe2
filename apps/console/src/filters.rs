//! Dashboard filter state. The query struct here is the single source of
//! the fingerprint the cache and retry gate key on: two queries hit the
//! same cache entry iff their fingerprints are byte-identical.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7d")]
    Last7Days,
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "1y")]
    LastYear,
    #[serde(rename = "custom")]
    Custom,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
            Self::LastYear => "1y",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "7d" => Some(Self::Last7Days),
            "30d" => Some(Self::Last30Days),
            "90d" => Some(Self::Last90Days),
            "1y" => Some(Self::LastYear),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareWith {
    PreviousPeriod,
    PreviousYear,
}

impl CompareWith {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreviousPeriod => "previous_period",
            Self::PreviousYear => "previous_year",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "previous_period" => Some(Self::PreviousPeriod),
            "previous_year" => Some(Self::PreviousYear),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    All,
    Sales,
    Revenue,
    Leads,
    Conversions,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Sales => "sales",
            Self::Revenue => "revenue",
            Self::Leads => "leads",
            Self::Conversions => "conversions",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "sales" => Some(Self::Sales),
            "revenue" => Some(Self::Revenue),
            "leads" => Some(Self::Leads),
            "conversions" => Some(Self::Conversions),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub date_range: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_with: Option<CompareWith>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_member: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl DashboardQuery {
    /// Canonical serialization of the filter set. Field order is fixed, so
    /// equal queries always produce identical bytes.
    pub fn fingerprint(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(7);
        parts.push(self.date_range.as_str().to_string());
        parts.push(
            self.compare_with
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
        );
        parts.push(self.team_member.clone().unwrap_or_default());
        parts.push(
            self.metric
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        );
        parts.push(self.company_ids.join(","));
        parts.push(self.start_date.clone().unwrap_or_default());
        parts.push(self.end_date.clone().unwrap_or_default());
        parts.join("|")
    }

    /// A custom range is only fetchable once both bounds are present;
    /// other ranges always are.
    pub fn is_complete(&self) -> bool {
        self.date_range != DateRange::Custom
            || (self.start_date.is_some() && self.end_date.is_some())
    }

    /// Query-string pairs for `GET /dashboard/overview`. Built by hand
    /// because `companyIds` repeats per value.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("dateRange", self.date_range.as_str().to_string())];
        if let Some(compare) = self.compare_with {
            pairs.push(("compareWith", compare.as_str().to_string()));
        }
        if let Some(member) = &self.team_member {
            pairs.push(("teamMember", member.clone()));
        }
        if let Some(metric) = self.metric {
            pairs.push(("metric", metric.as_str().to_string()));
        }
        for company in &self.company_ids {
            pairs.push(("companyIds", company.clone()));
        }
        if let Some(start) = &self.start_date {
            pairs.push(("startDate", start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("endDate", end.clone()));
        }
        pairs
    }
}

/// Partial filter update merged into the current query by the UI layer.
/// `Some(…)` replaces the field, `None` leaves it untouched; the two
/// `clear_*` flags exist so optional filters can be removed explicitly.
#[derive(Clone, Debug, Default)]
pub struct DashboardQueryPatch {
    pub date_range: Option<DateRange>,
    pub compare_with: Option<Option<CompareWith>>,
    pub team_member: Option<Option<String>>,
    pub metric: Option<Metric>,
    pub company_ids: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DashboardQueryPatch {
    pub fn apply_to(&self, current: &DashboardQuery) -> DashboardQuery {
        let mut next = current.clone();
        if let Some(range) = self.date_range {
            next.date_range = range;
        }
        if let Some(compare) = &self.compare_with {
            next.compare_with = *compare;
        }
        if let Some(member) = &self.team_member {
            next.team_member = member.clone();
        }
        if let Some(metric) = self.metric {
            next.metric = Some(metric);
        }
        if let Some(companies) = &self.company_ids {
            next.company_ids = companies.clone();
        }
        if let Some(start) = &self.start_date {
            next.start_date = Some(start.clone());
        }
        if let Some(end) = &self.end_date {
            next.end_date = Some(end.clone());
        }
        // Explicit dates only make sense for a custom range.
        if next.date_range != DateRange::Custom {
            next.start_date = None;
            next.end_date = None;
        }
        next
    }
}
