//! TTL-bounded overview cache. Entries are keyed by company id plus the
//! filter fingerprint and live in the injected key-value store, so a
//! company switch can never surface another company's data.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::filters::DashboardQuery;
use crate::models::DashboardOverview;
use crate::platform::Clock;
use crate::storage::KeyValueStore;

pub const OVERVIEW_TTL_MS: i64 = 5 * 60 * 1000;

const CACHE_PREFIX: &str = "dash.cache";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedOverview {
    pub data: DashboardOverview,
    pub stored_at_ms: i64,
    pub query: DashboardQuery,
}

pub struct OverviewCache {
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
}

impl OverviewCache {
    pub fn new(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn entry_key(company_id: &str, query: &DashboardQuery) -> String {
        format!("{CACHE_PREFIX}.{company_id}.{}", query.fingerprint())
    }

    fn company_prefix(company_id: &str) -> String {
        format!("{CACHE_PREFIX}.{company_id}.")
    }

    /// A hit requires the stored query to deep-equal the requested one and
    /// the entry to be younger than the TTL. Expired and corrupt entries
    /// are removed on the way out; both read as a miss, never an error.
    pub fn get(&self, company_id: &str, query: &DashboardQuery) -> Option<CachedOverview> {
        let key = Self::entry_key(company_id, query);
        let raw = self.store.get(&key)?;

        let entry: CachedOverview = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("dropping unreadable cache entry {key}: {err}");
                self.store.remove(&key);
                return None;
            }
        };

        if entry.query != *query {
            self.store.remove(&key);
            return None;
        }

        let age_ms = self.clock.now_ms() - entry.stored_at_ms;
        if age_ms >= OVERVIEW_TTL_MS {
            tracing::debug!("overview cache entry for {company_id} expired ({age_ms}ms old)");
            self.store.remove(&key);
            return None;
        }

        Some(entry)
    }

    pub fn put(&self, company_id: &str, query: &DashboardQuery, data: &DashboardOverview) {
        let entry = CachedOverview {
            data: data.clone(),
            stored_at_ms: self.clock.now_ms(),
            query: query.clone(),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.set(&Self::entry_key(company_id, query), &raw),
            Err(err) => tracing::warn!("failed to serialize overview cache entry: {err}"),
        }
    }

    pub fn invalidate(&self, company_id: &str, query: &DashboardQuery) {
        self.store.remove(&Self::entry_key(company_id, query));
    }

    pub fn invalidate_company(&self, company_id: &str) {
        let keys = self.store.keys_with_prefix(&Self::company_prefix(company_id));
        let count = keys.len();
        for key in keys {
            self.store.remove(&key);
        }
        if count > 0 {
            tracing::debug!("cleared {count} cached overview entries for {company_id}");
        }
    }

    /// Age of the entry for the focus-staleness check; `None` when there is
    /// no readable entry. Does not evict.
    pub fn entry_age_ms(&self, company_id: &str, query: &DashboardQuery) -> Option<i64> {
        let raw = self.store.get(&Self::entry_key(company_id, query))?;
        let entry: CachedOverview = serde_json::from_str(&raw).ok()?;
        Some(self.clock.now_ms() - entry.stored_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardStatistics;
    use crate::platform::testing::FakeClock;
    use crate::storage::MemoryStore;

    fn overview(revenue: f64) -> DashboardOverview {
        DashboardOverview {
            statistics: DashboardStatistics {
                total_revenue: revenue,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn cache_with_clock() -> (OverviewCache, FakeClock, MemoryStore) {
        let clock = FakeClock::at(1_000_000);
        let store = MemoryStore::new();
        let cache = OverviewCache::new(Rc::new(store.clone()), Rc::new(clock.clone()));
        (cache, clock, store)
    }

    #[test]
    fn fresh_entry_is_a_hit_with_identical_payload() {
        let (cache, clock, _) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(42.0));

        clock.advance(60_000);
        let entry = cache.get("c1", &query).expect("hit");
        assert_eq!(entry.data, overview(42.0));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, clock, store) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(1.0));

        clock.advance(OVERVIEW_TTL_MS);
        assert!(cache.get("c1", &query).is_none());
        // expired entries are evicted, not kept around
        assert!(store.keys_with_prefix("dash.cache.c1.").is_empty());
    }

    #[test]
    fn different_query_is_always_a_miss() {
        let (cache, _, _) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(1.0));

        let mut other = query.clone();
        other.team_member = Some("ana".into());
        assert!(cache.get("c1", &other).is_none());
        // and the original entry is untouched
        assert!(cache.get("c1", &query).is_some());
    }

    #[test]
    fn entries_never_cross_companies() {
        let (cache, _, _) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(1.0));
        assert!(cache.get("c2", &query).is_none());
    }

    #[test]
    fn corrupt_entry_reads_as_miss() {
        let (cache, _, store) = cache_with_clock();
        let query = DashboardQuery::default();
        store.set(
            &format!("dash.cache.c1.{}", query.fingerprint()),
            "{not json",
        );
        assert!(cache.get("c1", &query).is_none());
    }

    #[test]
    fn invalidate_drops_a_single_entry() {
        let (cache, _, _) = cache_with_clock();
        let query = DashboardQuery::default();
        let mut other = query.clone();
        other.team_member = Some("ana".into());
        cache.put("c1", &query, &overview(1.0));
        cache.put("c1", &other, &overview(2.0));

        cache.invalidate("c1", &query);
        assert!(cache.get("c1", &query).is_none());
        assert!(cache.get("c1", &other).is_some());
    }

    #[test]
    fn invalidate_company_clears_only_that_prefix() {
        let (cache, _, _) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(1.0));
        cache.put("c2", &query, &overview(2.0));

        cache.invalidate_company("c1");
        assert!(cache.get("c1", &query).is_none());
        assert!(cache.get("c2", &query).is_some());
    }

    #[test]
    fn entry_age_tracks_the_clock() {
        let (cache, clock, _) = cache_with_clock();
        let query = DashboardQuery::default();
        cache.put("c1", &query, &overview(1.0));

        clock.advance(90_000);
        assert_eq!(cache.entry_age_ms("c1", &query), Some(90_000));
        assert_eq!(cache.entry_age_ms("c2", &query), None);
    }
}
