use chrono::{DateTime, Duration, Utc};

use super::store::PresenceStore;
use super::types::Domain;

pub const DEFAULT_STALE_AFTER: Duration = Duration::seconds(90);

/// A unit the monitor just flipped from live to offline.
#[derive(Debug, Clone, PartialEq)]
pub struct LivenessChange {
    pub domain: Domain,
    pub unit_id: String,
    pub was_live: bool,
    pub display_name: Option<String>,
    pub badge_number: Option<String>,
}

/// Flips every live unit of `domain` whose last update is older than
/// `stale_after` to offline, under the domain lock, and returns the flips.
pub fn prune(
    store: &PresenceStore,
    domain: Domain,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Vec<LivenessChange> {
    let mut table = store.table(domain);
    let mut changes = Vec::new();
    for unit in table.iter_mut() {
        if unit.live && now - unit.last_seen > stale_after {
            unit.live = false;
            changes.push(LivenessChange {
                domain,
                unit_id: unit.unit_id.clone(),
                was_live: true,
                display_name: unit.display_name.clone(),
                badge_number: unit.badge_number.clone(),
            });
        }
    }
    changes
}

#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    stale_after: Duration,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl LivenessMonitor {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    /// Prunes both domains, aerial first. Each domain lock is taken on its own.
    pub fn prune_all(&self, store: &PresenceStore, now: DateTime<Utc>) -> Vec<LivenessChange> {
        let mut changes = Vec::new();
        for domain in Domain::ALL {
            let flipped = prune(store, domain, now, self.stale_after);
            for change in &flipped {
                log::debug!("{} unit '{}' went stale", domain, change.unit_id);
            }
            changes.extend(flipped);
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::types::{Location, UnitPatch};

    fn store_with(domain: Domain, id: &str, seen_at: DateTime<Utc>, live: bool) -> PresenceStore {
        let store = PresenceStore::new();
        store.upsert(domain, id, UnitPatch::at(seen_at).live(live));
        store
    }

    #[test]
    fn flips_stale_unit_exactly_once() {
        let now = Utc::now();
        let store = store_with(Domain::Aerial, "d", now - Duration::seconds(91), true);

        let first = prune(&store, Domain::Aerial, now, DEFAULT_STALE_AFTER);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].unit_id, "d");
        assert!(first[0].was_live);
        assert!(!store.get(Domain::Aerial, "d").unwrap().live);

        let second = prune(&store, Domain::Aerial, now, DEFAULT_STALE_AFTER);
        assert!(second.is_empty());
    }

    #[test]
    fn recent_unit_is_not_flipped() {
        let now = Utc::now();
        let store = store_with(Domain::Personnel, "o", now - Duration::seconds(89), true);
        assert!(prune(&store, Domain::Personnel, now, DEFAULT_STALE_AFTER).is_empty());
        assert!(store.get(Domain::Personnel, "o").unwrap().live);
    }

    #[test]
    fn threshold_is_exclusive() {
        let now = Utc::now();
        let store = store_with(Domain::Aerial, "d", now - Duration::seconds(90), true);
        assert!(prune(&store, Domain::Aerial, now, DEFAULT_STALE_AFTER).is_empty());
    }

    #[test]
    fn offline_units_are_ignored() {
        let now = Utc::now();
        let store = store_with(Domain::Aerial, "d", now - Duration::hours(2), false);
        assert!(prune(&store, Domain::Aerial, now, DEFAULT_STALE_AFTER).is_empty());
    }

    #[test]
    fn staleness_never_reactivates() {
        let now = Utc::now();
        let store = store_with(Domain::Aerial, "d", now - Duration::seconds(200), true);
        prune(&store, Domain::Aerial, now, DEFAULT_STALE_AFTER);
        prune(&store, Domain::Aerial, now + Duration::seconds(1), DEFAULT_STALE_AFTER);
        assert!(!store.get(Domain::Aerial, "d").unwrap().live);

        let later = now + Duration::seconds(2);
        store.upsert(
            Domain::Aerial,
            "d",
            UnitPatch::at(later).location(Location::new(0.0, 0.0, later)),
        );
        assert!(store.get(Domain::Aerial, "d").unwrap().live);
    }

    #[test]
    fn prune_all_covers_both_domains() {
        let now = Utc::now();
        let store = PresenceStore::new();
        let old = now - Duration::seconds(120);
        store.upsert(Domain::Aerial, "d", UnitPatch::at(old).live(true));
        store.upsert(Domain::Personnel, "o", UnitPatch::at(old).live(true));
        store.upsert(Domain::Personnel, "fresh", UnitPatch::at(now).live(true));

        let changes = LivenessMonitor::default().prune_all(&store, now);
        let flipped: Vec<_> = changes
            .iter()
            .map(|c| (c.domain, c.unit_id.as_str()))
            .collect();
        assert_eq!(flipped, vec![(Domain::Aerial, "d"), (Domain::Personnel, "o")]);
    }
}
