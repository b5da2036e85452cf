use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::geo;

use super::types::{Domain, Location, SosState, TrackedUnit, UnitPatch};

/// Units of one domain in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct UnitTable {
    units: Vec<TrackedUnit>,
    index: HashMap<String, usize>,
}

impl UnitTable {
    fn get(&self, unit_id: &str) -> Option<&TrackedUnit> {
        self.index.get(unit_id).map(|&i| &self.units[i])
    }

    fn get_mut(&mut self, unit_id: &str) -> Option<&mut TrackedUnit> {
        match self.index.get(unit_id) {
            Some(&i) => Some(&mut self.units[i]),
            None => None,
        }
    }

    fn get_or_insert_with(
        &mut self,
        unit_id: &str,
        create: impl FnOnce() -> TrackedUnit,
    ) -> &mut TrackedUnit {
        let i = match self.index.get(unit_id) {
            Some(&i) => i,
            None => {
                self.units.push(create());
                let i = self.units.len() - 1;
                self.index.insert(unit_id.to_string(), i);
                i
            }
        };
        &mut self.units[i]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TrackedUnit> {
        self.units.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedUnit> {
        self.units.iter_mut()
    }
}

/// In-memory presence state for both domains.
///
/// Every operation takes the lock of exactly one domain, performs its
/// mutation or copy, and releases it before returning. Callers never see a
/// guard, so no lock can be held across network I/O.
#[derive(Debug, Default)]
pub struct PresenceStore {
    aerial: Mutex<UnitTable>,
    personnel: Mutex<UnitTable>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn table(&self, domain: Domain) -> MutexGuard<'_, UnitTable> {
        let table = match domain {
            Domain::Aerial => &self.aerial,
            Domain::Personnel => &self.personnel,
        };
        table.lock().expect("presence table lock poisoned")
    }

    /// Applies a partial update, creating the unit on first sight, and
    /// returns the resulting state.
    pub fn upsert(&self, domain: Domain, unit_id: &str, patch: UnitPatch) -> TrackedUnit {
        let mut table = self.table(domain);
        let unit = table.get_or_insert_with(unit_id, || {
            TrackedUnit::new(unit_id, patch.initial_liveness(), patch.seen_at)
        });
        unit.apply(patch);
        unit.clone()
    }

    /// Point-in-time copy of a domain in first-seen order.
    pub fn snapshot_all(&self, domain: Domain) -> Vec<TrackedUnit> {
        self.table(domain).iter().cloned().collect()
    }

    pub fn get(&self, domain: Domain, unit_id: &str) -> Option<TrackedUnit> {
        self.table(domain).get(unit_id).cloned()
    }

    /// Inserts units restored from persistence. Ids already present keep
    /// their in-memory state. Returns how many were inserted.
    pub fn seed(&self, domain: Domain, units: impl IntoIterator<Item = TrackedUnit>) -> usize {
        let mut table = self.table(domain);
        let mut inserted = 0;
        for unit in units {
            if table.get(&unit.unit_id).is_some() {
                continue;
            }
            let unit_id = unit.unit_id.clone();
            table.get_or_insert_with(&unit_id, || unit);
            inserted += 1;
        }
        inserted
    }

    /// Marks a personnel unit's SOS active. An unknown unit is created from
    /// `origin`; a known unit only has its SOS sub-state replaced.
    pub fn activate_sos(&self, unit_id: &str, sos: SosState, origin: UnitPatch) -> TrackedUnit {
        let mut table = self.table(Domain::Personnel);
        let unit = table.get_or_insert_with(unit_id, || {
            let mut unit = TrackedUnit::new(unit_id, origin.initial_liveness(), origin.seen_at);
            unit.apply(origin);
            unit
        });
        unit.sos = Some(sos);
        unit.clone()
    }

    /// Clears every SOS field of a personnel unit in one step. Returns
    /// whether an SOS was active.
    pub fn clear_sos(&self, unit_id: &str) -> bool {
        let mut table = self.table(Domain::Personnel);
        table
            .get_mut(unit_id)
            .and_then(|unit| unit.sos.take())
            .is_some()
    }

    /// Ids of live units within `radius_km` of `origin`, excluding `exclude_id`.
    pub fn nearby_live(
        &self,
        domain: Domain,
        exclude_id: &str,
        origin: &Location,
        radius_km: f64,
    ) -> Vec<String> {
        self.table(domain)
            .iter()
            .filter(|unit| unit.live && unit.unit_id != exclude_id)
            .filter(|unit| {
                unit.last_location.as_ref().is_some_and(|loc| {
                    geo::distance_km(origin.lat, origin.lng, loc.lat, loc.lng) <= radius_km
                })
            })
            .map(|unit| unit.unit_id.clone())
            .collect()
    }
}
