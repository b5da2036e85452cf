use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{AlertRecord, AlertResolution, KnownPersonnel, Repository, StorageError};

#[derive(Debug, Default)]
struct Inner {
    personnel: HashMap<String, KnownPersonnel>,
    alerts: Vec<AlertRecord>,
}

/// Process-local repository; contents are gone after a restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.inner
            .lock()
            .expect("memory repository lock poisoned")
            .alerts
            .clone()
    }
}

impl Repository for MemoryRepository {
    fn load_known_personnel_with_location(&self) -> Result<Vec<KnownPersonnel>, StorageError> {
        let inner = self.inner.lock().expect("memory repository lock poisoned");
        let mut personnel: Vec<_> = inner.personnel.values().cloned().collect();
        personnel.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        Ok(personnel)
    }

    fn record_location(&self, person: &KnownPersonnel) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("memory repository lock poisoned");
        inner
            .personnel
            .entry(person.unit_id.clone())
            .and_modify(|known| known.merge(person))
            .or_insert_with(|| person.clone());
        Ok(())
    }

    fn record_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        self.inner
            .lock()
            .expect("memory repository lock poisoned")
            .alerts
            .push(alert.clone());
        Ok(())
    }

    fn close_alert(
        &self,
        unit_id: &str,
        resolution: AlertResolution,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, StorageError> {
        let mut inner = self.inner.lock().expect("memory repository lock poisoned");
        let latest = inner
            .alerts
            .iter_mut()
            .filter(|a| a.unit_id == unit_id && a.is_open())
            .max_by_key(|a| a.triggered_at);
        Ok(latest.map(|alert| {
            alert.close(&resolution, at);
            alert.id.clone()
        }))
    }
}
