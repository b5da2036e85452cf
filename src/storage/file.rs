use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::error;

use super::{AlertRecord, AlertResolution, KnownPersonnel, Repository, StorageError};

const PERSONNEL_FILE: &str = "personnel.yaml";
const ALERTS_FOLDER: &str = "alerts";

/// YAML files under a base folder:
///
/// - `personnel.yaml`: last known location per personnel unit
/// - `alerts/<id>.yaml`: one file per SOS alert
pub struct FileRepository {
    base: PathBuf,
    // Serializes read-modify-write cycles on the files.
    write_lock: Mutex<()>,
}

impl FileRepository {
    pub fn open(base: PathBuf) -> Result<Self, StorageError> {
        if base.exists() && !base.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                base.display()
            )));
        }
        std::fs::create_dir_all(base.join(ALERTS_FOLDER))?;
        Ok(FileRepository {
            base,
            write_lock: Mutex::new(()),
        })
    }

    fn personnel_path(&self) -> PathBuf {
        self.base.join(PERSONNEL_FILE)
    }

    fn alert_path(&self, id: &str) -> PathBuf {
        self.base.join(ALERTS_FOLDER).join(format!("{}.yaml", id))
    }

    fn read_personnel(&self) -> Result<BTreeMap<String, KnownPersonnel>, StorageError> {
        let path = self.personnel_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn write_atomically(&self, path: PathBuf, content: String) -> Result<(), StorageError> {
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    fn read_alerts(&self) -> Result<Vec<AlertRecord>, StorageError> {
        let mut alerts = Vec::new();
        for entry in self.base.join(ALERTS_FOLDER).read_dir()? {
            let entry_path = entry?.path();
            if !entry_path.is_file() || entry_path.extension() != Some(OsStr::new("yaml")) {
                continue;
            }

            let content = match std::fs::read_to_string(&entry_path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read alert file {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            match serde_yaml::from_str::<AlertRecord>(&content) {
                Ok(alert) => alerts.push(alert),
                Err(e) => error!("Failed to parse alert {}: {}", entry_path.display(), e),
            }
        }
        alerts.sort_by_key(|a| a.triggered_at);
        Ok(alerts)
    }

    fn save_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        let content = serde_yaml::to_string(alert)?;
        self.write_atomically(self.alert_path(&alert.id), content)
    }
}

impl Repository for FileRepository {
    fn load_known_personnel_with_location(&self) -> Result<Vec<KnownPersonnel>, StorageError> {
        Ok(self.read_personnel()?.into_values().collect())
    }

    fn record_location(&self, person: &KnownPersonnel) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("file repository lock poisoned");
        let mut personnel = self.read_personnel()?;
        personnel
            .entry(person.unit_id.clone())
            .and_modify(|known| known.merge(person))
            .or_insert_with(|| person.clone());

        let content = serde_yaml::to_string(&personnel)?;
        self.write_atomically(self.personnel_path(), content)
    }

    fn record_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("file repository lock poisoned");
        self.save_alert(alert)
    }

    fn close_alert(
        &self,
        unit_id: &str,
        resolution: AlertResolution,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, StorageError> {
        let _guard = self.write_lock.lock().expect("file repository lock poisoned");
        let latest = self
            .read_alerts()?
            .into_iter()
            .filter(|a| a.unit_id == unit_id && a.is_open())
            .max_by_key(|a| a.triggered_at);

        match latest {
            Some(mut alert) => {
                alert.close(&resolution, at);
                self.save_alert(&alert)?;
                Ok(Some(alert.id))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{Location, SosKind};
    use crate::storage::{generate_alert_id, AlertStatus};
    use chrono::Duration;
    use tempfile::TempDir;

    fn alert(unit_id: &str, triggered_at: DateTime<Utc>) -> AlertRecord {
        AlertRecord {
            id: generate_alert_id(triggered_at),
            unit_id: unit_id.to_string(),
            display_name: Some("Asha".into()),
            badge_number: None,
            location: Location::new(18.52, 73.85, triggered_at),
            kind: SosKind::HighEmergency,
            message: None,
            media_ref: None,
            audio_duration: None,
            nearby: vec!["off-2".into()],
            status: AlertStatus::Triggered,
            triggered_at,
            closed_at: None,
            close_reason: None,
        }
    }

    #[test]
    fn empty_folder_has_no_known_personnel() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
        assert!(repo.load_known_personnel_with_location().unwrap().is_empty());
    }

    fn person(
        unit_id: &str,
        name: Option<&str>,
        badge: Option<&str>,
        lat: f64,
        at: DateTime<Utc>,
    ) -> KnownPersonnel {
        KnownPersonnel {
            unit_id: unit_id.to_string(),
            display_name: name.map(str::to_string),
            badge_number: badge.map(str::to_string),
            last_location: Location::new(lat, 73.85, at),
            last_seen: at,
        }
    }

    #[test]
    fn recorded_locations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let later = now + Duration::seconds(10);
        {
            let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
            repo.record_location(&person("off-1", Some("Asha"), Some("B-12"), 1.0, now))
                .unwrap();
            repo.record_location(&person("off-1", None, None, 3.0, later))
                .unwrap();
        }

        let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
        let known = repo.load_known_personnel_with_location().unwrap();
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].unit_id, "off-1");
        assert_eq!(known[0].last_location.lat, 3.0);
        assert_eq!(known[0].last_seen, later);
        assert_eq!(known[0].display_name.as_deref(), Some("Asha"));
        assert_eq!(known[0].badge_number.as_deref(), Some("B-12"));
    }

    #[test]
    fn newer_name_and_badge_replace_stored_ones() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
        let now = Utc::now();
        repo.record_location(&person("off-1", Some("Asha"), None, 1.0, now))
            .unwrap();
        repo.record_location(&person("off-1", Some("Asha K"), Some("B-7"), 1.0, now))
            .unwrap();

        let known = repo.load_known_personnel_with_location().unwrap();
        assert_eq!(known[0].display_name.as_deref(), Some("Asha K"));
        assert_eq!(known[0].badge_number.as_deref(), Some("B-7"));
    }

    #[test]
    fn close_alert_picks_most_recent_open_alert() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
        let now = Utc::now();
        let older = alert("off-1", now - Duration::minutes(5));
        let newer = alert("off-1", now);
        let other = alert("off-9", now);
        for a in [&older, &newer, &other] {
            repo.record_alert(a).unwrap();
        }

        let closed = repo
            .close_alert(
                "off-1",
                AlertResolution::Cancelled {
                    reason: "false_alarm".into(),
                },
                now,
            )
            .unwrap();
        assert_eq!(closed.as_deref(), Some(newer.id.as_str()));

        let alerts = repo.read_alerts().unwrap();
        let find = |id: &str| alerts.iter().find(|a| a.id == id).unwrap().clone();
        assert_eq!(find(&newer.id).status, AlertStatus::Cancelled);
        assert_eq!(find(&newer.id).close_reason.as_deref(), Some("false_alarm"));
        assert_eq!(find(&older.id).status, AlertStatus::Triggered);
        assert_eq!(find(&other.id).status, AlertStatus::Triggered);
    }

    #[test]
    fn close_alert_without_open_alert_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::open(dir.path().to_path_buf()).unwrap();
        let closed = repo
            .close_alert("off-1", AlertResolution::Resolved, Utc::now())
            .unwrap();
        assert!(closed.is_none());
    }

    #[test]
    fn base_path_that_is_a_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-a-dir");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            FileRepository::open(path),
            Err(StorageError::Unavailable(_))
        ));
    }
}
