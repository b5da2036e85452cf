use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presence::{Location, SosKind, TrackedUnit};

/// Personnel last-known position as persisted between restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownPersonnel {
    pub unit_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub badge_number: Option<String>,
    pub last_location: Location,
    pub last_seen: DateTime<Utc>,
}

impl KnownPersonnel {
    /// Restored units start offline until they report again.
    pub fn into_unit(self) -> TrackedUnit {
        let mut unit = TrackedUnit::new(self.unit_id, false, self.last_seen);
        unit.display_name = self.display_name;
        unit.badge_number = self.badge_number;
        unit.last_location = Some(self.last_location);
        unit
    }

    /// Persistable view of a unit; `None` until it has reported a location.
    pub fn from_unit(unit: &TrackedUnit) -> Option<Self> {
        Some(KnownPersonnel {
            unit_id: unit.unit_id.clone(),
            display_name: unit.display_name.clone(),
            badge_number: unit.badge_number.clone(),
            last_location: unit.last_location.clone()?,
            last_seen: unit.last_seen,
        })
    }

    /// Overwrites position and time; name and badge only when `update` has them.
    pub(crate) fn merge(&mut self, update: &KnownPersonnel) {
        if update.display_name.is_some() {
            self.display_name = update.display_name.clone();
        }
        if update.badge_number.is_some() {
            self.badge_number = update.badge_number.clone();
        }
        self.last_location = update.last_location.clone();
        self.last_seen = update.last_seen;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Triggered,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertResolution {
    Cancelled { reason: String },
    Resolved,
}

impl AlertResolution {
    pub fn status(&self) -> AlertStatus {
        match self {
            AlertResolution::Cancelled { .. } => AlertStatus::Cancelled,
            AlertResolution::Resolved => AlertStatus::Resolved,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AlertResolution::Cancelled { reason } => Some(reason),
            AlertResolution::Resolved => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub unit_id: String,
    pub display_name: Option<String>,
    pub badge_number: Option<String>,
    pub location: Location,
    pub kind: SosKind,
    pub message: Option<String>,
    pub media_ref: Option<String>,
    pub audio_duration: Option<f64>,
    pub nearby: Vec<String>,
    pub status: AlertStatus,
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_reason: Option<String>,
}

impl AlertRecord {
    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Triggered
    }

    pub(crate) fn close(&mut self, resolution: &AlertResolution, at: DateTime<Utc>) {
        self.status = resolution.status();
        self.closed_at = Some(at);
        self.close_reason = resolution.reason().map(String::from);
    }
}

/// `<UTC timestamp>_<uuid>`, so a directory listing sorts by trigger time.
pub fn generate_alert_id(triggered_at: DateTime<Utc>) -> String {
    let uuid = uuid::Uuid::new_v4();
    let timestamp = triggered_at.format("%Y%m%dT%H%M%SZ");
    format!("{}_{}", timestamp, uuid)
}
