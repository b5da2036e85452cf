use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The two independent tracking domains. Each has its own table and lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Aerial,
    Personnel,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Aerial, Domain::Personnel];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Location {
    pub fn new(lat: f64, lng: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lng,
            speed: None,
            alt: None,
            heading: None,
            accuracy: None,
            timestamp,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SosKind {
    HighEmergency,
    AudioMessage,
    TextMessage,
}

/// Emergency sub-state of a personnel unit. Present means active.
#[derive(Debug, Clone, PartialEq)]
pub struct SosState {
    pub kind: SosKind,
    pub message: Option<String>,
    pub media_ref: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedUnit {
    pub unit_id: String,
    pub display_name: Option<String>,
    pub badge_number: Option<String>,
    pub live: bool,
    pub last_location: Option<Location>,
    pub last_seen: DateTime<Utc>,
    pub sos: Option<SosState>,
}

impl TrackedUnit {
    pub fn new(unit_id: impl Into<String>, live: bool, last_seen: DateTime<Utc>) -> Self {
        Self {
            unit_id: unit_id.into(),
            display_name: None,
            badge_number: None,
            live,
            last_location: None,
            last_seen,
            sos: None,
        }
    }

    pub fn sos_active(&self) -> bool {
        self.sos.is_some()
    }

    /// Overwrites only the fields the patch carries.
    pub(crate) fn apply(&mut self, patch: UnitPatch) {
        if let Some(name) = patch.display_name {
            self.display_name = Some(name);
        }
        if let Some(badge) = patch.badge_number {
            self.badge_number = Some(badge);
        }
        match (patch.live, patch.location.is_some()) {
            (Some(live), _) => self.live = live,
            (None, true) => self.live = true,
            (None, false) => {}
        }
        if let Some(location) = patch.location {
            self.last_location = Some(location);
        }
        self.last_seen = patch.seen_at;
    }
}

/// Partial update for a unit. `seen_at` always becomes the new `last_seen`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPatch {
    pub display_name: Option<String>,
    pub badge_number: Option<String>,
    pub live: Option<bool>,
    pub location: Option<Location>,
    pub seen_at: DateTime<Utc>,
}

impl UnitPatch {
    pub fn at(seen_at: DateTime<Utc>) -> Self {
        Self {
            display_name: None,
            badge_number: None,
            live: None,
            location: None,
            seen_at,
        }
    }

    pub fn display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn badge_number(mut self, badge: Option<String>) -> Self {
        self.badge_number = badge.filter(|b| !b.is_empty());
        self
    }

    pub fn live(mut self, live: bool) -> Self {
        self.live = Some(live);
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Liveness a brand-new unit starts with: the status flag if given,
    /// otherwise live (a location report means the unit is out there).
    pub(crate) fn initial_liveness(&self) -> bool {
        self.live.unwrap_or(true)
    }
}
