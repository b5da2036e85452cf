use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::presence::{Domain, LivenessChange, Location, PresenceStore, SosKind, TrackedUnit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DroneView {
    pub drone_id: String,
    pub nickname: Option<String>,
    pub is_live: bool,
    pub last_location: Option<Location>,
    pub last_seen: DateTime<Utc>,
}

impl From<&TrackedUnit> for DroneView {
    fn from(unit: &TrackedUnit) -> Self {
        DroneView {
            drone_id: unit.unit_id.clone(),
            nickname: unit.display_name.clone(),
            is_live: unit.live,
            last_location: unit.last_location.clone(),
            last_seen: unit.last_seen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OfficerView {
    pub officer_id: String,
    pub officer_name: Option<String>,
    pub badge_number: Option<String>,
    pub is_online: bool,
    pub last_location: Option<Location>,
    pub last_seen: DateTime<Utc>,
    pub sos_active: bool,
    pub emergency_type: Option<SosKind>,
    pub message_text: Option<String>,
    pub media_ref: Option<String>,
    pub sos_started_at: Option<DateTime<Utc>>,
}

impl From<&TrackedUnit> for OfficerView {
    fn from(unit: &TrackedUnit) -> Self {
        let sos = unit.sos.as_ref();
        OfficerView {
            officer_id: unit.unit_id.clone(),
            officer_name: unit.display_name.clone(),
            badge_number: unit.badge_number.clone(),
            is_online: unit.live,
            last_location: unit.last_location.clone(),
            last_seen: unit.last_seen,
            sos_active: sos.is_some(),
            emergency_type: sos.map(|s| s.kind),
            message_text: sos.and_then(|s| s.message.clone()),
            media_ref: sos.and_then(|s| s.media_ref.clone()),
            sos_started_at: sos.map(|s| s.started_at),
        }
    }
}

/// Payload of an `officer_sos_alert` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosAlert {
    pub officer_id: String,
    pub officer_name: Option<String>,
    pub badge_number: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub sos_active: bool,
    pub emergency_type: SosKind,
    pub message_text: Option<String>,
    pub media_ref: Option<String>,
    pub audio_duration: Option<f64>,
    pub triggered_at: DateTime<Utc>,
    pub nearby_officers: Vec<String>,
}

/// Every message a dashboard observer can receive, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    Status {
        drone_id: String,
        is_live: bool,
        nickname: Option<String>,
    },
    LocationUpdate {
        drone_id: String,
        nickname: Option<String>,
        is_live: bool,
        lat: f64,
        lng: f64,
        speed: Option<f64>,
        alt: Option<f64>,
        heading: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    OfficerStatus {
        officer_id: String,
        is_online: bool,
        officer_name: Option<String>,
        badge_number: Option<String>,
    },
    OfficerLocationUpdate {
        officer_id: String,
        officer_name: Option<String>,
        badge_number: Option<String>,
        is_online: bool,
        lat: f64,
        lng: f64,
        accuracy: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    OfficerSosAlert(SosAlert),
    OfficerSosCancelled {
        officer_id: String,
        reason: String,
    },
    Snapshot {
        drones: Vec<DroneView>,
        officers: Vec<OfficerView>,
    },
}

impl DashboardEvent {
    /// Status event for a unit of either domain.
    pub fn status(domain: Domain, unit: &TrackedUnit) -> Self {
        match domain {
            Domain::Aerial => DashboardEvent::Status {
                drone_id: unit.unit_id.clone(),
                is_live: unit.live,
                nickname: unit.display_name.clone(),
            },
            Domain::Personnel => DashboardEvent::OfficerStatus {
                officer_id: unit.unit_id.clone(),
                is_online: unit.live,
                officer_name: unit.display_name.clone(),
                badge_number: unit.badge_number.clone(),
            },
        }
    }

    /// Location event for a unit that has a location; falls back to a
    /// status event otherwise.
    pub fn location(domain: Domain, unit: &TrackedUnit) -> Self {
        let Some(location) = unit.last_location.as_ref() else {
            return Self::status(domain, unit);
        };
        match domain {
            Domain::Aerial => DashboardEvent::LocationUpdate {
                drone_id: unit.unit_id.clone(),
                nickname: unit.display_name.clone(),
                is_live: unit.live,
                lat: location.lat,
                lng: location.lng,
                speed: location.speed,
                alt: location.alt,
                heading: location.heading,
                timestamp: location.timestamp,
            },
            Domain::Personnel => DashboardEvent::OfficerLocationUpdate {
                officer_id: unit.unit_id.clone(),
                officer_name: unit.display_name.clone(),
                badge_number: unit.badge_number.clone(),
                is_online: unit.live,
                lat: location.lat,
                lng: location.lng,
                accuracy: location.accuracy,
                timestamp: location.timestamp,
            },
        }
    }

    pub fn went_stale(change: &LivenessChange) -> Self {
        match change.domain {
            Domain::Aerial => DashboardEvent::Status {
                drone_id: change.unit_id.clone(),
                is_live: false,
                nickname: change.display_name.clone(),
            },
            Domain::Personnel => DashboardEvent::OfficerStatus {
                officer_id: change.unit_id.clone(),
                is_online: false,
                officer_name: change.display_name.clone(),
                badge_number: change.badge_number.clone(),
            },
        }
    }

    pub fn snapshot(drones: &[TrackedUnit], officers: &[TrackedUnit]) -> Self {
        DashboardEvent::Snapshot {
            drones: drones.iter().map(DroneView::from).collect(),
            officers: officers.iter().map(OfficerView::from).collect(),
        }
    }

    /// Unit whose live flag the event carries.
    fn liveness_subject(&self) -> Option<(Domain, &str)> {
        match self {
            DashboardEvent::Status { drone_id, .. }
            | DashboardEvent::LocationUpdate { drone_id, .. } => Some((Domain::Aerial, drone_id)),
            DashboardEvent::OfficerStatus { officer_id, .. }
            | DashboardEvent::OfficerLocationUpdate { officer_id, .. } => {
                Some((Domain::Personnel, officer_id))
            }
            _ => None,
        }
    }

    /// Lowers the live flag to what `store` holds now. Events are built
    /// before the publish pass prunes, so a unit can go stale in between.
    pub(crate) fn sync_liveness(&mut self, store: &PresenceStore) {
        let offline = match self.liveness_subject() {
            Some((domain, unit_id)) => store.get(domain, unit_id).is_some_and(|unit| !unit.live),
            None => false,
        };
        if !offline {
            return;
        }
        match self {
            DashboardEvent::Status { is_live, .. }
            | DashboardEvent::LocationUpdate { is_live, .. } => *is_live = false,
            DashboardEvent::OfficerStatus { is_online, .. }
            | DashboardEvent::OfficerLocationUpdate { is_online, .. } => *is_online = false,
            _ => {}
        }
    }

    /// Id of the unit the event is about, if it is about a single unit.
    pub fn unit_id(&self) -> Option<&str> {
        match self {
            DashboardEvent::Status { drone_id, .. }
            | DashboardEvent::LocationUpdate { drone_id, .. } => Some(drone_id),
            DashboardEvent::OfficerStatus { officer_id, .. }
            | DashboardEvent::OfficerLocationUpdate { officer_id, .. }
            | DashboardEvent::OfficerSosCancelled { officer_id, .. } => Some(officer_id),
            DashboardEvent::OfficerSosAlert(alert) => Some(&alert.officer_id),
            DashboardEvent::Snapshot { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{SosState, UnitPatch};
    use serde_json::Value;

    #[test]
    fn events_are_tagged_with_snake_case_type() {
        let event = DashboardEvent::OfficerSosCancelled {
            officer_id: "off-1".into(),
            reason: "false_alarm".into(),
        };
        let json: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "officer_sos_cancelled");
        assert_eq!(json["officer_id"], "off-1");
        assert_eq!(json["reason"], "false_alarm");
    }

    #[test]
    fn sos_alert_fields_sit_next_to_the_tag() {
        let alert = SosAlert {
            officer_id: "off-1".into(),
            officer_name: Some("Asha".into()),
            badge_number: None,
            lat: 1.0,
            lng: 2.0,
            sos_active: true,
            emergency_type: SosKind::HighEmergency,
            message_text: None,
            media_ref: None,
            audio_duration: None,
            triggered_at: Utc::now(),
            nearby_officers: vec!["off-2".into()],
        };
        let json: Value = serde_json::to_value(DashboardEvent::OfficerSosAlert(alert)).unwrap();
        assert_eq!(json["type"], "officer_sos_alert");
        assert_eq!(json["emergency_type"], "high_emergency");
        assert_eq!(json["nearby_officers"][0], "off-2");
    }

    #[test]
    fn officer_view_flattens_sos_state() {
        let now = Utc::now();
        let mut unit = TrackedUnit::new("off-1", true, now);
        unit.apply(UnitPatch::at(now).display_name(Some("Asha".into())));
        unit.sos = Some(SosState {
            kind: SosKind::AudioMessage,
            message: None,
            media_ref: Some("https://media.example/clip.m4a".into()),
            started_at: now,
        });

        let view = OfficerView::from(&unit);
        assert!(view.sos_active);
        assert_eq!(view.emergency_type, Some(SosKind::AudioMessage));
        assert_eq!(view.sos_started_at, Some(now));

        unit.sos = None;
        let view = OfficerView::from(&unit);
        assert!(!view.sos_active);
        assert!(view.emergency_type.is_none());
        assert!(view.media_ref.is_none());
        assert!(view.sos_started_at.is_none());
    }

    #[test]
    fn location_event_without_location_falls_back_to_status() {
        let unit = TrackedUnit::new("d", true, Utc::now());
        assert!(matches!(
            DashboardEvent::location(Domain::Aerial, &unit),
            DashboardEvent::Status { .. }
        ));
    }
}
