use std::sync::Arc;

use chrono::Utc;

use crate::broadcast::{BroadcastHub, DashboardEvent, SosAlert};
use crate::presence::{Domain, Location, PresenceStore, SosKind, SosState, UnitPatch};
use crate::storage::{generate_alert_id, AlertRecord, AlertResolution, AlertStatus, Repository};

pub const DEFAULT_RADIUS_KM: f64 = 2.0;
const RESOLVED_REASON: &str = "resolved";

/// An emergency raised by a personnel unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SosRequest {
    pub unit_id: String,
    pub location: Location,
    pub kind: SosKind,
    pub message: Option<String>,
    pub media_ref: Option<String>,
    pub audio_duration: Option<f64>,
    pub display_name: Option<String>,
    pub badge_number: Option<String>,
}

pub struct SosCoordinator {
    store: Arc<PresenceStore>,
    hub: Arc<BroadcastHub>,
    repository: Arc<dyn Repository>,
    radius_km: f64,
}

impl SosCoordinator {
    pub fn new(
        store: Arc<PresenceStore>,
        hub: Arc<BroadcastHub>,
        repository: Arc<dyn Repository>,
        radius_km: f64,
    ) -> Self {
        Self {
            store,
            hub,
            repository,
            radius_km,
        }
    }

    /// Raises an SOS with the configured radius. Returns the nearby unit ids.
    pub fn trigger(&self, request: SosRequest) -> Vec<String> {
        self.trigger_within(request, self.radius_km)
    }

    pub fn trigger_within(&self, request: SosRequest, radius_km: f64) -> Vec<String> {
        let now = Utc::now();
        let sos = SosState {
            kind: request.kind,
            message: request.message.clone(),
            media_ref: request.media_ref.clone(),
            started_at: now,
        };
        let origin = UnitPatch::at(now)
            .display_name(request.display_name.clone())
            .badge_number(request.badge_number.clone())
            .live(true)
            .location(request.location.clone());
        let unit = self.store.activate_sos(&request.unit_id, sos, origin);

        let nearby = self.store.nearby_live(
            Domain::Personnel,
            &request.unit_id,
            &request.location,
            radius_km,
        );
        log::warn!(
            "SOS ({}) from officer '{}' at ({}, {}), {} officers within {} km",
            request.kind,
            request.unit_id,
            request.location.lat,
            request.location.lng,
            nearby.len(),
            radius_km
        );

        let display_name = request.display_name.or(unit.display_name);
        let badge_number = request.badge_number.or(unit.badge_number);

        let record = AlertRecord {
            id: generate_alert_id(now),
            unit_id: request.unit_id.clone(),
            display_name: display_name.clone(),
            badge_number: badge_number.clone(),
            location: request.location.clone(),
            kind: request.kind,
            message: request.message.clone(),
            media_ref: request.media_ref.clone(),
            audio_duration: request.audio_duration,
            nearby: nearby.clone(),
            status: AlertStatus::Triggered,
            triggered_at: now,
            closed_at: None,
            close_reason: None,
        };
        if let Err(e) = self.repository.record_alert(&record) {
            log::error!("Failed to persist SOS alert for '{}': {}", request.unit_id, e);
        }

        self.hub.publish(DashboardEvent::OfficerSosAlert(SosAlert {
            officer_id: request.unit_id,
            officer_name: display_name,
            badge_number,
            lat: request.location.lat,
            lng: request.location.lng,
            sos_active: true,
            emergency_type: request.kind,
            message_text: request.message,
            media_ref: request.media_ref,
            audio_duration: request.audio_duration,
            triggered_at: now,
            nearby_officers: nearby.clone(),
        }));

        nearby
    }

    /// Clears the SOS of `unit_id`. Publishes the cancellation even when no
    /// SOS was active.
    pub fn cancel(&self, unit_id: &str, reason: &str) {
        self.close(
            unit_id,
            AlertResolution::Cancelled {
                reason: reason.to_string(),
            },
        );
    }

    /// External resolution path: same as a cancel, recorded as resolved.
    pub fn resolve(&self, unit_id: &str) {
        self.close(unit_id, AlertResolution::Resolved);
    }

    fn close(&self, unit_id: &str, resolution: AlertResolution) {
        let reason = resolution.reason().unwrap_or(RESOLVED_REASON).to_string();
        let was_active = self.store.clear_sos(unit_id);
        log::info!(
            "SOS of officer '{}' closed ({}), was active: {}",
            unit_id,
            reason,
            was_active
        );

        match self.repository.close_alert(unit_id, resolution, Utc::now()) {
            Ok(Some(id)) => log::debug!("Closed alert {}", id),
            Ok(None) => log::debug!("No open alert for officer '{}'", unit_id),
            Err(e) => log::error!("Failed to close SOS alert for '{}': {}", unit_id, e),
        }

        self.hub.publish(DashboardEvent::OfficerSosCancelled {
            officer_id: unit_id.to_string(),
            reason,
        });
    }
}
