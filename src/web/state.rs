use std::sync::Arc;

use crate::broadcast::BroadcastHub;
use crate::presence::{Domain, LivenessMonitor, PresenceStore};
use crate::sos::SosCoordinator;
use crate::storage::Repository;
use crate::video::VideoRelay;

use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<PresenceStore>,
    pub hub: Arc<BroadcastHub>,
    pub sos: Arc<SosCoordinator>,
    pub relay: Arc<VideoRelay>,
    pub repository: Arc<dyn Repository>,
}

impl AppState {
    /// Wires the core together and seeds personnel from the repository.
    /// A failed load only costs the dashboards their initial picture.
    pub fn new(config: Config, repository: Arc<dyn Repository>) -> Self {
        let store = Arc::new(PresenceStore::new());
        match repository.load_known_personnel_with_location() {
            Ok(known) => {
                let seeded = store.seed(
                    Domain::Personnel,
                    known.into_iter().map(|person| person.into_unit()),
                );
                log::info!("Seeded {} officers from storage", seeded);
            }
            Err(e) => log::error!("Failed to load known officers: {}", e),
        }

        let liveness = LivenessMonitor::new(config.stale_after());
        let hub = Arc::new(BroadcastHub::new(
            store.clone(),
            liveness,
            config.broadcast.observer_queue,
        ));
        let sos = Arc::new(SosCoordinator::new(
            store.clone(),
            hub.clone(),
            repository.clone(),
            config.sos.radius_km,
        ));
        let relay = Arc::new(VideoRelay::new(config.video.viewer_queue));

        AppState {
            config: Arc::new(config),
            store,
            hub,
            sos,
            relay,
            repository,
        }
    }
}
