mod coordinator;

pub use coordinator::{SosCoordinator, SosRequest, DEFAULT_RADIUS_KM};
