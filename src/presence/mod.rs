mod liveness;
mod store;
mod types;

pub use liveness::{LivenessChange, LivenessMonitor, DEFAULT_STALE_AFTER};
pub use store::PresenceStore;
pub use types::{Domain, Location, SosKind, SosState, TrackedUnit, UnitPatch};
