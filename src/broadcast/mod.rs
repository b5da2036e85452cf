mod events;
mod hub;

pub use events::{DashboardEvent, DroneView, OfficerView, SosAlert};
pub use hub::{BroadcastHub, Subscription, DEFAULT_OBSERVER_QUEUE};
