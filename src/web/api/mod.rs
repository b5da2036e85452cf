pub mod drones;
pub mod error;
pub mod officers;
pub mod sos;
pub mod status;
mod validate;
