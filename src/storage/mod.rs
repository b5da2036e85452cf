mod error;
mod file;
mod memory;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use error::StorageError;
pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use types::{
    generate_alert_id, AlertRecord, AlertResolution, AlertStatus, KnownPersonnel,
};

/// Durable side of the service. Every call is best effort from the core's
/// point of view: failures are logged by the caller and never block the
/// in-memory update or the broadcast.
pub trait Repository: Send + Sync {
    /// Personnel with a known last location, used to seed the store at startup.
    fn load_known_personnel_with_location(&self) -> Result<Vec<KnownPersonnel>, StorageError>;

    /// Stores the last known position of a unit along with its name and
    /// badge. A missing name or badge keeps the stored one.
    fn record_location(&self, person: &KnownPersonnel) -> Result<(), StorageError>;

    fn record_alert(&self, alert: &AlertRecord) -> Result<(), StorageError>;

    /// Closes the most recent open alert of `unit_id`. Returns its id, or
    /// `None` when the unit had no open alert.
    fn close_alert(
        &self,
        unit_id: &str,
        resolution: AlertResolution,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, StorageError>;
}

/// File-backed repository under `base_folder`, or in-memory when unset.
pub fn open(base_folder: Option<PathBuf>) -> Result<Arc<dyn Repository>, StorageError> {
    match base_folder {
        Some(base) => {
            log::info!("Persisting presence and alerts under {}", base.display());
            Ok(Arc::new(FileRepository::open(base)?))
        }
        None => {
            log::warn!("No storage folder configured, state will not survive a restart");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}
