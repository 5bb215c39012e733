pub mod config_keys;
pub mod duplication;
pub mod orphans;

pub use config_keys::{ConfigCleanupReport, ConfigurationCleanupDetector};
pub use duplication::{CrossFileDuplicateDetector, CrossFileDuplicateReport};
pub use orphans::{OrphanReport, OrphanedFileDetector};
