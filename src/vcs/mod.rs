pub mod backup;

pub use backup::{BackupRecord, CheckpointRecord, GitBackupManager};
