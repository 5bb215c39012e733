//! Git-backed backup and rollback.
//!
//! Commits are the durable backup medium: every backup or checkpoint is a
//! stage-all commit (or a marker pointing at HEAD when the tree is clean),
//! and every rollback is a hard reset to the recorded commit. The id is
//! embedded in the commit message, so backups remain discoverable from
//! `git log` alone with no separate storage.
//!
//! git2::Repository is not Send/Sync, so the manager holds only the
//! working-tree path and opens a fresh Repository per operation.

use chrono::{DateTime, Duration, Utc};
use git2::{IndexAddOption, ObjectType, Repository, ResetType, Signature, StatusOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::errors::{Error, Result};

const COMMIT_AUTHOR: &str = "codesweep";
const COMMIT_EMAIL: &str = "codesweep@localhost";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub commit: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub session: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub id: String,
    pub commit: String,
    pub operation: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub session: String,
}

/// Transactional substrate for the mutation pipeline. At most one manager
/// should hold a working tree at a time; rollback against a dirty tree is
/// rejected rather than silently discarding uncommitted work.
pub struct GitBackupManager {
    root: PathBuf,
    session: String,
    sequence: u64,
    backups: Vec<BackupRecord>,
    checkpoints: Vec<CheckpointRecord>,
}

impl GitBackupManager {
    /// Fails with `NotAGitRepository` when `root` is not inside a
    /// version-controlled working tree.
    pub fn new(root: &Path) -> Result<Self> {
        let repo = Repository::discover(root)
            .map_err(|_| Error::NotAGitRepository {
                path: root.to_path_buf(),
            })?;
        let workdir = repo.workdir().ok_or_else(|| Error::NotAGitRepository {
            path: root.to_path_buf(),
        })?;

        Ok(Self {
            root: workdir.to_path_buf(),
            session: format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), std::process::id()),
            sequence: 0,
            backups: Vec::new(),
            checkpoints: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn backups(&self) -> &[BackupRecord] {
        &self.backups
    }

    pub fn checkpoints(&self) -> &[CheckpointRecord] {
        &self.checkpoints
    }

    /// Commit the current working-tree state and return the backup id.
    /// A clean tree records the current HEAD commit instead of writing an
    /// empty one.
    pub fn create_backup(&mut self, description: &str) -> Result<String> {
        let id = self.next_id("backup");
        let message = format!("codesweep-backup {id}: {description}");
        let commit = self.commit_working_tree(&message)?;

        log::info!("Created backup {id} at {commit}");
        self.backups.push(BackupRecord {
            id: id.clone(),
            commit,
            description: description.to_string(),
            created_at: Utc::now(),
            session: self.session.clone(),
        });
        Ok(id)
    }

    /// Commit a checkpoint before one discrete cleanup operation.
    pub fn create_checkpoint(
        &mut self,
        operation: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        let id = self.next_id("checkpoint");
        let message = format!("codesweep-checkpoint {id}: {operation}");
        let commit = self.commit_working_tree(&message)?;

        log::info!("Created checkpoint {id} for {operation} at {commit}");
        self.checkpoints.push(CheckpointRecord {
            id: id.clone(),
            commit,
            operation: operation.to_string(),
            metadata,
            created_at: Utc::now(),
            session: self.session.clone(),
        });
        Ok(id)
    }

    /// True only when the working tree has no uncommitted changes.
    pub fn can_rollback(&self) -> Result<bool> {
        let repo = self.open_repo()?;
        Ok(Self::tree_is_clean(&repo)?)
    }

    /// Restore the working tree to the backup's commit. Fails with
    /// `GitStateError` on a dirty tree and `BackupNotFound` for an unknown
    /// id; neither failure mutates anything.
    pub fn rollback(&self, id: &str) -> Result<()> {
        let record = self
            .backups
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::BackupNotFound(id.to_string()))?;
        self.reset_to(&record.commit)
    }

    /// Restore the working tree to the checkpoint's commit, with the same
    /// clean-tree requirement as `rollback`.
    pub fn rollback_to_checkpoint(&self, id: &str) -> Result<()> {
        let record = self
            .checkpoints
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::CheckpointNotFound(id.to_string()))?;
        self.reset_to(&record.commit)
    }

    /// Drop backup and checkpoint records older than the retention window.
    /// Returns the number of records removed. The commits themselves stay
    /// in history; only the id mapping is pruned.
    pub fn cleanup(&mut self, retention_days: i64) -> usize {
        self.cleanup_at(Utc::now(), retention_days)
    }

    fn cleanup_at(&mut self, now: DateTime<Utc>, retention_days: i64) -> usize {
        let cutoff = now - Duration::days(retention_days);
        let before = self.backups.len() + self.checkpoints.len();
        self.backups.retain(|b| b.created_at >= cutoff);
        self.checkpoints.retain(|c| c.created_at >= cutoff);
        let removed = before - (self.backups.len() + self.checkpoints.len());
        if removed > 0 {
            log::info!("Pruned {removed} backup/checkpoint records past {retention_days} days");
        }
        removed
    }

    fn next_id(&mut self, kind: &str) -> String {
        self.sequence += 1;
        format!("{kind}-{}-{}", self.session, self.sequence)
    }

    fn open_repo(&self) -> Result<Repository> {
        Ok(Repository::open(&self.root)?)
    }

    fn tree_is_clean(repo: &Repository) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn commit_working_tree(&self, message: &str) -> Result<String> {
        let repo = self.open_repo()?;

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let head = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

        // Clean tree: record HEAD instead of writing an empty commit
        if let Some(parent) = &head {
            if parent.tree_id() == tree_id && Self::tree_is_clean(&repo)? {
                return Ok(parent.id().to_string());
            }
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = Signature::now(COMMIT_AUTHOR, COMMIT_EMAIL)?;
        let parents: Vec<&git2::Commit> = head.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn reset_to(&self, commit: &str) -> Result<()> {
        let repo = self.open_repo()?;
        if !Self::tree_is_clean(&repo)? {
            return Err(Error::GitState(format!(
                "working tree at {} has uncommitted changes; commit or stash before rolling back",
                self.root.display()
            )));
        }

        let oid = git2::Oid::from_str(commit)?;
        let object = repo.find_object(oid, Some(ObjectType::Commit))?;
        repo.reset(&object, ResetType::Hard, None)?;
        log::info!("Rolled back working tree to {commit}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("app.php"), "<?php echo 'v1';\n").unwrap();

        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("test", "test@localhost").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        dir
    }

    #[test]
    fn construction_outside_a_repository_fails() {
        let dir = TempDir::new().unwrap();
        let err = GitBackupManager::new(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotAGitRepository { .. }));
    }

    #[test]
    fn backup_then_rollback_restores_content_byte_for_byte() {
        let dir = init_repo();
        let mut manager = GitBackupManager::new(dir.path()).unwrap();
        let file = dir.path().join("app.php");
        let original = fs::read(&file).unwrap();

        let id = manager.create_backup("before cleanup").unwrap();

        fs::write(&file, "<?php echo 'v2';\n").unwrap();
        manager.create_checkpoint("mutation", BTreeMap::new()).unwrap();
        assert_ne!(fs::read(&file).unwrap(), original);

        manager.rollback(&id).unwrap();
        assert_eq!(fs::read(&file).unwrap(), original);
    }

    #[test]
    fn rollback_against_dirty_tree_is_rejected_without_mutation() {
        let dir = init_repo();
        let mut manager = GitBackupManager::new(dir.path()).unwrap();
        let id = manager.create_backup("clean state").unwrap();

        let file = dir.path().join("app.php");
        fs::write(&file, "<?php echo 'dirty';\n").unwrap();

        assert!(!manager.can_rollback().unwrap());
        let err = manager.rollback(&id).unwrap_err();
        assert!(matches!(err, Error::GitState(_)));
        // The uncommitted change survives
        assert_eq!(fs::read_to_string(&file).unwrap(), "<?php echo 'dirty';\n");
    }

    #[test]
    fn unknown_ids_are_distinct_errors() {
        let dir = init_repo();
        let manager = GitBackupManager::new(dir.path()).unwrap();
        assert!(matches!(
            manager.rollback("backup-missing").unwrap_err(),
            Error::BackupNotFound(_)
        ));
        assert!(matches!(
            manager.rollback_to_checkpoint("checkpoint-missing").unwrap_err(),
            Error::CheckpointNotFound(_)
        ));
    }

    #[test]
    fn clean_tree_backup_records_head_without_new_commit() {
        let dir = init_repo();
        let mut manager = GitBackupManager::new(dir.path()).unwrap();

        let first = manager.create_backup("a").unwrap();
        let second = manager.create_backup("b").unwrap();
        assert_ne!(first, second);

        let commits: Vec<&str> = manager
            .backups()
            .iter()
            .map(|b| b.commit.as_str())
            .collect();
        assert_eq!(commits[0], commits[1]);
    }

    #[test]
    fn cleanup_prunes_records_past_retention() {
        let dir = init_repo();
        let mut manager = GitBackupManager::new(dir.path()).unwrap();
        manager.create_backup("old").unwrap();
        manager.create_checkpoint("old op", BTreeMap::new()).unwrap();

        let removed = manager.cleanup_at(Utc::now() + Duration::days(40), 30);
        assert_eq!(removed, 2);
        assert!(manager.backups().is_empty());
        assert!(manager.checkpoints().is_empty());
    }
}
