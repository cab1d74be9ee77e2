//! Backup and restore of the whole data root through a single remote slot.

pub mod container;
mod swap;

#[cfg(test)]
mod tests;

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use clap::builder::styling::AnsiColor;
use log::{debug, info, warn};
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
    task::spawn_blocking,
};

use crate::{
    archive::Library,
    error::{Error, LocalState, Result},
    format::{format_path, format_size},
    paths::{remove_dir_if_exists, remove_file_if_exists},
    storage::{BoxedStorage, RemoteFile},
};

use self::container::ContainerSummary;

pub const BACKUP_FOLDER: &str = "PocketArchiveBackup";
pub const BACKUP_FILE: &str = "pocket_archive_backup.zip";

const BACKUP_CONTAINER: &str = "backup.zip";
const RESTORE_CONTAINER: &str = "restore.zip";
const STAGING_DIR: &str = "staging";
const SHADOW_DIR: &str = "shadow";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupMetadata {
    pub id: String,
    pub modified: DateTime<Utc>,
}

impl BackupMetadata {
    pub fn modified_millis(&self) -> i64 {
        self.modified.timestamp_millis()
    }
}

impl From<RemoteFile> for BackupMetadata {
    fn from(file: RemoteFile) -> Self {
        BackupMetadata {
            id: file.id,
            modified: file.modified,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupReport {
    pub remote: RemoteFile,
    pub summary: ContainerSummary,
    /// False when an existing backup was overwritten.
    pub created: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreReport {
    pub backup: BackupMetadata,
    pub summary: ContainerSummary,
}

#[derive(Debug, PartialEq)]
pub struct DeleteReport {
    pub remote_deleted: bool,
    /// Set when the local data was wiped but the remote backup wasn't removed.
    pub remote_error: Option<Error>,
}

/// Runs backup, restore and delete-all against one library and one storage.
/// At most one of those runs at a time; a second caller is turned away with
/// [`Error::OperationInProgress`].
#[derive(Debug)]
pub struct BackupEngine {
    library: Arc<Library>,
    storage: Arc<BoxedStorage>,
    guard: Mutex<()>,
}

impl BackupEngine {
    pub fn new(library: Arc<Library>, storage: Arc<BoxedStorage>) -> Self {
        BackupEngine {
            library,
            storage,
            guard: Mutex::new(()),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn storage(&self) -> &BoxedStorage {
        &self.storage
    }

    pub fn is_busy(&self) -> bool {
        self.guard.try_lock().is_err()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.guard
            .try_lock()
            .map_err(|_| Error::OperationInProgress)
    }

    pub async fn backup(&self) -> Result<BackupReport> {
        let _guard = self.lock()?;

        let folder_id = self.storage.folder_id(BACKUP_FOLDER).await?;
        let temp_dir = self.library.root().temp_dir();
        fs::create_dir_all(&temp_dir).await?;
        let container = temp_dir.join(BACKUP_CONTAINER);

        let result = self.upload(&folder_id, &container).await;
        if let Err(err) = remove_file_if_exists(&container).await {
            warn!("couldn't remove {} ({err})", format_path(&container));
        }
        let report = result?;

        if let Err(err) = self.library.settings().record_backup(Utc::now()).await {
            warn!("couldn't record backup time ({err})");
        }

        let style = AnsiColor::Green.on_default();
        info!(
            "{style}backed up{style:#} {} files ({})",
            report.summary.files,
            format_size(report.remote.size),
        );
        Ok(report)
    }

    async fn upload(&self, folder_id: &str, container: &Path) -> Result<BackupReport> {
        let root = self.library.root();
        let archive_dir = root.archive_dir();
        let prefs_dir = root.prefs_dir();
        let dest = container.to_owned();
        let summary =
            spawn_blocking(move || container::pack(&archive_dir, &prefs_dir, &dest)).await??;

        let bytes = fs::read(container).await?;
        let (remote, created) = match self.storage.find_file(folder_id, BACKUP_FILE).await? {
            Some(existing) => (self.storage.update_file(&existing.id, bytes).await?, false),
            None => {
                let remote = self
                    .storage
                    .create_file(folder_id, BACKUP_FILE, bytes)
                    .await?;
                (remote, true)
            }
        };

        let style = AnsiColor::Blue.on_default();
        debug!("{style}uploaded{style:#} {}", remote.id);
        Ok(BackupReport {
            remote,
            summary,
            created,
        })
    }

    /// Replaces all local data with the contents of the remote backup.
    ///
    /// Nothing local changes until the backup is downloaded, validated and
    /// fully extracted. See [`LocalState`] for what a failure leaves behind.
    pub async fn restore(&self) -> Result<RestoreReport> {
        let _guard = self.lock()?;

        let remote = self
            .find_backup()
            .await
            .map_err(Error::download_failed)?
            .ok_or(Error::NoBackupFound)?;

        let temp_dir = self.library.root().temp_dir();
        fs::create_dir_all(&temp_dir).await?;
        let container = temp_dir.join(RESTORE_CONTAINER);
        let staging = temp_dir.join(STAGING_DIR);
        let shadow = temp_dir.join(SHADOW_DIR);

        let result = self.download_and_swap(&remote, &container, &staging, &shadow).await;

        if let Err(err) = remove_file_if_exists(&container).await {
            warn!("couldn't remove {} ({err})", format_path(&container));
        }
        if let Err(err) = remove_dir_if_exists(&staging).await {
            warn!("couldn't remove {} ({err})", format_path(&staging));
        }
        self.library.invalidate().await;

        let summary = result?;
        let style = AnsiColor::Green.on_default();
        info!("{style}restored{style:#} {} files", summary.files);
        Ok(RestoreReport {
            backup: remote.into(),
            summary,
        })
    }

    async fn download_and_swap(
        &self,
        remote: &RemoteFile,
        container: &Path,
        staging: &Path,
        shadow: &Path,
    ) -> Result<ContainerSummary> {
        let bytes = self
            .storage
            .download_file(&remote.id)
            .await
            .map_err(Error::download_failed)?;
        fs::write(container, &bytes).await?;
        drop(bytes);

        let path = container.to_owned();
        spawn_blocking(move || container::validate(&path)).await??;

        remove_dir_if_exists(staging)
            .await
            .map_err(|err| Error::restore_failed(LocalState::Intact, err))?;
        let (path, dest) = (container.to_owned(), staging.to_owned());
        let summary = spawn_blocking(move || container::unpack(&path, &dest))
            .await
            .map_err(Error::from)
            .and_then(|result| result)
            .map_err(|err| Error::restore_failed(LocalState::Intact, err))?;

        swap::swap_in(self.library.root(), staging, shadow).await?;
        Ok(summary)
    }

    /// Describes the remote backup without downloading it.
    pub async fn metadata(&self) -> Result<Option<BackupMetadata>> {
        Ok(self.find_backup().await?.map(BackupMetadata::from))
    }

    async fn find_backup(&self) -> Result<Option<RemoteFile>> {
        match self.storage.find_folder(BACKUP_FOLDER).await? {
            Some(folder_id) => self.storage.find_file(&folder_id, BACKUP_FILE).await,
            None => Ok(None),
        }
    }

    /// Wipes local data, then removes the remote backup. A remote failure
    /// is reported, not returned, since the local wipe already happened.
    pub async fn delete_all_data(&self) -> Result<DeleteReport> {
        let _guard = self.lock()?;

        let local_result = self.library.wipe().await;
        if let Err(err) = &local_result {
            warn!("couldn't wipe local data ({err})");
        }

        let report = match self.delete_remote().await {
            Ok(remote_deleted) => DeleteReport {
                remote_deleted,
                remote_error: None,
            },
            Err(err) => {
                warn!("couldn't delete remote backup ({err})");
                DeleteReport {
                    remote_deleted: false,
                    remote_error: Some(err),
                }
            }
        };

        local_result?;
        Ok(report)
    }

    async fn delete_remote(&self) -> Result<bool> {
        let Some(remote) = self.find_backup().await? else {
            return Ok(false);
        };

        self.storage.delete_file(&remote.id).await?;
        let style = AnsiColor::Red.on_default();
        debug!("{style}deleted{style:#} {}", remote.id);
        Ok(true)
    }
}
