//! Periodic automatic backups.

use std::{future::Future, time::Duration};

use humantime::format_duration;
use log::{debug, info, warn};
use tokio::time::{interval, MissedTickBehavior};

use crate::{
    backup::{BackupEngine, BackupReport},
    error::{Error, Result},
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, PartialEq)]
pub enum ScheduledBackup {
    /// Automatic backups are turned off in the settings.
    Disabled,
    /// Another backup, restore or delete was already running.
    Busy,
    Completed(BackupReport),
    Failed(Error),
}

/// Runs one scheduled backup if the settings allow it.
pub async fn run_scheduled_backup(engine: &BackupEngine) -> Result<ScheduledBackup> {
    let settings = engine.library().settings().get().await?;
    if !settings.auto_backup {
        return Ok(ScheduledBackup::Disabled);
    }

    let outcome = match engine.backup().await {
        Ok(report) => ScheduledBackup::Completed(report),
        Err(Error::OperationInProgress) => ScheduledBackup::Busy,
        Err(err) => ScheduledBackup::Failed(err),
    };
    Ok(outcome)
}

/// Attempts a backup every `period` until `shutdown` resolves. The first
/// attempt happens one full period after starting. Failures are logged and
/// the next tick tries again.
pub async fn run_periodic<F: Future<Output = ()>>(
    engine: &BackupEngine,
    period: Duration,
    shutdown: F,
) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks.tick().await;

    tokio::pin!(shutdown);
    info!("backing up every {}", format_duration(period));

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticks.tick() => {}
        }

        match run_scheduled_backup(engine).await {
            Ok(ScheduledBackup::Disabled) => debug!("automatic backup is off, skipping"),
            Ok(ScheduledBackup::Busy) => info!("another operation is running, skipping backup"),
            Ok(ScheduledBackup::Completed(_)) => {}
            Ok(ScheduledBackup::Failed(err)) | Err(err) => warn!("scheduled backup failed ({err})"),
        }
    }

    debug!("stopped scheduled backups");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tempfile::tempdir;
    use tokio::{
        sync::oneshot,
        time::{sleep, timeout},
    };

    use super::{run_periodic, run_scheduled_backup, ScheduledBackup};
    use crate::{
        archive::Library,
        backup::{BackupEngine, BACKUP_FILE, BACKUP_FOLDER},
        paths::DataRoot,
        storage::{BoxedStorage, LocalStorage},
    };

    async fn engine(base: &std::path::Path) -> BackupEngine {
        let library = Library::open(DataRoot::new(base.join("data"))).await.unwrap();
        let storage: BoxedStorage = Box::new(LocalStorage::new(base.join("drive"), None));
        BackupEngine::new(Arc::new(library), Arc::new(storage))
    }

    #[tokio::test]
    async fn honors_the_setting() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path()).await;

        let outcome = run_scheduled_backup(&engine).await.unwrap();
        assert_eq!(outcome, ScheduledBackup::Disabled);
        assert!(engine.metadata().await.unwrap().is_none());

        engine.library().settings().set_auto_backup(true).await.unwrap();
        let outcome = run_scheduled_backup(&engine).await.unwrap();
        assert!(matches!(outcome, ScheduledBackup::Completed(_)));
        assert!(engine.metadata().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ticks_until_shutdown() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path()).await;
        engine.library().settings().set_auto_backup(true).await.unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = stopped.await;
        };

        let slot = dir.path().join("drive").join(BACKUP_FOLDER).join(BACKUP_FILE);
        let watcher = async move {
            assert!(!slot.exists());
            timeout(Duration::from_secs(10), async {
                while !slot.exists() {
                    sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap();
            let _ = stop.send(());
        };

        // returns only once the shutdown future resolves
        tokio::join!(run_periodic(&engine, Duration::from_millis(50), shutdown), watcher);
        assert!(engine.library().settings().get().await.unwrap().last_backup.is_some());
    }
}
