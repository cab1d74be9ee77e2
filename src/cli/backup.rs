use std::sync::Arc;

use clap::builder::styling::AnsiColor;
use log::{error, info, warn};
use tokio::signal;

use crate::{
    backup::BackupEngine,
    error::{Error, Result},
    format::{format_size, format_time},
    schedule::run_periodic,
};

use super::{
    common::{create_engine, open_library, print_storage_stats, try_create_storage},
    print_stat, BackupArgs, RestoreArgs, ScheduleArgs, StatusArgs, WipeArgs,
};

pub async fn backup(args: BackupArgs) -> Result<()> {
    let engine = create_engine(&args.global).await?;
    let report = engine.backup().await?;

    let verb = if report.created { "created" } else { "replaced" };
    let style = AnsiColor::Green.on_default();
    info!(
        "{style}{verb} backup{style:#} {} ({})",
        report.remote.id,
        format_size(report.remote.size),
    );

    print_storage_stats(&args.global, &engine);
    Ok(())
}

pub async fn restore(args: RestoreArgs) -> Result<()> {
    let engine = create_engine(&args.global).await?;

    match engine.restore().await {
        Ok(report) => {
            let style = AnsiColor::Green.on_default();
            info!(
                "{style}restored{style:#} {} files from the backup of {}",
                report.summary.files,
                format_time(&report.backup.modified),
            );
        }
        Err(err @ Error::RestoreFailed { .. }) => {
            if err.is_data_loss() {
                error!("local data could not be recovered");
            }
            warn!("run a fresh backup once the problem is fixed");
            return Err(err);
        }
        Err(err) => return Err(err),
    }

    print_storage_stats(&args.global, &engine);
    Ok(())
}

pub async fn status(args: StatusArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let files = library.list().await?;
    let settings = library.settings().get().await?;

    print_stat("files", files.len());
    print_stat(
        "total size",
        format_size(files.iter().map(|file| file.size).sum::<u64>()),
    );
    print_stat("auto backup", settings.auto_backup);
    let last_backup = settings
        .last_backup
        .as_ref()
        .map_or_else(|| "never".to_owned(), format_time);
    print_stat("last backup", last_backup);

    let Some(storage) = try_create_storage(&args.global).await? else {
        return Ok(());
    };

    let engine = BackupEngine::new(library, Arc::new(storage));
    match engine.metadata().await? {
        Some(metadata) => {
            print_stat("remote backup", format_time(&metadata.modified));
            print_stat("remote id", metadata.id);
        }
        None => print_stat("remote backup", "none"),
    }

    print_storage_stats(&args.global, &engine);
    Ok(())
}

pub async fn wipe(args: WipeArgs) -> Result<()> {
    if !args.yes {
        return Err(Error::MissingConfig(
            "Wiping deletes all local data and the remote backup; pass `--yes` to confirm"
                .to_owned(),
        ));
    }

    let engine = create_engine(&args.global).await?;
    let report = engine.delete_all_data().await?;

    let style = AnsiColor::Red.on_default();
    info!("{style}wiped{style:#} local data");
    if report.remote_deleted {
        info!("{style}deleted{style:#} remote backup");
    } else if let Some(err) = &report.remote_error {
        warn!("remote backup was not deleted ({err})");
    }

    print_storage_stats(&args.global, &engine);
    Ok(())
}

pub async fn schedule(args: ScheduleArgs) -> Result<()> {
    let engine = create_engine(&args.global).await?;
    if !engine.library().settings().get().await?.auto_backup {
        warn!("automatic backup is off; ticks will be skipped until it is turned on");
    }

    let shutdown = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("couldn't listen for ctrl-c ({err})");
            std::future::pending::<()>().await;
        }
    };

    run_periodic(&engine, args.interval, shutdown).await;

    print_storage_stats(&args.global, &engine);
    Ok(())
}
