use std::{
    env::{self, VarError},
    ffi::OsStr,
    path::PathBuf,
    sync::Arc,
};

use humantime::{format_duration, parse_duration};

use crate::{
    archive::Library,
    backup::BackupEngine,
    error::{Error, Result},
    format::format_size,
    paths::DataRoot,
    storage::{BoxedStorage, LocalStorage, S3Storage, StorageUrl},
};

use super::{args::GlobalArgs, print_stat};

const ENV_VAR_ROOT: &str = "POCKET_ARCHIVE_ROOT";
const ENV_VAR_STORAGE: &str = "POCKET_ARCHIVE_STORAGE";
const ENV_VAR_LATENCY: &str = "POCKET_ARCHIVE_LATENCY";

pub async fn open_library(args: &GlobalArgs) -> Result<Arc<Library>> {
    let path = match &args.root {
        Some(path) => path.clone(),
        None => get_env_var(ENV_VAR_ROOT)?.map(PathBuf::from).ok_or_else(|| {
            Error::MissingConfig(format!("Either `--root` or `{ENV_VAR_ROOT}` must be set"))
        })?,
    };

    let library = Library::open(DataRoot::new(path)).await?;
    Ok(Arc::new(library))
}

pub async fn try_create_storage(args: &GlobalArgs) -> Result<Option<BoxedStorage>> {
    let url = match &args.storage {
        Some(url) => Some(url.clone()),
        None => get_env_var(ENV_VAR_STORAGE)?
            .as_deref()
            .map(str::parse::<StorageUrl>)
            .transpose()?,
    };

    let latency = match args.latency {
        Some(latency) => Some(latency),
        None => get_env_var(ENV_VAR_LATENCY)?
            .as_deref()
            .map(parse_duration)
            .transpose()?,
    };

    let storage: BoxedStorage = match url {
        Some(StorageUrl::S3(bucket)) => Box::new(S3Storage::new(bucket).await),
        Some(StorageUrl::Local(path)) => Box::new(LocalStorage::new(path, latency)),
        None => return Ok(None),
    };

    Ok(Some(storage))
}

pub async fn create_storage(args: &GlobalArgs) -> Result<BoxedStorage> {
    try_create_storage(args).await?.ok_or_else(|| {
        Error::MissingConfig(format!(
            "Either `--storage` or `{ENV_VAR_STORAGE}` must be set"
        ))
    })
}

pub async fn create_engine(args: &GlobalArgs) -> Result<BackupEngine> {
    let library = open_library(args).await?;
    let storage = create_storage(args).await?;
    Ok(BackupEngine::new(library, Arc::new(storage)))
}

pub fn print_storage_stats(args: &GlobalArgs, engine: &BackupEngine) {
    if !args.stats {
        return;
    }

    let stats = engine.storage().stats();
    print_stat("bytes uploaded", format_size(stats.bytes_uploaded));
    print_stat("bytes downloaded", format_size(stats.bytes_downloaded));
    print_stat(
        "requests",
        stats.get_requests + stats.put_requests + stats.delete_requests,
    );
    print_stat("request time", format_duration(stats.request_time));
}

fn get_env_var<T: AsRef<OsStr>>(name: T) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
