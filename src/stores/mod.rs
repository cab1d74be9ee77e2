//! Small persisted key-value stores, one JSON file each under `prefs/`.
//!
//! Every store owns its file path and an in-memory [`Cached`] copy behind a
//! [`tokio::sync::RwLock`]. Writers hold the write lock across persisting, so
//! updates from one process are applied one at a time.

mod cache;
mod category;
mod hashes;
mod settings;


use std::{io, path::Path};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::error::Result;

pub use self::{
    cache::{CacheState, Cached},
    category::{
        default_category_for_extension, is_default_category, CategoryStore, ARCHIVES, AUDIO,
        DEFAULT_CATEGORIES, IMAGES, OFFICE, OTHER, VIDEOS,
    },
    hashes::HashIndex,
    settings::{Settings, SettingsStore, Theme},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreFile {
    Categories,
    FileCategories,
    FileHashes,
    Settings,
}

impl StoreFile {
    pub const ALL: [StoreFile; 4] = [
        StoreFile::Categories,
        StoreFile::FileCategories,
        StoreFile::FileHashes,
        StoreFile::Settings,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            StoreFile::Categories => "categories.json",
            StoreFile::FileCategories => "file_categories.json",
            StoreFile::FileHashes => "file_hashes.json",
            StoreFile::Settings => "settings.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<StoreFile> {
        StoreFile::ALL
            .into_iter()
            .find(|store| store.file_name() == name)
    }
}

/// Reads a store file, returning `None` when it has never been written.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    Ok(read_json(path).await?.unwrap_or_default())
}

/// Writes through a sibling temp file so a crash never leaves half a store.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &bytes).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
