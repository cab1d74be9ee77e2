//! Layout of the app-private data root.
//!
//! ```text
//! <root>/archive/   imported files (flat)
//! <root>/prefs/     persisted stores, one JSON file each
//! <root>/tmp/       containers, restore staging and shadow copies
//! ```

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::fs;

use crate::{
    error::{Error, Result},
    stores::StoreFile,
};

pub const ARCHIVE_DIR: &str = "archive";
pub const PREFS_DIR: &str = "prefs";
pub const TEMP_DIR: &str = "tmp";

/// Directories swapped wholesale by a restore.
pub const DATA_DIRS: [&str; 2] = [ARCHIVE_DIR, PREFS_DIR];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRoot {
    path: PathBuf,
}

impl DataRoot {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DataRoot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.path.join(ARCHIVE_DIR)
    }

    pub fn prefs_dir(&self) -> PathBuf {
        self.path.join(PREFS_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.path.join(TEMP_DIR)
    }

    pub fn store_path(&self, store: StoreFile) -> PathBuf {
        self.prefs_dir().join(store.file_name())
    }

    /// Key used by the category store for an archived file. Relative to the
    /// root so assignments survive a restore into a different location.
    pub fn file_key(name: &str) -> String {
        format!("{ARCHIVE_DIR}/{name}")
    }

    pub async fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.archive_dir()).await?;
        fs::create_dir_all(self.prefs_dir()).await?;
        fs::create_dir_all(self.temp_dir()).await?;
        Ok(())
    }
}

/// Checks that `name` is usable as a flat file name inside the archive.
pub fn validate_file_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    let is_single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();

    if is_single_normal && !name.contains(['\0', '/', '\\']) {
        Ok(name)
    } else {
        Err(Error::InvalidFileName(name.to_owned()))
    }
}

/// Splits a relative, slash-separated entry name into its normal components.
///
/// Returns `None` for anything that could resolve outside the directory it is
/// joined onto: absolute paths, parent references, NUL bytes and backslashes.
pub fn relative_components(name: &str) -> Option<Vec<&str>> {
    if name.contains(['\0', '\\']) || name.starts_with('/') {
        return None;
    }

    let mut components = vec![];
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => components.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if components.is_empty() {
        None
    } else {
        Some(components)
    }
}

pub async fn try_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    match fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub async fn remove_dir_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

pub async fn remove_file_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
