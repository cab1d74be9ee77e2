mod file;
mod import;


use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
};

use clap::builder::styling::AnsiColor;
use log::{debug, warn};
use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncWriteExt},
};

use crate::{
    error::{Error, Result},
    format::{format_name, format_path, format_size},
    paths::{
        remove_dir_if_exists, remove_file_if_exists, try_exists, validate_file_name, DataRoot,
    },
    stores::{default_category_for_extension, CategoryStore, HashIndex, SettingsStore, StoreFile},
};

pub use self::{file::ArchivedFile, import::Import};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Owns the data root and the stores kept alongside the archived files.
#[derive(Debug)]
pub struct Library {
    root: DataRoot,
    categories: CategoryStore,
    hashes: HashIndex,
    settings: SettingsStore,
}

impl Library {
    pub async fn open(root: DataRoot) -> Result<Self> {
        root.create_dirs().await?;
        Ok(Library {
            categories: CategoryStore::new(&root),
            hashes: HashIndex::new(&root),
            settings: SettingsStore::new(&root),
            root,
        })
    }

    pub fn root(&self) -> &DataRoot {
        &self.root
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn hashes(&self) -> &HashIndex {
        &self.hashes
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Lists the regular files in the archive directory. Files without an
    /// assignment get the category implied by their extension.
    pub async fn list(&self) -> Result<Vec<ArchivedFile>> {
        let mut entries = match fs::read_dir(self.root.archive_dir()).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };

        let assignments = self.categories.assignments().await?;
        let mut files = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                warn!("skipped file with non-UTF-8 name {}", format_path(&path));
                continue;
            };

            let category = assignments
                .get(&DataRoot::file_key(&name))
                .cloned()
                .unwrap_or_else(|| default_category_for_extension(&name).to_owned());
            files.push(ArchivedFile::from_metadata(name, path, &metadata, category)?);
        }

        Ok(files)
    }

    pub async fn find(&self, name: &str) -> Result<Option<ArchivedFile>> {
        let name = validate_file_name(name)?;
        let path = self.root.archive_dir().join(name);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let category = match self.categories.category_for(&DataRoot::file_key(name)).await? {
            Some(category) => category,
            None => default_category_for_extension(name).to_owned(),
        };
        let file = ArchivedFile::from_metadata(name.to_owned(), path, &metadata, category)?;
        Ok(Some(file))
    }

    /// Copies `reader` into the archive as `name`.
    ///
    /// An existing file with that name is never touched: the check happens
    /// before any byte is written, and the final link fails rather than
    /// replacing a file that appeared in the meantime.
    pub async fn save<R: AsyncRead + Unpin>(&self, name: &str, mut reader: R) -> Result<PathBuf> {
        let name = validate_file_name(name)?;
        let path = self.root.archive_dir().join(name);
        if try_exists(&path).await? {
            return Err(Error::FileAlreadyExists(path));
        }

        fs::create_dir_all(self.root.temp_dir()).await?;
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .root
            .temp_dir()
            .join(format!("import-{}-{counter}.part", process::id()));

        let result = write_then_link(&mut reader, &temp_path, &path).await;
        remove_file_if_exists(&temp_path).await?;
        let size = result?;

        let style = AnsiColor::Green.on_default();
        debug!(
            "{style}saved file{style:#} {} ({})",
            format_path(&path),
            format_size(size),
        );
        Ok(path)
    }

    /// Removes a file together with its category assignment and hash entry.
    /// Returns whether a file was actually removed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let name = validate_file_name(name)?;
        let path = self.root.archive_dir().join(name);
        let removed = remove_file_if_exists(&path).await?;

        self.categories
            .remove_category_for(&DataRoot::file_key(name))
            .await?;
        self.hashes.remove_for_file(name).await?;

        if removed {
            let style = AnsiColor::Red.on_default();
            debug!("{style}deleted file{style:#} {}", format_path(&path));
        }

        Ok(removed)
    }

    /// Assigns the archived file `name` to `category`, creating the category
    /// if needed. Returns `None` when there is no such file.
    pub async fn move_to_category(
        &self,
        name: &str,
        category: &str,
    ) -> Result<Option<ArchivedFile>> {
        let Some(mut file) = self.find(name).await? else {
            return Ok(None);
        };

        let category = self
            .categories
            .set_category_for(&DataRoot::file_key(&file.name), category)
            .await?;

        let style = AnsiColor::Yellow.on_default();
        debug!(
            "{style}moved file{style:#} {} to {}",
            format_path(&file.path),
            format_name(&category),
        );

        file.category = category;
        Ok(Some(file))
    }

    /// Removes every archived file and store file, leaving empty directories.
    pub async fn wipe(&self) -> Result<()> {
        remove_dir_if_exists(self.root.archive_dir()).await?;
        for store in StoreFile::ALL {
            remove_file_if_exists(self.root.store_path(store)).await?;
        }

        self.root.create_dirs().await?;
        self.invalidate().await;

        let style = AnsiColor::Red.on_default();
        debug!("{style}wiped{style:#} {}", format_path(self.root.path()));
        Ok(())
    }

    /// Drops every cached store so the next read comes from disk.
    pub async fn invalidate(&self) {
        self.categories.invalidate().await;
        self.hashes.invalidate().await;
        self.settings.invalidate().await;
    }
}

async fn write_then_link<R: AsyncRead + Unpin>(
    reader: &mut R,
    temp_path: &Path,
    path: &Path,
) -> Result<u64> {
    let mut temp_file = File::create(temp_path).await?;
    let size = tokio::io::copy(reader, &mut temp_file).await?;
    temp_file.flush().await?;
    temp_file.sync_all().await?;
    drop(temp_file);

    match fs::hard_link(temp_path, path).await {
        Ok(()) => Ok(size),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(Error::FileAlreadyExists(path.to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}
