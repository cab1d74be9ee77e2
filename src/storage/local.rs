use std::{
    fs::Metadata,
    io,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{fs, time::sleep};

use crate::{
    error::{Error, Result},
    paths::{relative_components, validate_file_name},
};

use super::{RemoteFile, Storage, StorageStats};

/// Stores folders as directories under `path`. File ids are `folder/name`.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    latency: Option<Duration>,
    stats: Mutex<StorageStats>,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(path: P, latency: Option<Duration>) -> Self {
        LocalStorage {
            path: path.into(),
            latency,
            stats: Mutex::new(StorageStats::new()),
        }
    }

    fn folder_path(&self, folder_id: &str) -> Result<PathBuf> {
        let name = validate_file_name(folder_id)
            .map_err(|_| Error::ItemNotFound(folder_id.to_owned()))?;
        Ok(self.path.join(name))
    }

    fn file_path(&self, id: &str) -> Result<(PathBuf, String)> {
        match relative_components(id).as_deref() {
            Some([folder, name]) => Ok((self.path.join(folder).join(name), (*name).to_owned())),
            _ => Err(Error::ItemNotFound(id.to_owned())),
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }

    fn lock_stats(&self) -> MutexGuard<StorageStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn find_folder(&self, name: &str) -> Result<Option<String>> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let path = self.folder_path(name)?;
        let exists = match fs::metadata(&path).await {
            Ok(metadata) => metadata.is_dir(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };

        self.lock_stats().add_get(start_time, Instant::now(), 0);
        Ok(exists.then(|| name.to_owned()))
    }

    async fn create_folder(&self, name: &str) -> Result<String> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let path = self.folder_path(name)?;
        fs::create_dir_all(path).await?;

        self.lock_stats().add_put(start_time, Instant::now(), 0);
        Ok(name.to_owned())
    }

    async fn find_file(&self, folder_id: &str, name: &str) -> Result<Option<RemoteFile>> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let name = validate_file_name(name)?;
        let path = self.folder_path(folder_id)?.join(name);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        self.lock_stats().add_get(start_time, Instant::now(), 0);
        let id = format!("{folder_id}/{name}");
        Ok(Some(remote_file(id, name.to_owned(), &metadata)?))
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let name = validate_file_name(name)?;
        let folder_path = self.folder_path(folder_id)?;
        if !fs::metadata(&folder_path).await.is_ok_and(|m| m.is_dir()) {
            return Err(Error::ItemNotFound(folder_id.to_owned()));
        }

        let path = folder_path.join(name);
        let size = bytes.len() as u64;
        fs::write(&path, bytes).await?;
        let metadata = fs::metadata(&path).await?;

        self.lock_stats().add_put(start_time, Instant::now(), size);
        let id = format!("{folder_id}/{name}");
        remote_file(id, name.to_owned(), &metadata)
    }

    async fn update_file(&self, id: &str, bytes: Vec<u8>) -> Result<RemoteFile> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let (path, name) = self.file_path(id)?;
        if !fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(Error::ItemNotFound(id.to_owned()));
        }

        let size = bytes.len() as u64;
        fs::write(&path, bytes).await?;
        let metadata = fs::metadata(&path).await?;

        self.lock_stats().add_put(start_time, Instant::now(), size);
        remote_file(id.to_owned(), name, &metadata)
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let (path, _) = self.file_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ItemNotFound(id.to_owned()));
            }
            Err(err) => return Err(err.into()),
        }

        self.lock_stats().add_delete(start_time, Instant::now());
        Ok(())
    }

    async fn download_file(&self, id: &str) -> Result<Vec<u8>> {
        self.simulate_latency().await;

        let start_time = Instant::now();
        let (path, _) = self.file_path(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ItemNotFound(id.to_owned()));
            }
            Err(err) => return Err(err.into()),
        };

        self.lock_stats()
            .add_get(start_time, Instant::now(), bytes.len() as u64);
        Ok(bytes)
    }

    fn stats(&self) -> StorageStats {
        self.lock_stats().clone()
    }
}

fn remote_file(id: String, name: String, metadata: &Metadata) -> Result<RemoteFile> {
    Ok(RemoteFile {
        id,
        name,
        modified: metadata.modified()?.into(),
        size: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::LocalStorage;
    use crate::{error::Error, storage::Storage};

    #[tokio::test]
    async fn folder_lookup_or_create() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None);

        assert_eq!(storage.find_folder("backups").await.unwrap(), None);
        let id = storage.folder_id("backups").await.unwrap();
        assert_eq!(storage.find_folder("backups").await.unwrap(), Some(id.clone()));
        assert_eq!(storage.folder_id("backups").await.unwrap(), id);
    }

    #[tokio::test]
    async fn create_update_download_delete() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None);
        let folder = storage.folder_id("backups").await.unwrap();

        assert_eq!(storage.find_file(&folder, "slot.zip").await.unwrap(), None);
        let created = storage
            .create_file(&folder, "slot.zip", b"first".to_vec())
            .await
            .unwrap();
        assert_eq!(created.name, "slot.zip");
        assert_eq!(created.size, 5);

        let found = storage.find_file(&folder, "slot.zip").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let updated = storage
            .update_file(&created.id, b"second!".to_vec())
            .await
            .unwrap();
        assert_eq!(updated.size, 7);
        assert_eq!(storage.download_file(&created.id).await.unwrap(), b"second!");

        storage.delete_file(&created.id).await.unwrap();
        assert_eq!(storage.find_file(&folder, "slot.zip").await.unwrap(), None);
        assert_eq!(
            storage.download_file(&created.id).await.unwrap_err(),
            Error::ItemNotFound(created.id.clone())
        );

        let stats = storage.stats();
        assert_eq!(stats.bytes_uploaded, 12);
        assert_eq!(stats.bytes_downloaded, 7);
        assert_eq!(stats.delete_requests, 1);
    }

    #[tokio::test]
    async fn ids_cannot_escape_the_root() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("drive"), None);
        std::fs::write(dir.path().join("secret"), b"x").unwrap();

        for id in ["../secret", "a/../../secret", "/secret", "secret"] {
            assert!(storage.download_file(id).await.is_err(), "{id}");
        }
        assert!(storage.create_file("..", "x", vec![]).await.is_err());
    }
}
