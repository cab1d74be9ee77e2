mod local;
mod s3;
mod stats;
mod url;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub use self::{local::LocalStorage, s3::S3Storage, stats::StorageStats, url::StorageUrl};

pub type BoxedStorage = Box<dyn Storage + Sync + Send + 'static>;

/// A file as reported by the remote side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// A cloud drive holding named files inside named folders.
#[async_trait]
pub trait Storage: Debug {
    async fn find_folder(&self, name: &str) -> Result<Option<String>>;
    async fn create_folder(&self, name: &str) -> Result<String>;
    async fn find_file(&self, folder_id: &str, name: &str) -> Result<Option<RemoteFile>>;
    async fn create_file(&self, folder_id: &str, name: &str, bytes: Vec<u8>)
        -> Result<RemoteFile>;
    async fn update_file(&self, id: &str, bytes: Vec<u8>) -> Result<RemoteFile>;
    async fn delete_file(&self, id: &str) -> Result<()>;
    async fn download_file(&self, id: &str) -> Result<Vec<u8>>;

    fn stats(&self) -> StorageStats;

    /// Looks up a folder by name, creating it when missing.
    async fn folder_id(&self, name: &str) -> Result<String> {
        match self.find_folder(name).await? {
            Some(id) => Ok(id),
            None => self.create_folder(name).await,
        }
    }
}
