use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError,
    operation::{get_object::GetObjectError, head_object::HeadObjectError},
    primitives::DateTime as S3DateTime,
    Client,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::{DateTime, Utc};
use tokio::task::spawn_blocking;

use crate::{
    error::{Error, Result},
    paths::validate_file_name,
};

use super::{RemoteFile, Storage, StorageStats};

/// Folders are key prefixes, marked by an empty `<folder>/` object so that
/// an empty folder can still be found. File ids are full object keys.
#[derive(Debug)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    stats: Mutex<StorageStats>,
}

impl S3Storage {
    pub async fn new(bucket: String) -> Self {
        let s3_config = aws_config::load_from_env().await;
        let client = Client::new(&s3_config);

        S3Storage {
            client,
            bucket,
            stats: Mutex::new(StorageStats::new()),
        }
    }

    fn lock_stats(&self) -> MutexGuard<StorageStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `(modified, size)` for `key`, or `None` if it doesn't exist.
    async fn head(&self, key: &str) -> Result<Option<(DateTime<Utc>, u64)>> {
        let start_time = Instant::now();
        let response_result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(SdkError::into_service_error);

        let head = match response_result {
            Ok(output) => {
                let modified = output
                    .last_modified()
                    .and_then(to_chrono)
                    .unwrap_or_else(Utc::now);
                let size = output
                    .content_length()
                    .and_then(|size| u64::try_from(size).ok())
                    .unwrap_or(0);
                Some((modified, size))
            }
            Err(HeadObjectError::NotFound(_)) => None,
            Err(err) => return Err(Error::other(err)),
        };

        self.lock_stats().add_get(start_time, Instant::now(), 0);
        Ok(head)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<u64> {
        let size = bytes.len() as u64;
        let (bytes, encoded_digest) = spawn_blocking(move || {
            let encoded_digest = md5_base64(&bytes);
            (bytes, encoded_digest)
        })
        .await?;

        let start_time = Instant::now();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .content_md5(encoded_digest)
            .send()
            .await?;

        self.lock_stats().add_put(start_time, Instant::now(), size);
        Ok(size)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn find_folder(&self, name: &str) -> Result<Option<String>> {
        let name = validate_file_name(name)?;
        let marker = folder_marker(name);
        Ok(self.head(&marker).await?.map(|_| name.to_owned()))
    }

    async fn create_folder(&self, name: &str) -> Result<String> {
        let name = validate_file_name(name)?;
        self.put(&folder_marker(name), vec![]).await?;
        Ok(name.to_owned())
    }

    async fn find_file(&self, folder_id: &str, name: &str) -> Result<Option<RemoteFile>> {
        let name = validate_file_name(name)?;
        let key = format!("{folder_id}/{name}");
        let file = self.head(&key).await?.map(|(modified, size)| RemoteFile {
            id: key.clone(),
            name: name.to_owned(),
            modified,
            size,
        });
        Ok(file)
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile> {
        let name = validate_file_name(name)?;
        let key = format!("{folder_id}/{name}");
        let size = self.put(&key, bytes).await?;
        Ok(RemoteFile {
            id: key,
            name: name.to_owned(),
            modified: Utc::now(),
            size,
        })
    }

    async fn update_file(&self, id: &str, bytes: Vec<u8>) -> Result<RemoteFile> {
        if self.head(id).await?.is_none() {
            return Err(Error::ItemNotFound(id.to_owned()));
        }

        let size = self.put(id, bytes).await?;
        let name = id.rsplit_once('/').map_or(id, |(_, name)| name);
        Ok(RemoteFile {
            id: id.to_owned(),
            name: name.to_owned(),
            modified: Utc::now(),
            size,
        })
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        let start_time = Instant::now();
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await?;

        self.lock_stats().add_delete(start_time, Instant::now());
        Ok(())
    }

    async fn download_file(&self, id: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                GetObjectError::NoSuchKey(_) => Error::ItemNotFound(id.to_owned()),
                err => Error::other(err),
            })?;

        let bytes = response.body.collect().await?.to_vec();

        self.lock_stats()
            .add_get(start_time, Instant::now(), bytes.len() as u64);
        Ok(bytes)
    }

    fn stats(&self) -> StorageStats {
        self.lock_stats().clone()
    }
}

fn folder_marker(name: &str) -> String {
    format!("{name}/")
}

fn to_chrono(time: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn md5_base64(bytes: &[u8]) -> String {
    let digest = md5::compute(bytes);
    BASE64_STANDARD.encode(digest.0)
}
