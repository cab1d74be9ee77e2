use std::{collections::BTreeMap, path::PathBuf};

use tokio::sync::RwLock;

use crate::{error::Result, hash::ContentHash, paths::DataRoot};

use super::{read_json_or_default, write_json, Cached, StoreFile};

// Keyed by lowercase hex digest.
type Index = BTreeMap<String, String>;

/// Maps each imported digest to the name of the file first saved with it.
#[derive(Debug)]
pub struct HashIndex {
    path: PathBuf,
    index: RwLock<Cached<Index>>,
}

impl HashIndex {
    pub fn new(root: &DataRoot) -> Self {
        HashIndex {
            path: root.store_path(StoreFile::FileHashes),
            index: RwLock::new(Cached::new()),
        }
    }

    pub async fn contains(&self, hash: &ContentHash) -> Result<bool> {
        Ok(self.file_name_for(hash).await?.is_some())
    }

    pub async fn file_name_for(&self, hash: &ContentHash) -> Result<Option<String>> {
        let mut cache = self.index.write().await;
        let index = cache.get_or_load(read_json_or_default(&self.path)).await?;
        Ok(index.get(&hash.to_hex()).cloned())
    }

    pub async fn insert(&self, hash: ContentHash, file_name: &str) -> Result<()> {
        let mut cache = self.index.write().await;
        let index = cache.get_or_load(read_json_or_default(&self.path)).await?;
        let key = hash.to_hex();
        if index.get(&key).map(String::as_str) == Some(file_name) {
            return Ok(());
        }

        let mut updated = index.clone();
        updated.insert(key, file_name.to_owned());
        write_json(&self.path, &updated).await?;
        cache.set(updated);
        Ok(())
    }

    /// Drops every digest that points at `file_name`.
    pub async fn remove_for_file(&self, file_name: &str) -> Result<()> {
        let mut cache = self.index.write().await;
        let index = cache.get_or_load(read_json_or_default(&self.path)).await?;
        if !index.values().any(|name| name == file_name) {
            return Ok(());
        }

        let mut updated = index.clone();
        updated.retain(|_, name| name != file_name);
        write_json(&self.path, &updated).await?;
        cache.set(updated);
        Ok(())
    }

    pub async fn invalidate(&self) {
        self.index.write().await.invalidate();
    }
}
