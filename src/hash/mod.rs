
use std::{fmt, path::Path, str::FromStr};

use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt},
};

use crate::{
    error::{Error, Result},
    format::format_path,
};

pub const SIZE: usize = blake3::OUT_LEN;

const CHUNK_SIZE: usize = 8 * 1024;

/// Digest of a file's bytes, independent of its name or metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash {
    inner: blake3::Hash,
}

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; SIZE]) -> Self {
        let inner = blake3::Hash::from_bytes(bytes);
        ContentHash { inner }
    }

    pub fn of_bytes(data: &[u8]) -> Self {
        blake3::hash(data).into()
    }

    pub fn to_hex(&self) -> String {
        self.inner.to_hex().to_string()
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(inner: blake3::Hash) -> Self {
        ContentHash { inner }
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let inner = blake3::Hash::from_hex(s).map_err(|_| Error::InvalidHash(s.to_owned()))?;
        Ok(inner.into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub async fn hash_reader<R: AsyncRead + Unpin>(mut reader: R) -> Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; CHUNK_SIZE];

    loop {
        let len = reader.read(&mut buffer).await?;
        if len == 0 {
            break;
        }

        hasher.update(&buffer[..len]);
    }

    Ok(hasher.finalize().into())
}

pub async fn hash_file(path: &Path) -> Result<ContentHash> {
    let file = File::open(path).await?;
    hash_reader(file).await
}

/// Like [`hash_file`], but a failure means "unknown" rather than an error.
/// Callers treat an unknown digest as "not a duplicate".
pub async fn try_hash_file(path: &Path) -> Option<ContentHash> {
    match hash_file(path).await {
        Ok(hash) => Some(hash),
        Err(err) => {
            let formatted_path = format_path(path);
            warn!("couldn't hash {formatted_path}, skipping duplicate check ({err})");
            None
        }
    }
}
