use std::{path::PathBuf, str::FromStr};

use crate::error::Error;

pub const S3_PREFIX: &str = "s3://";
pub const LOCAL_PREFIX: &str = "file://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUrl {
    S3(String),
    Local(PathBuf),
}

impl FromStr for StorageUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(bucket) = s.strip_prefix(S3_PREFIX) {
            if bucket.is_empty() || bucket.contains('/') {
                return Err(Error::InvalidStorageUrl(s.to_owned()));
            }

            Ok(StorageUrl::S3(bucket.to_owned()))
        } else if let Some(path_str) = s.strip_prefix(LOCAL_PREFIX) {
            if path_str.is_empty() {
                return Err(Error::InvalidStorageUrl(s.to_owned()));
            }

            Ok(StorageUrl::Local(path_str.into()))
        } else {
            Err(Error::InvalidStorageUrl(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::StorageUrl;

    #[test]
    fn parses_known_schemes() {
        assert_eq!(
            "s3://my-bucket".parse::<StorageUrl>().unwrap(),
            StorageUrl::S3("my-bucket".to_owned())
        );
        assert_eq!(
            "file:///tmp/drive".parse::<StorageUrl>().unwrap(),
            StorageUrl::Local(PathBuf::from("/tmp/drive"))
        );
    }

    #[test]
    fn rejects_everything_else() {
        for s in ["", "my-bucket", "s3://", "s3://bucket/key", "file://", "gs://bucket"] {
            assert!(s.parse::<StorageUrl>().is_err(), "{s}");
        }
    }
}
