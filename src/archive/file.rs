use std::{fs::Metadata, path::PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// A file in the archive directory, as seen by one listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub category: String,
}

impl ArchivedFile {
    pub fn from_metadata(
        name: String,
        path: PathBuf,
        metadata: &Metadata,
        category: String,
    ) -> Result<Self> {
        let modified = metadata.modified()?.into();
        Ok(ArchivedFile {
            name,
            path,
            modified,
            size: metadata.len(),
            category,
        })
    }
}
