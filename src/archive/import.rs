use std::path::Path;

use clap::builder::styling::AnsiColor;
use log::{debug, info};
use tokio::fs::File;

use crate::{
    error::{Error, Result},
    format::{format_name, format_path},
    hash::try_hash_file,
    paths::{try_exists, validate_file_name, DataRoot},
    stores::default_category_for_extension,
};

use super::{ArchivedFile, Library};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Import {
    Saved(ArchivedFile),
    /// Same content was already imported under the name `existing`.
    Duplicate { existing: String },
}

impl Library {
    /// Imports `source` into the archive.
    ///
    /// `name` defaults to the source's file name and `category` to the one
    /// implied by the extension. Content already in the archive is reported as
    /// a duplicate instead of being copied again. When the source can't be
    /// hashed the duplicate check is skipped.
    pub async fn import(
        &self,
        source: &Path,
        name: Option<&str>,
        category: Option<&str>,
    ) -> Result<Import> {
        let name = match name {
            Some(name) => name,
            None => source
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| Error::InvalidFileName(source.to_string_lossy().into_owned()))?,
        };
        let name = validate_file_name(name)?;

        let hash = try_hash_file(source).await;
        if let Some(hash) = &hash {
            if let Some(existing) = self.hashes.file_name_for(hash).await? {
                info!(
                    "{} has the same content as {}",
                    format_path(source),
                    format_name(&existing),
                );
                return Ok(Import::Duplicate { existing });
            }
        }

        let destination = self.root.archive_dir().join(name);
        if try_exists(&destination).await? {
            return Err(Error::FileAlreadyExists(destination));
        }

        let reader = File::open(source).await?;
        self.save(name, reader).await?;

        if let Some(hash) = hash {
            self.hashes.insert(hash, name).await?;
        }

        let category = category
            .filter(|category| !category.trim().is_empty())
            .unwrap_or_else(|| default_category_for_extension(name));
        let category = self
            .categories
            .set_category_for(&DataRoot::file_key(name), category)
            .await?;

        let style = AnsiColor::Green.on_default();
        debug!(
            "{style}imported{style:#} {} as {} in {}",
            format_path(source),
            format_name(name),
            format_name(&category),
        );

        let file = self
            .find(name)
            .await?
            .ok_or_else(|| Error::FileDoesNotExist(destination))?;
        Ok(Import::Saved(file))
    }
}
