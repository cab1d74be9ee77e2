use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use clap::builder::styling::AnsiColor;
use log::debug;
use tokio::sync::RwLock;

use crate::{
    error::{Error, Result},
    format::format_name,
    paths::DataRoot,
};

use super::{read_json, read_json_or_default, write_json, Cached, StoreFile};

pub const OFFICE: &str = "office";
pub const IMAGES: &str = "images";
pub const VIDEOS: &str = "videos";
pub const AUDIO: &str = "audio";
pub const ARCHIVES: &str = "archives";
pub const OTHER: &str = "other";

pub const DEFAULT_CATEGORIES: [&str; 6] = [OFFICE, IMAGES, VIDEOS, AUDIO, ARCHIVES, OTHER];

type Categories = BTreeSet<String>;
type Assignments = BTreeMap<String, String>;

/// Category names plus the file→category assignments.
#[derive(Debug)]
pub struct CategoryStore {
    categories_path: PathBuf,
    assignments_path: PathBuf,
    categories: RwLock<Cached<Categories>>,
    assignments: RwLock<Cached<Assignments>>,
}

impl CategoryStore {
    pub fn new(root: &DataRoot) -> Self {
        CategoryStore {
            categories_path: root.store_path(StoreFile::Categories),
            assignments_path: root.store_path(StoreFile::FileCategories),
            categories: RwLock::new(Cached::new()),
            assignments: RwLock::new(Cached::new()),
        }
    }

    pub async fn list_categories(&self) -> Result<Categories> {
        let mut cache = self.categories.write().await;
        let categories = cache.get_or_load(load_categories(&self.categories_path)).await?;
        Ok(categories.clone())
    }

    /// Adds `name` unless a category with the same name (ignoring case)
    /// already exists.
    pub async fn add_category(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }

        let mut cache = self.categories.write().await;
        let categories = cache.get_or_load(load_categories(&self.categories_path)).await?;
        if find_ignore_case(categories, name).is_some() {
            return Ok(false);
        }

        let mut updated = categories.clone();
        updated.insert(name.to_owned());
        write_json(&self.categories_path, &updated).await?;
        cache.set(updated);

        let style = AnsiColor::Green.on_default();
        debug!("{style}added category{style:#} {}", format_name(name));
        Ok(true)
    }

    /// Replaces `old` with `new` and moves every file assigned to `old`.
    ///
    /// Returns false when `old` is missing or `new` would clash (ignoring
    /// case) with another category.
    pub async fn rename_category(&self, old: &str, new: &str) -> Result<bool> {
        let new = new.trim();
        if new.is_empty() {
            return Ok(false);
        }

        let mut categories_cache = self.categories.write().await;
        let mut assignments_cache = self.assignments.write().await;

        let categories = categories_cache
            .get_or_load(load_categories(&self.categories_path))
            .await?;
        if !categories.contains(old) {
            return Ok(false);
        }
        if old == new {
            return Ok(true);
        }

        let mut updated_categories = categories.clone();
        updated_categories.remove(old);
        // defaults are always present, renamed or not
        updated_categories.extend(DEFAULT_CATEGORIES.map(ToOwned::to_owned));
        if find_ignore_case(&updated_categories, new).is_some() {
            return Ok(false);
        }
        updated_categories.insert(new.to_owned());

        let assignments = assignments_cache
            .get_or_load(read_json_or_default(&self.assignments_path))
            .await?;
        let mut updated_assignments = assignments.clone();
        let mut moved = 0;
        for category in updated_assignments.values_mut() {
            if category == old {
                new.clone_into(category);
                moved += 1;
            }
        }

        write_json(&self.categories_path, &updated_categories).await?;
        categories_cache.set(updated_categories);
        write_json(&self.assignments_path, &updated_assignments).await?;
        assignments_cache.set(updated_assignments);

        let style = AnsiColor::Yellow.on_default();
        debug!(
            "{style}renamed category{style:#} {} to {} ({moved} files)",
            format_name(old),
            format_name(new),
        );
        Ok(true)
    }

    /// Removes `name` unless it is a default category or still has files.
    pub async fn delete_category(&self, name: &str) -> Result<bool> {
        if is_default_category(name) {
            return Ok(false);
        }

        // lock order matches rename_category
        let mut cache = self.categories.write().await;
        let mut assignments_cache = self.assignments.write().await;

        let assignments = assignments_cache
            .get_or_load(read_json_or_default(&self.assignments_path))
            .await?;
        if assignments.values().any(|category| category == name) {
            return Ok(false);
        }

        let categories = cache.get_or_load(load_categories(&self.categories_path)).await?;
        if !categories.contains(name) {
            return Ok(false);
        }

        let mut updated = categories.clone();
        updated.remove(name);
        write_json(&self.categories_path, &updated).await?;
        cache.set(updated);

        let style = AnsiColor::Red.on_default();
        debug!("{style}deleted category{style:#} {}", format_name(name));
        Ok(true)
    }

    pub async fn category_for(&self, path: &str) -> Result<Option<String>> {
        let mut cache = self.assignments.write().await;
        let assignments = cache
            .get_or_load(read_json_or_default(&self.assignments_path))
            .await?;
        Ok(assignments.get(path).cloned())
    }

    /// Assigns the file at `path` to `name`, adding the category when no
    /// spelling of it exists yet. Returns the stored spelling.
    pub async fn set_category_for(&self, path: &str, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidCategory(name.to_owned()));
        }

        // held until the assignment is written
        let mut categories_cache = self.categories.write().await;
        let categories = categories_cache
            .get_or_load(load_categories(&self.categories_path))
            .await?;
        let existing = find_ignore_case(categories, name).map(ToOwned::to_owned);
        let name = match existing {
            Some(existing) => existing,
            None => {
                let mut updated = categories.clone();
                updated.insert(name.to_owned());
                write_json(&self.categories_path, &updated).await?;
                categories_cache.set(updated);
                name.to_owned()
            }
        };

        self.update_assignments(|assignments| {
            assignments.insert(path.to_owned(), name.clone());
        })
        .await?;
        Ok(name)
    }

    pub async fn remove_category_for(&self, path: &str) -> Result<()> {
        self.update_assignments(|assignments| {
            assignments.remove(path);
        })
        .await
    }

    pub async fn files_in_category(&self, name: &str) -> Result<Vec<String>> {
        let assignments = self.assignments().await?;
        let paths = assignments
            .into_iter()
            .filter(|(_, category)| category == name)
            .map(|(path, _)| path)
            .collect();
        Ok(paths)
    }

    /// Snapshot of every assignment.
    pub async fn assignments(&self) -> Result<Assignments> {
        let mut cache = self.assignments.write().await;
        let assignments = cache
            .get_or_load(read_json_or_default(&self.assignments_path))
            .await?;
        Ok(assignments.clone())
    }

    /// Forces the next read to go back to disk.
    pub async fn invalidate(&self) {
        self.categories.write().await.invalidate();
        self.assignments.write().await.invalidate();
    }

    async fn update_assignments<F: FnOnce(&mut Assignments)>(&self, update: F) -> Result<()> {
        let mut cache = self.assignments.write().await;
        let assignments = cache
            .get_or_load(read_json_or_default(&self.assignments_path))
            .await?;
        let mut updated = assignments.clone();
        update(&mut updated);
        if updated != *assignments {
            write_json(&self.assignments_path, &updated).await?;
            cache.set(updated);
        }

        Ok(())
    }
}

pub fn is_default_category(name: &str) -> bool {
    DEFAULT_CATEGORIES.contains(&name)
}

pub fn default_category_for_extension(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => return OTHER,
    };

    match extension.as_str() {
        "pdf" | "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" | "txt" => OFFICE,
        "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" => IMAGES,
        "mp4" | "mkv" | "avi" | "mov" | "3gp" | "webm" => VIDEOS,
        "mp3" | "wav" | "m4a" | "aac" | "flac" | "ogg" => AUDIO,
        "zip" | "rar" | "7z" | "tar" | "gz" => ARCHIVES,
        _ => OTHER,
    }
}

fn find_ignore_case<'a>(categories: &'a Categories, name: &str) -> Option<&'a str> {
    let name = name.to_lowercase();
    categories
        .iter()
        .find(|category| category.to_lowercase() == name)
        .map(String::as_str)
}

/// Loads the category set, seeding the defaults on first use.
async fn load_categories(path: &std::path::Path) -> Result<Categories> {
    match read_json::<Categories>(path).await? {
        Some(mut categories) => {
            categories.extend(DEFAULT_CATEGORIES.map(ToOwned::to_owned));
            Ok(categories)
        }
        None => {
            let defaults = DEFAULT_CATEGORIES.map(ToOwned::to_owned).into();
            write_json(path, &defaults).await?;
            Ok(defaults)
        }
    }
}
