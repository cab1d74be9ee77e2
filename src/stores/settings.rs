use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::Result, paths::DataRoot};

use super::{read_json_or_default, write_json, Cached, StoreFile};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_backup: bool,
    pub theme: Theme,
    pub last_backup: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<Cached<Settings>>,
}

impl SettingsStore {
    pub fn new(root: &DataRoot) -> Self {
        SettingsStore {
            path: root.store_path(StoreFile::Settings),
            settings: RwLock::new(Cached::new()),
        }
    }

    pub async fn get(&self) -> Result<Settings> {
        let mut cache = self.settings.write().await;
        let settings = cache.get_or_load(read_json_or_default(&self.path)).await?;
        Ok(settings.clone())
    }

    pub async fn set_auto_backup(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.auto_backup = enabled).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.update(|settings| settings.theme = theme).await
    }

    pub async fn record_backup(&self, time: DateTime<Utc>) -> Result<()> {
        self.update(|settings| settings.last_backup = Some(time)).await
    }

    pub async fn invalidate(&self) {
        self.settings.write().await.invalidate();
    }

    async fn update<F: FnOnce(&mut Settings)>(&self, update: F) -> Result<()> {
        let mut cache = self.settings.write().await;
        let settings = cache.get_or_load(read_json_or_default(&self.path)).await?;
        let mut updated = settings.clone();
        update(&mut updated);
        write_json(&self.path, &updated).await?;
        cache.set(updated);
        Ok(())
    }
}
