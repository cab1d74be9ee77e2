use log::info;

use crate::{error::Result, format::format_time};

use super::{common::open_library, print_stat, SettingsArgs};

pub async fn main(args: SettingsArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let settings = library.settings();

    if let Some(enabled) = args.auto_backup {
        settings.set_auto_backup(enabled).await?;
        info!("automatic backup {}", if enabled { "on" } else { "off" });
    }

    if let Some(theme) = args.theme {
        settings.set_theme(theme).await?;
        info!("theme set to {theme}");
    }

    if args.auto_backup.is_none() && args.theme.is_none() {
        let current = settings.get().await?;
        print_stat("auto backup", current.auto_backup);
        print_stat("theme", current.theme);
        let last_backup = current
            .last_backup
            .as_ref()
            .map_or_else(|| "never".to_owned(), format_time);
        print_stat("last backup", last_backup);
    }

    Ok(())
}
