use std::collections::BTreeMap;

use clap::builder::styling::AnsiColor;
use log::{info, warn};

use crate::{
    error::Result,
    format::format_name,
    present::category_order,
    stores::is_default_category,
};

use super::{common::open_library, CategoriesArgs, CategoriesCommand};

pub async fn main(args: CategoriesArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let categories = library.categories();

    match args.command {
        CategoriesCommand::List => {
            let mut counts = BTreeMap::<String, usize>::new();
            for file in library.list().await? {
                *counts.entry(file.category).or_default() += 1;
            }

            for name in category_order(&categories.list_categories().await?) {
                let count = counts.get(&name).copied().unwrap_or(0);
                let style = AnsiColor::BrightMagenta.on_default();
                let marker = if is_default_category(&name) { "" } else { " *" };
                info!("{style}{name}{style:#}{marker} ({count} files)");
            }
        }
        CategoriesCommand::Add { name } => {
            if categories.add_category(&name).await? {
                info!("added {}", format_name(&name));
            } else {
                warn!("{} already exists", format_name(&name));
            }
        }
        CategoriesCommand::Rename { old, new } => {
            if categories.rename_category(&old, &new).await? {
                info!("renamed {} to {}", format_name(&old), format_name(&new));
            } else {
                warn!(
                    "couldn't rename {}: it is missing or {} is taken",
                    format_name(&old),
                    format_name(&new),
                );
            }
        }
        CategoriesCommand::Delete { name } => {
            if categories.delete_category(&name).await? {
                info!("deleted {}", format_name(&name));
            } else if is_default_category(&name) {
                warn!("{} is a default category", format_name(&name));
            } else {
                warn!("{} is missing or still has files", format_name(&name));
            }
        }
    }

    Ok(())
}
