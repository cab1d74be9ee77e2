use clap::builder::styling::AnsiColor;
use log::{info, warn};

use crate::{
    archive::Import,
    error::Result,
    format::{format_name, format_path, format_size, format_time},
    present::{arrange, category_order, filter_files, ListItem},
};

use super::{common::open_library, print_stat, DeleteArgs, ImportArgs, ListArgs, MoveArgs};

pub async fn list(args: ListArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let categories = library.categories().list_categories().await?;

    let mut files = library.list().await?;
    if let Some(query) = &args.query {
        files = filter_files(files, query);
    }

    let file_count = files.len();
    let total_size = files.iter().map(|file| file.size).sum::<u64>();
    let order = category_order(&categories);

    for item in arrange(files, args.sort, &order) {
        match item {
            ListItem::Header(category) => {
                let style = AnsiColor::BrightMagenta.on_default();
                info!("{style}{category}{style:#}");
            }
            ListItem::File(file) => {
                let time_style = AnsiColor::Blue.on_default();
                info!(
                    "  {time_style}{}{time_style:#} {} ({})",
                    format_time(&file.modified),
                    format_name(&file.name),
                    format_size(file.size),
                );
            }
        }
    }

    if args.global.stats {
        print_stat("files", file_count);
        print_stat("total size", format_size(total_size));
    }

    Ok(())
}

pub async fn import(args: ImportArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let outcome = library
        .import(&args.path, args.name.as_deref(), args.category.as_deref())
        .await?;

    match outcome {
        Import::Saved(file) => {
            let style = AnsiColor::Green.on_default();
            info!(
                "{style}imported{style:#} {} into {}",
                format_name(&file.name),
                format_name(&file.category),
            );
        }
        Import::Duplicate { existing } => {
            warn!(
                "{} is already archived as {}",
                format_path(&args.path),
                format_name(&existing),
            );
        }
    }

    Ok(())
}

pub async fn delete(args: DeleteArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let mut deleted = 0;

    for name in &args.names {
        if library.delete(name).await? {
            let style = AnsiColor::Red.on_default();
            info!("{style}deleted{style:#} {}", format_name(name));
            deleted += 1;
        } else {
            warn!("no file named {}", format_name(name));
        }
    }

    if args.global.stats {
        print_stat("files deleted", deleted);
    }

    Ok(())
}

pub async fn move_files(args: MoveArgs) -> Result<()> {
    let library = open_library(&args.global).await?;
    let mut moved = 0;

    for name in &args.names {
        match library.move_to_category(name, &args.category).await? {
            Some(file) => {
                let style = AnsiColor::Yellow.on_default();
                info!(
                    "{style}moved{style:#} {} to {}",
                    format_name(&file.name),
                    format_name(&file.category),
                );
                moved += 1;
            }
            None => warn!("no file named {}", format_name(name)),
        }
    }

    if args.global.stats {
        print_stat("files moved", moved);
    }

    Ok(())
}
