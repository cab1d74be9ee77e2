use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Args, ColorChoice, Subcommand};
use humantime::parse_duration;

use crate::{present::SortOrder, storage::StorageUrl, stores::Theme};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Order of files within each category
    #[arg(short, long, value_enum, default_value_t = SortOrder::DateDesc)]
    pub sort: SortOrder,

    /// Only show files whose name contains this text
    #[arg(short = 'f', long, value_name = "TEXT")]
    pub query: Option<String>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File to copy into the archive
    pub path: PathBuf,

    /// Name to store the file under (defaults to its current name)
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Category to file it under (defaults to one based on the extension)
    #[arg(short, long, value_name = "NAME")]
    pub category: Option<String>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// File(s) to delete
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// File(s) to move
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Category to move them into (created if missing)
    #[arg(short, long, value_name = "NAME")]
    pub category: String,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCommand {
    /// List categories and how many files each one holds
    List,
    /// Add a category
    Add { name: String },
    /// Rename a category, moving its files along
    Rename { old: String, new: String },
    /// Delete an empty, non-default category
    Delete { name: String },
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct WipeArgs {
    /// Confirm deleting all local data and the remote backup
    #[arg(long, default_value_t = false)]
    pub yes: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Turn automatic backups on or off
    #[arg(long, value_name = "BOOL")]
    pub auto_backup: Option<bool>,

    /// Color theme
    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Time between automatic backups
    #[arg(short, long, value_name = "DURATION", default_value = "1day", value_parser = parse_duration)]
    pub interval: Duration,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Data directory holding the archive and its settings
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Storage backend (e.g. 's3://<bucket>' or 'file://<path>')
    #[arg(short = 'S', long, value_name = "URL")]
    pub storage: Option<StorageUrl>,

    /// Add latency when using local storage
    #[arg(short = 'L', long, value_parser = parse_duration)]
    pub latency: Option<Duration>,

    /// Print stats after completion
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// When to use color in output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}
