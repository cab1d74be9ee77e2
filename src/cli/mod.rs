mod args;
mod backup;
mod categories;
mod common;
mod files;
mod settings;

use std::{fmt::Display, process::ExitCode};

use clap::{
    builder::{styling::AnsiColor, Styles},
    ColorChoice, Parser, Subcommand,
};
use env_logger::WriteStyle;
use log::{error, info};

use crate::logger;

pub use self::args::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List archived files by category
    List(ListArgs),
    /// Copy a file into the archive
    Import(ImportArgs),
    /// Delete archived files
    Delete(DeleteArgs),
    /// Move archived files to another category
    Move(MoveArgs),
    /// Manage categories
    Categories(CategoriesArgs),
    /// Upload all data to the backup slot
    Backup(BackupArgs),
    /// Replace all local data with the backup
    Restore(RestoreArgs),
    /// Show local and remote state
    Status(StatusArgs),
    /// Delete all local data and the remote backup
    Wipe(WipeArgs),
    /// Show or change settings
    Settings(SettingsArgs),
    /// Back up periodically until interrupted
    Schedule(ScheduleArgs),
}

impl Command {
    fn global(&self) -> &GlobalArgs {
        match self {
            Command::List(args) => &args.global,
            Command::Import(args) => &args.global,
            Command::Delete(args) => &args.global,
            Command::Move(args) => &args.global,
            Command::Categories(args) => &args.global,
            Command::Backup(args) => &args.global,
            Command::Restore(args) => &args.global,
            Command::Status(args) => &args.global,
            Command::Wipe(args) => &args.global,
            Command::Settings(args) => &args.global,
            Command::Schedule(args) => &args.global,
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(&cli.command.global().logger);

    let result = match cli.command {
        Command::List(args) => files::list(args).await,
        Command::Import(args) => files::import(args).await,
        Command::Delete(args) => files::delete(args).await,
        Command::Move(args) => files::move_files(args).await,
        Command::Categories(args) => categories::main(args).await,
        Command::Backup(args) => backup::backup(args).await,
        Command::Restore(args) => backup::restore(args).await,
        Command::Status(args) => backup::status(args).await,
        Command::Wipe(args) => backup::wipe(args).await,
        Command::Settings(args) => settings::main(args).await,
        Command::Schedule(args) => backup::schedule(args).await,
    };

    if let Err(err) = result {
        error!("{err}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logger(args: &LoggerArgs) {
    let level = logger::level_from_args(args.verbose, args.quiet);
    let style = match args.color {
        ColorChoice::Auto => WriteStyle::Auto,
        ColorChoice::Always => WriteStyle::Always,
        ColorChoice::Never => WriteStyle::Never,
    };
    logger::init(level, style);
}

fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::Cyan.on_default();
    info!("{style}{name}:{style:#} {value}");
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}
