use std::io::{self, Write};

use env_logger::{fmt::Formatter, WriteStyle};
use log::{Level, LevelFilter, Record};

// The AWS SDK is chatty at info level; keep it out of normal output.
const QUIET_MODULES: [&str; 3] = ["aws_config", "aws_smithy_runtime", "hyper"];

pub fn init(level: LevelFilter, style: WriteStyle) {
    let mut builder = env_logger::Builder::new();
    builder.format(format).filter_level(level).write_style(style);

    for module in QUIET_MODULES {
        builder.filter_module(module, level.min(LevelFilter::Warn));
    }

    builder.init();
}

pub fn level_from_args(verbose: u8, quiet: u8) -> LevelFilter {
    let verbosity = i16::from(verbose) - i16::from(quiet);
    match verbosity {
        i16::MIN..=-3 => LevelFilter::Off,
        -2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn format(f: &mut Formatter, record: &Record) -> io::Result<()> {
    let args = record.args();
    let level = record.level();
    if let Some(prefix) = level_prefix(level) {
        let style = f.default_level_style(level);
        writeln!(f, "{style}{prefix}{style:#}{args}")
    } else {
        writeln!(f, "{args}")
    }
}

fn level_prefix(level: Level) -> Option<&'static str> {
    match level {
        Level::Debug | Level::Trace | Level::Info => None,
        Level::Warn => Some("warning: "),
        Level::Error => Some("error: "),
    }
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::level_from_args;

    #[test]
    fn verbosity_flags_cancel_out() {
        assert_eq!(level_from_args(0, 0), LevelFilter::Info);
        assert_eq!(level_from_args(2, 1), LevelFilter::Debug);
        assert_eq!(level_from_args(0, 2), LevelFilter::Error);
        assert_eq!(level_from_args(0, 9), LevelFilter::Off);
        assert_eq!(level_from_args(9, 0), LevelFilter::Trace);
    }
}
