use std::{borrow::Cow, path::Path};

use chrono::{DateTime, Local, Utc};
use humansize::{ToF64, Unsigned, DECIMAL};

pub fn format_path(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    format_name(&path_str)
}

pub fn format_name(name: &str) -> String {
    if let Cow::Owned(escaped) = snailquote::escape(name) {
        escaped
    } else {
        name.to_owned()
    }
}

pub fn format_size<T: ToF64 + Unsigned>(input: T) -> String {
    humansize::format_size(input, DECIMAL)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
