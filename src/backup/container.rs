//! The backup container: a deflated ZIP with an `archive/` region holding
//! every archived file and a `prefs/` region holding the store files.
//!
//! Everything here is blocking and meant to run under `spawn_blocking`.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};

use log::warn;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    error::{Error, Result},
    format::format_path,
    paths::{relative_components, validate_file_name, ARCHIVE_DIR, PREFS_DIR},
    stores::StoreFile,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerSummary {
    pub files: u64,
    pub bytes: u64,
}

/// A validated container entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    File(String),
    Store(StoreFile),
}

impl Entry {
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Entry::File(name) => Path::new(ARCHIVE_DIR).join(name),
            Entry::Store(store) => Path::new(PREFS_DIR).join(store.file_name()),
        }
    }

    fn zip_name(&self) -> String {
        match self {
            Entry::File(name) => format!("{ARCHIVE_DIR}/{name}"),
            Entry::Store(store) => format!("{PREFS_DIR}/{}", store.file_name()),
        }
    }
}

pub fn pack(archive_dir: &Path, prefs_dir: &Path, dest: &Path) -> Result<ContainerSummary> {
    let mut writer = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = ContainerSummary::default();

    let mut entries = vec![];
    match fs::read_dir(archive_dir) {
        Ok(dir) => {
            for dir_entry in dir {
                let dir_entry = dir_entry?;
                if !dir_entry.file_type()?.is_file() {
                    continue;
                }

                match dir_entry.file_name().into_string() {
                    Ok(name) => entries.push((Entry::File(name), dir_entry.path())),
                    Err(_) => warn!("skipped file {}", format_path(&dir_entry.path())),
                }
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    for store in StoreFile::ALL {
        let path = prefs_dir.join(store.file_name());
        if path.is_file() {
            entries.push((Entry::Store(store), path));
        }
    }

    for (entry, path) in entries {
        writer.start_file(entry.zip_name(), options)?;
        let mut reader = BufReader::new(File::open(&path)?);
        summary.bytes += io::copy(&mut reader, &mut writer)?;
        summary.files += 1;
    }

    let mut inner = writer.finish()?;
    io::Write::flush(&mut inner)?;
    Ok(summary)
}

/// Checks every entry name without extracting anything.
pub fn validate(container: &Path) -> Result<Vec<Entry>> {
    let file = File::open(container)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::ValidationFailed("container is empty".to_owned()));
    }

    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|err| Error::ValidationFailed(format!("container is unreadable ({err})")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .map_err(|err| Error::ValidationFailed(format!("entry {index} is unreadable ({err})")))?;
        if let Some(entry) = parse_entry(file.name(), file.is_dir())? {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Extracts a container into `dest_root`, which receives fresh `archive/`
/// and `prefs/` directories.
pub fn unpack(container: &Path, dest_root: &Path) -> Result<ContainerSummary> {
    validate(container)?;

    fs::create_dir_all(dest_root.join(ARCHIVE_DIR))?;
    fs::create_dir_all(dest_root.join(PREFS_DIR))?;

    let mut archive = ZipArchive::new(BufReader::new(File::open(container)?))?;
    let mut summary = ContainerSummary::default();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let Some(entry) = parse_entry(file.name(), file.is_dir())? else {
            continue;
        };

        let path = dest_root.join(entry.relative_path());
        let mut writer = BufWriter::new(File::create(&path)?);
        summary.bytes += io::copy(&mut file, &mut writer)?;
        io::Write::flush(&mut writer)?;
        summary.files += 1;
    }

    Ok(summary)
}

/// Maps an entry name to where it will land. Bare region directories are
/// accepted and skipped; anything else outside the two regions is rejected.
fn parse_entry(name: &str, is_dir: bool) -> Result<Option<Entry>> {
    let invalid = |reason: &str| Err(Error::ValidationFailed(format!("entry `{name}` {reason}")));

    let Some(components) = relative_components(name) else {
        return invalid("escapes the data root");
    };

    match components[..] {
        [region] if is_dir && (region == ARCHIVE_DIR || region == PREFS_DIR) => Ok(None),
        [ARCHIVE_DIR, file_name] if !is_dir => match validate_file_name(file_name) {
            Ok(file_name) => Ok(Some(Entry::File(file_name.to_owned()))),
            Err(_) => invalid("has an invalid file name"),
        },
        [PREFS_DIR, file_name] if !is_dir => match StoreFile::from_file_name(file_name) {
            Some(store) => Ok(Some(Entry::Store(store))),
            None => invalid("is not a known store"),
        },
        _ => invalid("is outside the archive and prefs regions"),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write, path::Path};

    use tempfile::tempdir;
    use zip::{write::FileOptions, ZipWriter};

    use super::{pack, unpack, validate, ContainerSummary, Entry};
    use crate::{error::Error, stores::StoreFile};

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn pack_then_unpack() {
        let dir = tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        let prefs_dir = dir.path().join("prefs");
        fs::create_dir_all(archive_dir.join("nested")).unwrap();
        fs::create_dir_all(&prefs_dir).unwrap();
        fs::write(archive_dir.join("a.pdf"), b"pdf bytes").unwrap();
        fs::write(archive_dir.join("b.jpg"), b"jpg").unwrap();
        fs::write(archive_dir.join("nested/skipped.txt"), b"x").unwrap();
        fs::write(prefs_dir.join("settings.json"), b"{}").unwrap();
        fs::write(prefs_dir.join("unrelated.json"), b"{}").unwrap();

        let container = dir.path().join("backup.zip");
        let summary = pack(&archive_dir, &prefs_dir, &container).unwrap();
        assert_eq!(summary, ContainerSummary { files: 3, bytes: 14 });

        let mut entries = validate(&container).unwrap();
        entries.sort_by_key(|entry| entry.relative_path());
        assert_eq!(
            entries,
            vec![
                Entry::File("a.pdf".to_owned()),
                Entry::File("b.jpg".to_owned()),
                Entry::Store(StoreFile::Settings),
            ]
        );

        let staging = dir.path().join("staging");
        unpack(&container, &staging).unwrap();
        assert_eq!(fs::read(staging.join("archive/a.pdf")).unwrap(), b"pdf bytes");
        assert_eq!(fs::read(staging.join("prefs/settings.json")).unwrap(), b"{}");
        assert!(!staging.join("archive/nested").exists());
    }

    #[test]
    fn empty_data_packs_to_a_valid_container() {
        let dir = tempdir().unwrap();
        let container = dir.path().join("backup.zip");
        let summary = pack(&dir.path().join("missing"), dir.path(), &container).unwrap();
        assert_eq!(summary, ContainerSummary::default());
        assert!(validate(&container).unwrap().is_empty());
    }

    #[test]
    fn rejects_escaping_entries() {
        let dir = tempdir().unwrap();
        for name in [
            "../evil.txt",
            "archive/../../evil.txt",
            "/etc/evil",
            "archive\\..\\evil",
            "archive/nested/file.txt",
            "other/file.txt",
            "prefs/unknown.json",
            "top.txt",
        ] {
            let container = dir.path().join("bad.zip");
            write_zip(&container, &[("archive/ok.txt", b"ok"), (name, b"bad")]);

            let err = validate(&container).unwrap_err();
            assert!(matches!(err, Error::ValidationFailed(_)), "{name}: {err}");

            let staging = dir.path().join("staging");
            assert!(unpack(&container, &staging).is_err());
            assert!(!staging.exists(), "{name}");
        }

        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn rejects_empty_and_garbage() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.zip");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(validate(&empty), Err(Error::ValidationFailed(_))));

        let garbage = dir.path().join("garbage.zip");
        fs::write(&garbage, b"definitely not a zip file").unwrap();
        assert!(matches!(validate(&garbage), Err(Error::ValidationFailed(_))));
    }
}
