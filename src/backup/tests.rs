use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};
use tokio::sync::Notify;
use zip::{write::FileOptions, ZipWriter};

use crate::{
    archive::{Import, Library},
    backup::{BackupEngine, BACKUP_FILE, BACKUP_FOLDER},
    error::{Error, Result},
    paths::DataRoot,
    storage::{BoxedStorage, LocalStorage, RemoteFile, Storage, StorageStats},
};

#[derive(Debug, Default)]
struct Faults {
    lookup: AtomicBool,
    download: AtomicBool,
    delete: AtomicBool,
}

/// Holds the first folder lookup until released.
#[derive(Debug, Default)]
struct Gate {
    used: AtomicBool,
    entered: Notify,
    release: Notify,
}

#[derive(Debug)]
struct TestStorage {
    inner: LocalStorage,
    faults: Arc<Faults>,
    gate: Option<Arc<Gate>>,
}

fn network_error() -> Error {
    Error::other(io::Error::new(io::ErrorKind::ConnectionReset, "network down"))
}

#[async_trait]
impl Storage for TestStorage {
    async fn find_folder(&self, name: &str) -> Result<Option<String>> {
        if let Some(gate) = &self.gate {
            if !gate.used.swap(true, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        if self.faults.lookup.load(Ordering::SeqCst) {
            return Err(network_error());
        }

        self.inner.find_folder(name).await
    }

    async fn create_folder(&self, name: &str) -> Result<String> {
        self.inner.create_folder(name).await
    }

    async fn find_file(&self, folder_id: &str, name: &str) -> Result<Option<RemoteFile>> {
        self.inner.find_file(folder_id, name).await
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile> {
        self.inner.create_file(folder_id, name, bytes).await
    }

    async fn update_file(&self, id: &str, bytes: Vec<u8>) -> Result<RemoteFile> {
        self.inner.update_file(id, bytes).await
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        if self.faults.delete.load(Ordering::SeqCst) {
            return Err(network_error());
        }

        self.inner.delete_file(id).await
    }

    async fn download_file(&self, id: &str) -> Result<Vec<u8>> {
        if self.faults.download.load(Ordering::SeqCst) {
            return Err(network_error());
        }

        self.inner.download_file(id).await
    }

    fn stats(&self) -> StorageStats {
        self.inner.stats()
    }
}

struct Fixture {
    dir: TempDir,
    library: Arc<Library>,
    engine: Arc<BackupEngine>,
    faults: Arc<Faults>,
}

impl Fixture {
    async fn new() -> Self {
        Fixture::with_gate(None).await
    }

    async fn with_gate(gate: Option<Arc<Gate>>) -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sources")).unwrap();
        let (library, engine, faults) = open_device(dir.path(), "device", gate).await;
        Fixture {
            dir,
            library,
            engine,
            faults,
        }
    }

    fn drive(&self) -> PathBuf {
        self.dir.path().join("drive")
    }

    fn slot(&self) -> PathBuf {
        self.drive().join(BACKUP_FOLDER).join(BACKUP_FILE)
    }

    async fn import(&self, name: &str, content: &[u8], category: Option<&str>) {
        let source = self.dir.path().join("sources").join(name);
        fs::write(&source, content).unwrap();
        let outcome = self.library.import(&source, None, category).await.unwrap();
        assert!(matches!(outcome, Import::Saved(_)));
    }

    async fn file_names(&self) -> Vec<String> {
        file_names(&self.library).await
    }
}

async fn open_device(
    base: &Path,
    name: &str,
    gate: Option<Arc<Gate>>,
) -> (Arc<Library>, Arc<BackupEngine>, Arc<Faults>) {
    let library = Arc::new(Library::open(DataRoot::new(base.join(name))).await.unwrap());
    let faults = Arc::new(Faults::default());
    let storage: BoxedStorage = Box::new(TestStorage {
        inner: LocalStorage::new(base.join("drive"), None),
        faults: faults.clone(),
        gate,
    });
    let engine = Arc::new(BackupEngine::new(library.clone(), Arc::new(storage)));
    (library, engine, faults)
}

async fn file_names(library: &Library) -> Vec<String> {
    let mut names = library
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|file| file.name)
        .collect::<Vec<_>>();
    names.sort();
    names
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

#[tokio::test]
async fn backup_then_restore_round_trip() {
    let fixture = Fixture::new().await;
    fixture.import("a.pdf", b"report", None).await;
    fixture.import("b.jpg", b"photo", Some("holiday")).await;
    fixture.library.settings().set_auto_backup(true).await.unwrap();

    let report = fixture.engine.backup().await.unwrap();
    assert!(report.created);
    assert_eq!(report.summary.files, 2 + 4);
    assert!(fixture.slot().is_file());

    // diverge from the backup
    fixture.library.delete("a.pdf").await.unwrap();
    fixture.import("c.txt", b"scratch", None).await;
    assert!(fixture
        .library
        .categories()
        .rename_category("holiday", "trip")
        .await
        .unwrap());

    let restored = fixture.engine.restore().await.unwrap();
    assert_eq!(restored.summary, report.summary);
    assert_eq!(restored.backup.id, report.remote.id);

    assert_eq!(fixture.file_names().await, vec!["a.pdf", "b.jpg"]);
    let archive_dir = fixture.library.root().archive_dir();
    assert_eq!(fs::read(archive_dir.join("a.pdf")).unwrap(), b"report");
    assert_eq!(fs::read(archive_dir.join("b.jpg")).unwrap(), b"photo");
    let categories = fixture.library.categories();
    assert_eq!(
        categories.category_for("archive/b.jpg").await.unwrap().as_deref(),
        Some("holiday")
    );
    assert!(categories.list_categories().await.unwrap().contains("holiday"));
    assert!(!categories.list_categories().await.unwrap().contains("trip"));
    assert!(fixture.library.settings().get().await.unwrap().auto_backup);

    // the restored hash index still catches duplicates
    let source = fixture.dir.path().join("sources/copy.pdf");
    fs::write(&source, b"report").unwrap();
    assert_eq!(
        fixture.library.import(&source, None, None).await.unwrap(),
        Import::Duplicate {
            existing: "a.pdf".to_owned()
        }
    );

    let temp_dir = fixture.library.root().temp_dir();
    assert_eq!(fs::read_dir(temp_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn restore_on_another_device() {
    let fixture = Fixture::new().await;
    fixture.import("notes.txt", b"notes", Some("work")).await;
    fixture.engine.backup().await.unwrap();

    let (library, engine, _) = open_device(fixture.dir.path(), "other-device", None).await;
    engine.restore().await.unwrap();

    assert_eq!(file_names(&library).await, vec!["notes.txt"]);
    let file = library.find("notes.txt").await.unwrap().unwrap();
    assert_eq!(file.category, "work");
}

#[tokio::test]
async fn backups_share_one_slot() {
    let fixture = Fixture::new().await;
    fixture.import("a.txt", b"a", None).await;
    let first = fixture.engine.backup().await.unwrap();

    fixture.import("b.txt", b"b", None).await;
    let second = fixture.engine.backup().await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.remote.id, second.remote.id);
    let folder = fixture.drive().join(BACKUP_FOLDER);
    assert_eq!(fs::read_dir(folder).unwrap().count(), 1);

    let settings = fixture.library.settings().get().await.unwrap();
    assert!(settings.last_backup.is_some());
}

#[tokio::test]
async fn metadata_without_download() {
    let fixture = Fixture::new().await;
    assert_eq!(fixture.engine.metadata().await.unwrap(), None);

    let report = fixture.engine.backup().await.unwrap();
    fixture.faults.download.store(true, Ordering::SeqCst);

    let metadata = fixture.engine.metadata().await.unwrap().unwrap();
    assert_eq!(metadata.id, report.remote.id);
    assert_eq!(metadata.modified, report.remote.modified);
    assert!(metadata.modified_millis() > 0);
}

#[tokio::test]
async fn no_backup_leaves_local_data() {
    let fixture = Fixture::new().await;
    fixture.import("keep.txt", b"keep", None).await;

    let err = fixture.engine.restore().await.unwrap_err();
    assert_eq!(err, Error::NoBackupFound);
    assert_eq!(fixture.file_names().await, vec!["keep.txt"]);

    // folder present, slot missing
    fs::create_dir_all(fixture.drive().join(BACKUP_FOLDER)).unwrap();
    let err = fixture.engine.restore().await.unwrap_err();
    assert_eq!(err, Error::NoBackupFound);
    assert_eq!(fixture.file_names().await, vec!["keep.txt"]);
}

#[tokio::test]
async fn failed_download_leaves_local_data() {
    let fixture = Fixture::new().await;
    fixture.import("old.txt", b"old", None).await;
    fixture.engine.backup().await.unwrap();
    fixture.import("new.txt", b"new", None).await;

    fixture.faults.download.store(true, Ordering::SeqCst);
    let err = fixture.engine.restore().await.unwrap_err();
    assert!(matches!(err, Error::DownloadFailed(_)));
    assert_eq!(fixture.file_names().await, vec!["new.txt", "old.txt"]);

    fixture.faults.download.store(false, Ordering::SeqCst);
    fixture.faults.lookup.store(true, Ordering::SeqCst);
    let err = fixture.engine.restore().await.unwrap_err();
    assert!(matches!(err, Error::DownloadFailed(_)));
    assert_eq!(fixture.file_names().await, vec!["new.txt", "old.txt"]);
}

#[tokio::test]
async fn escaping_entries_are_rejected() {
    let fixture = Fixture::new().await;
    fixture.import("keep.txt", b"keep", None).await;

    write_zip(
        &fixture.slot(),
        &[
            ("archive/innocent.txt", b"hi"),
            ("archive/../../../evil.txt", b"gotcha"),
        ],
    );

    let err = fixture.engine.restore().await.unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)), "{err}");
    assert!(!fixture.dir.path().join("evil.txt").exists());
    assert_eq!(fixture.file_names().await, vec!["keep.txt"]);
}

#[tokio::test]
async fn unreadable_container_is_rejected() {
    let fixture = Fixture::new().await;
    fixture.import("keep.txt", b"keep", None).await;

    fs::create_dir_all(fixture.drive().join(BACKUP_FOLDER)).unwrap();
    for content in [&b""[..], b"PK\x03\x04 truncated"] {
        fs::write(fixture.slot(), content).unwrap();
        let err = fixture.engine.restore().await.unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)), "{err}");
        assert_eq!(fixture.file_names().await, vec!["keep.txt"]);
    }
}

#[tokio::test]
async fn delete_all_removes_both_sides() {
    let fixture = Fixture::new().await;
    fixture.import("a.txt", b"a", Some("custom")).await;
    fixture.engine.backup().await.unwrap();

    let report = fixture.engine.delete_all_data().await.unwrap();
    assert!(report.remote_deleted);
    assert_eq!(report.remote_error, None);
    assert!(fixture.file_names().await.is_empty());
    assert!(!fixture.slot().exists());
    assert_eq!(fixture.engine.metadata().await.unwrap(), None);
    assert!(!fixture
        .library
        .categories()
        .list_categories()
        .await
        .unwrap()
        .contains("custom"));
}

#[tokio::test]
async fn delete_all_wipes_local_when_remote_fails() {
    let fixture = Fixture::new().await;
    fixture.import("a.txt", b"a", None).await;
    fixture.engine.backup().await.unwrap();

    fixture.faults.delete.store(true, Ordering::SeqCst);
    let report = fixture.engine.delete_all_data().await.unwrap();
    assert!(!report.remote_deleted);
    assert!(report.remote_error.is_some());
    assert!(fixture.file_names().await.is_empty());
    assert!(fixture.slot().exists());
}

#[tokio::test]
async fn second_operation_is_turned_away() {
    let gate = Arc::new(Gate::default());
    let fixture = Fixture::with_gate(Some(gate.clone())).await;
    fixture.import("a.txt", b"a", None).await;

    let engine = fixture.engine.clone();
    let running = tokio::spawn(async move { engine.backup().await });
    gate.entered.notified().await;

    assert!(fixture.engine.is_busy());
    assert_eq!(
        fixture.engine.restore().await.unwrap_err(),
        Error::OperationInProgress
    );
    assert_eq!(
        fixture.engine.delete_all_data().await.unwrap_err(),
        Error::OperationInProgress
    );
    assert_eq!(
        fixture.engine.backup().await.unwrap_err(),
        Error::OperationInProgress
    );

    gate.release.notify_one();
    running.await.unwrap().unwrap();
    assert!(!fixture.engine.is_busy());
    assert_eq!(fixture.file_names().await, vec!["a.txt"]);
}
