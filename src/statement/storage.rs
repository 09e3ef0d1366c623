//! The directory where uploaded statement files are kept.

use std::{
    collections::HashSet,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::Error;

/// The subdirectory that holds uploads which have not been committed yet.
const STAGING_DIR_NAME: &str = ".staging";

/// A flat directory of statement files, one per statement row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementStorage {
    dir: PathBuf,
}

/// Files found in the storage directory that no statement refers to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrphanReport {
    /// The number of unfinished uploads removed from the staging directory.
    pub removed_staging_files: usize,
    /// File names in the storage directory with no matching statement.
    pub orphaned_files: Vec<String>,
}

impl StatementStorage {
    /// Create a handle to the storage directory `dir`.
    ///
    /// The directory is not created until the first upload.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the stored file `filename`.
    ///
    /// Only the final component of `filename` is used, so the path never
    /// leaves the storage directory.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        let file_name = Path::new(filename)
            .file_name()
            .unwrap_or_default();

        self.dir.join(file_name)
    }

    fn staging_dir(&self) -> PathBuf {
        self.dir.join(STAGING_DIR_NAME)
    }

    /// Create the storage directory, and any missing parents, if needed.
    ///
    /// On unix the directories are created with mode 0755.
    pub fn ensure_dir(&self) -> Result<(), Error> {
        create_dir(&self.dir)?;
        create_dir(&self.staging_dir())
    }

    /// Write `bytes` to a staging file that becomes `filename` once committed.
    ///
    /// The staging file is removed if the returned [StagedFile] is dropped
    /// without being committed.
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedFile, Error> {
        self.ensure_dir()?;

        let staging_path = self.staging_dir().join(filename);
        let mut file = fs::File::create(&staging_path)?;
        let staged = StagedFile {
            staging_path,
            final_path: self.path_for(filename),
            is_committed: false,
        };

        file.write_all(bytes)?;
        file.sync_all()?;

        Ok(staged)
    }

    /// Delete the stored file `filename`.
    ///
    /// Returns `false` if there was no such file.
    pub fn remove(&self, filename: &str) -> Result<bool, Error> {
        match fs::remove_file(self.path_for(filename)) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Remove leftover staging files and list stored files that are not in
    /// `known_filenames`.
    ///
    /// Orphaned files are only reported, never deleted.
    pub fn scan(&self, known_filenames: &HashSet<String>) -> Result<OrphanReport, Error> {
        let mut report = OrphanReport::default();

        if !self.dir.is_dir() {
            return Ok(report);
        }

        report.removed_staging_files = self.clean_staging()?;

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;

            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !known_filenames.contains(&file_name) {
                report.orphaned_files.push(file_name);
            }
        }

        report.orphaned_files.sort();

        Ok(report)
    }

    fn clean_staging(&self) -> Result<usize, Error> {
        let staging_dir = self.staging_dir();

        if !staging_dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&staging_dir)? {
            let path = entry?.path();

            if path.is_file() {
                fs::remove_file(&path)?;
                tracing::info!("removed unfinished upload {}", path.display());
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(unix)]
fn create_dir(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)
        .map_err(Error::from)
}

#[cfg(not(unix))]
fn create_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path).map_err(Error::from)
}

/// An uploaded file that has been written to the staging directory but not
/// moved into the storage directory yet.
#[derive(Debug)]
pub struct StagedFile {
    staging_path: PathBuf,
    final_path: PathBuf,
    is_committed: bool,
}

impl StagedFile {
    /// Move the file into the storage directory.
    pub fn commit(mut self) -> Result<PathBuf, Error> {
        fs::rename(&self.staging_path, &self.final_path)?;
        self.is_committed = true;

        Ok(self.final_path.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.is_committed {
            return;
        }

        match fs::remove_file(&self.staging_path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => tracing::error!(
                "could not remove staging file {}: {error}",
                self.staging_path.display()
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, fs};

    use tempfile::tempdir;

    use crate::test_utils::test_storage;

    #[test]
    fn ensure_dir_creates_missing_directories() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());

        storage.ensure_dir().unwrap();

        assert!(storage.dir().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn storage_directory_has_mode_755() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());

        storage.ensure_dir().unwrap();

        let mode = fs::metadata(storage.dir()).unwrap().permissions().mode();
        // The process umask can only remove bits.
        assert_eq!(mode & 0o777 & !0o755, 0);
        assert_eq!(mode & 0o700, 0o700);
    }

    #[test]
    fn committed_file_is_moved_into_place() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());

        let staged = storage.stage("a-000000000000.csv", b"a,b").unwrap();
        let path = staged.commit().unwrap();

        assert_eq!(path, storage.path_for("a-000000000000.csv"));
        assert_eq!(fs::read(&path).unwrap(), b"a,b");
        assert_eq!(
            fs::read_dir(storage.dir().join(".staging")).unwrap().count(),
            0
        );
    }

    #[test]
    fn dropped_staged_file_is_removed() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());

        let staged = storage.stage("a-000000000000.csv", b"a,b").unwrap();
        drop(staged);

        assert!(!storage.path_for("a-000000000000.csv").exists());
        assert_eq!(
            fs::read_dir(storage.dir().join(".staging")).unwrap().count(),
            0
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        storage.ensure_dir().unwrap();
        fs::write(storage.path_for("x-abc123456789.csv"), "a,b").unwrap();

        assert_eq!(storage.remove("x-abc123456789.csv"), Ok(true));
        assert_eq!(storage.remove("x-abc123456789.csv"), Ok(false));
    }

    #[test]
    fn path_stays_inside_storage_directory() {
        let storage = test_storage(std::path::Path::new("/data"));

        assert_eq!(
            storage.path_for("../../etc/passwd"),
            std::path::Path::new("/data/statements/passwd")
        );
    }

    #[test]
    fn scan_reports_orphans_and_cleans_staging() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        storage.ensure_dir().unwrap();
        fs::write(storage.path_for("kept-000000000000.csv"), "a").unwrap();
        fs::write(storage.path_for("orphan-000000000000.pdf"), "b").unwrap();
        fs::write(storage.dir().join(".staging/half-000000000000.csv"), "c").unwrap();
        let known = HashSet::from(["kept-000000000000.csv".to_owned()]);

        let report = storage.scan(&known).unwrap();

        assert_eq!(report.removed_staging_files, 1);
        assert_eq!(report.orphaned_files, ["orphan-000000000000.pdf"]);
        assert!(storage.path_for("orphan-000000000000.pdf").exists());
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());

        let report = storage.scan(&HashSet::new()).unwrap();

        assert_eq!(report, Default::default());
    }
}
