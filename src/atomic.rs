use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tempfile::NamedTempFile;

struct FileLock {
    _file: File,
}

impl FileLock {
    fn lock(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        // Blocks until exclusive lock is acquired
        FileExt::lock_exclusive(&file)?;

        Ok(Self { _file: file })
    }
}

/// A file that is only ever replaced whole.
///
/// Writes go to a temporary sibling that is synced and renamed over the
/// target, so readers see either the old or the new contents.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the whole file. A missing file is `Ok(None)`.
    pub fn read(&self) -> io::Result<Option<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        FileExt::lock_shared(&file)?;

        let mut buf = String::new();
        (&file).read_to_string(&mut buf)?;

        Ok(Some(buf))
    }

    pub fn write(&self, contents: &str) -> io::Result<()> {
        let dir = self.dir();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }

        let _lock = FileLock::lock(&self.path)?;

        let mut tmp = match dir.as_os_str().is_empty() {
            true => NamedTempFile::new_in(".")?,
            false => NamedTempFile::new_in(dir)?,
        };

        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)?;

        Ok(())
    }

    /// Deletes the file. Returns `false` if it was already gone.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("absent.ini"));

        assert!(file.read().unwrap().is_none());
        assert!(!file.remove().unwrap());
    }

    #[test]
    fn write_creates_parent_dirs_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("nested").join("settings.ini"));

        file.write("first").unwrap();
        file.write("second").unwrap();

        assert_eq!(file.read().unwrap().as_deref(), Some("second"));

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1, "only the target file should remain");

        assert!(file.remove().unwrap());
        assert!(!file.exists());
    }
}
