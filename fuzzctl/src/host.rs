//! Local host capabilities: filesystem access and console output.
//!
//! The engine depends only on these interfaces; the real implementations
//! are backed by std::fs and stdout, the test ones are in-memory.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

pub trait FileStore {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    /// Sorted listing of regular files directly under `path`.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    /// Create a fresh directory for scoped staging; the caller removes it.
    fn create_temp_dir(&self) -> io::Result<PathBuf>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

pub struct OsFileStore;

impl FileStore for OsFileStore {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries.push(entry.path());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn create_temp_dir(&self) -> io::Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix("fuzzctl-").tempdir()?;
        Ok(dir.into_path())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}

/// Line-oriented report sink. Status reports are part of the tool's
/// script-facing contract, so they go through here rather than the logger.
pub struct Console {
    buffer: Option<RefCell<Vec<String>>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self { buffer: None }
    }

    /// Capture lines instead of printing them.
    pub fn buffered() -> Self {
        Self {
            buffer: Some(RefCell::new(Vec::new())),
        }
    }

    pub fn echo(&self, line: impl AsRef<str>) {
        match &self.buffer {
            Some(buffer) => buffer.borrow_mut().push(line.as_ref().to_string()),
            None => println!("{}", line.as_ref()),
        }
    }

    /// Drain captured lines. Empty for a stdout console.
    pub fn take(&self) -> Vec<String> {
        match &self.buffer {
            Some(buffer) => buffer.replace(Vec::new()),
            None => Vec::new(),
        }
    }
}
