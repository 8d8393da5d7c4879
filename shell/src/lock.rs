use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::ShellError;

/// Marks a device as taken by this process; removed again on drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn acquire(path: &Path, name: &str) -> Result<Self, ShellError> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ShellError::AlreadyOpen {
                    name: name.to_string(),
                    lock: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ShellError::Open {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let lock = Self {
            path: path.to_path_buf(),
        };

        writeln!(file, "locked by PID {}", std::process::id())?;
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Failed to remove lock {}: {}", self.path.display(), e);
            }
        }
    }
}
