//! Guards deleting temporary files and directories when dropped.

use gizmos_core::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PREFIX: &str = "gizmos-";
const CREATE_ATTEMPTS: usize = 8;

/// Deletes a file when dropped, including during a panic
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl TempFileGuard {
    /// Guard an existing (or soon to be created) file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cleanup_on_drop: true,
        }
    }

    /// Create a new empty file in the system temp directory
    pub fn create() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempfile()
            .map_err(|e| Error::file_system(std::env::temp_dir(), "create temporary file", e))?;
        let (_, path) = file.keep().map_err(|e| {
            let path = e.file.path().to_path_buf();
            Error::file_system(path, "persist temporary file", e.error)
        })?;
        tracing::trace!(path = %path.display(), "created temporary file");
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file after the guard is dropped
    pub fn keep(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

/// Deletes a directory and everything in it when dropped
#[derive(Debug)]
pub struct TempDirGuard {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl TempDirGuard {
    /// Create the directory at `path` (and its parents) and guard it
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)
            .map_err(|e| Error::file_system(path.clone(), "create temporary directory", e))?;
        Ok(Self {
            path,
            cleanup_on_drop: true,
        })
    }

    /// Create a uniquely named directory in the system temp directory
    pub fn create() -> Result<Self> {
        let base = std::env::temp_dir();
        let mut last_error = None;
        for _ in 0..CREATE_ATTEMPTS {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(10)
                .map(char::from)
                .collect();
            let path = base.join(format!("{PREFIX}{suffix}"));
            match fs::create_dir(&path) {
                Ok(()) => {
                    tracing::trace!(path = %path.display(), "created temporary directory");
                    return Ok(Self {
                        path,
                        cleanup_on_drop: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_error = Some(e),
                Err(e) => return Err(Error::file_system(path, "create temporary directory", e)),
            }
        }
        Err(Error::file_system(
            base,
            "create temporary directory",
            last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory after the guard is dropped
    pub fn keep(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temporary directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_temp_file_guard_removes_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        {
            File::create(&file_path).unwrap();
            let _guard = TempFileGuard::new(&file_path);
            assert!(file_path.exists());
        }

        assert!(!file_path.exists());
    }

    #[test]
    fn test_temp_file_guard_keep() {
        let guard = TempFileGuard::create().unwrap();
        assert!(guard.path().exists());

        let kept = guard.keep();
        assert!(kept.exists());
        fs::remove_file(kept).unwrap();
    }

    #[test]
    fn test_temp_dir_guard_removes_contents() {
        let path = {
            let guard = TempDirGuard::create().unwrap();
            fs::write(guard.path().join("nested.txt"), "content").unwrap();
            assert!(guard
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX)));
            guard.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_temp_dir_guard_keep() {
        let temp_dir = tempdir().unwrap();
        let dir_path = temp_dir.path().join("kept/inner");

        let kept = TempDirGuard::new(&dir_path).unwrap().keep();
        assert_eq!(kept, dir_path);
        assert!(dir_path.exists());
    }
}
