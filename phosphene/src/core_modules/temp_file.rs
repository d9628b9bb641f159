// THEORY:
// The `temp_file` module owns every file the simulator writes to disk: the
// staged upload and each rendered percept. Nothing else in the crate creates
// files, so the "nothing is left behind" guarantee only has to hold here.
//
// Key architectural principles:
// 1.  **Unique names**: files are created with `tempfile::Builder`, which opens
//     them with create-new semantics. Two concurrent requests can never share a path.
// 2.  **Scoped lifetime**: every created path is wrapped in a `StagedFile` guard.
//     Dropping the guard deletes the file, so early returns, `?` and panics all
//     clean up the same way a normal return does.
// 3.  **Idempotent release**: a file that is already gone counts as released.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const FILE_PREFIX: &str = "phosphene-";

/// Creates uniquely named files inside a single scratch directory.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    /// Directory all staged files are created in.
    root: PathBuf,
}

impl Default for TempFileManager {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl TempFileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` to a fresh file ending in `suffix` and returns its guard.
    pub fn stage(&self, bytes: &[u8], suffix: &str) -> io::Result<StagedFile> {
        let (mut file, staged) = self.create(suffix)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %staged.path().display(), len = bytes.len(), "staged temporary file");
        Ok(staged)
    }

    /// Creates an empty file ending in `suffix`, for a writer that only accepts a path.
    pub fn reserve(&self, suffix: &str) -> io::Result<StagedFile> {
        let (_, staged) = self.create(suffix)?;
        Ok(staged)
    }

    fn create(&self, suffix: &str) -> io::Result<(fs::File, StagedFile)> {
        let named = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.root)?;
        // From here on the guard, not `tempfile`, owns deletion.
        let (file, path) = named.keep().map_err(|e| e.error)?;
        Ok((file, StagedFile { path: Some(path) }))
    }
}

/// Deletes `path`. A missing file is treated as already released.
pub fn release(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// A temporary file that is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct StagedFile {
    path: Option<PathBuf>,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        // Only `release` takes the path, and it consumes `self`.
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Deletes the file now and reports any error other than not-found.
    pub fn release(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => release(&path),
            None => Ok(()),
        }
    }

    /// Deletes the file now; failures are logged, never returned.
    pub fn discard(self) {
        drop(self);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = release(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn stage_writes_bytes_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        let staged = manager.stage(b"hello", ".jpg").unwrap();
        let name = staged.path().file_name().unwrap().to_string_lossy().into_owned();

        assert!(name.starts_with(FILE_PREFIX));
        assert!(name.ends_with(".jpg"));
        assert_eq!(fs::read(staged.path()).unwrap(), b"hello");
    }

    #[test]
    fn dropping_the_guard_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        let path = {
            let staged = manager.stage(b"x", ".png").unwrap();
            staged.path().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn guard_cleans_up_on_early_error_return() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        let failing = || -> io::Result<()> {
            let _staged = manager.stage(b"x", ".png")?;
            Err(io::Error::other("boom"))
        };

        assert!(failing().is_err());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn release_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        let staged = manager.reserve(".png").unwrap();
        fs::remove_file(staged.path()).unwrap();

        assert!(staged.release().is_ok());
        assert!(release(&dir.path().join("never-existed.png")).is_ok());
    }

    #[test]
    fn discard_swallows_removal_failures() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        // A non-empty directory in place of the file makes `remove_file` fail with
        // something other than NotFound.
        let staged = manager.reserve(".png").unwrap();
        let path = staged.path().to_path_buf();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        let err = release(&path).unwrap_err();
        assert_ne!(err.kind(), io::ErrorKind::NotFound);

        staged.discard();
        assert!(path.exists());
        fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());

        let files: Vec<_> = (0..16).map(|_| manager.reserve(".png").unwrap()).collect();
        let mut paths: Vec<_> = files.iter().map(|f| f.path().to_path_buf()).collect();
        paths.sort();
        paths.dedup();

        assert_eq!(paths.len(), 16);
        drop(files);
        assert_eq!(entries(dir.path()), 0);
    }
}
