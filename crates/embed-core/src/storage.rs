//! Backing storage for the document record.
//!
//! The store persists one text artifact. [`Backing`] abstracts where it
//! lives so the store can be exercised without touching the filesystem.
//!
//! | Backing | Artifact | Use |
//! |---------|----------|-----|
//! | [`FileBacking`] | one JSON file | production |
//! | [`MemBacking`]* | shared `String` slot | tests |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.

use std::io;
use std::path::{Path, PathBuf};

/// Read and overwrite a single persisted artifact.
pub trait Backing: Send + Sync + 'static {
    /// `Ok(None)` when the artifact does not exist yet.
    fn read(&self) -> io::Result<Option<String>>;

    /// Replace the whole artifact.
    fn write(&self, contents: &str) -> io::Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A JSON file on disk.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the target,
/// so a crash mid-write leaves the previous contents readable.
#[derive(Debug, Clone)]
pub struct FileBacking {
    path: PathBuf,
}

impl FileBacking {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Backing for FileBacking {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use mem::MemBacking;

#[cfg(any(test, feature = "test-support"))]
mod mem {
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::Backing;

    /// In-memory artifact. Clones share the same slot, so a test can keep a
    /// handle after moving one into a store.
    #[derive(Clone, Default)]
    pub struct MemBacking {
        contents: Arc<Mutex<Option<String>>>,
        fail_reads: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl MemBacking {
        pub fn new() -> Self {
            Self::default()
        }

        /// Start with an existing artifact.
        pub fn with_contents(contents: impl Into<String>) -> Self {
            let backing = Self::new();
            *backing.contents.lock().unwrap() = Some(contents.into());
            backing
        }

        pub fn contents(&self) -> Option<String> {
            self.contents.lock().unwrap().clone()
        }

        /// Number of successful writes so far.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl Backing for MemBacking {
        fn read(&self) -> io::Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused"));
            }
            Ok(self.contents.lock().unwrap().clone())
        }

        fn write(&self, contents: &str) -> io::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
            }
            *self.contents.lock().unwrap() = Some(contents.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_backing_missing_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backing = FileBacking::new(dir.path().join("embeds.json"));
        assert!(backing.read().unwrap().is_none());
    }

    #[test]
    fn test_file_backing_creates_parent_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("embeds.json");
        let backing = FileBacking::new(&path);

        backing.write("{}").unwrap();
        assert_eq!(backing.read().unwrap().as_deref(), Some("{}"));
        assert!(!path.with_file_name("embeds.json.tmp").exists());
    }

    #[test]
    fn test_file_backing_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backing = FileBacking::new(dir.path().join("embeds.json"));
        backing.write("v1").unwrap();
        backing.write("v2").unwrap();
        assert_eq!(backing.read().unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_mem_backing_shared_between_clones() {
        let backing = MemBacking::new();
        let handle = backing.clone();
        backing.write("data").unwrap();
        assert_eq!(handle.contents().as_deref(), Some("data"));
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_mem_backing_failures() {
        let backing = MemBacking::with_contents("x");
        backing.set_fail_reads(true);
        backing.set_fail_writes(true);
        assert!(backing.read().is_err());
        assert!(backing.write("y").is_err());
        assert_eq!(backing.contents().as_deref(), Some("x"));
        assert_eq!(backing.write_count(), 0);
    }
}
