//! File system blob store for the local snapshot cache

use enroll_core::error::{EnrollError, Result};
use enroll_core::store::BlobStore;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON file per key inside a cache directory
pub struct FileBlobStore {
    /// Cache directory
    dir: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { dir: dir.into() };
        store.ensure_dir()?;
        Ok(store)
    }

    /// Create store with default directory (platform data dir, else ~/.workshop-enroll)
    pub fn default_location() -> Result<Self> {
        Self::new(Self::default_dir())
    }

    /// Default cache directory
    pub fn default_dir() -> PathBuf {
        directories::ProjectDirs::from("com", "workshop-enroll", "workshop-enroll")
            .map(|dirs| dirs.data_dir().join("cache"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".workshop-enroll")
                    .join("cache")
            })
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                EnrollError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create cache directory: {}", e),
                ))
            })?;
            debug!("Created cache directory: {:?}", self.dir);
        }
        Ok(())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(EnrollError::Io(e).with_context(format!("Failed to read cache blob {}", key)))
            }
        }
    }

    /// Write to a temp file, then rename over the final path
    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_dir()?;
        let temp_path = self.temp_path(key);
        let final_path = self.blob_path(key);

        let temp_file = fs::File::create(&temp_path).map_err(|e| {
            EnrollError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create temp file: {}", e),
            ))
        })?;
        let mut writer = BufWriter::new(temp_file);
        writer.write_all(value.as_bytes())?;
        writer.flush()?;
        drop(writer);

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            EnrollError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to rename temp file: {}", e),
            ))
        })?;

        debug!("Wrote cache blob {} to {:?}", key, final_path);
        Ok(())
    }
}
