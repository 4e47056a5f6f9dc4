//! Directory-backed storage: one `<key>.json` file per key

use super::backend::StorageBackend;
use crate::error::{RateError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-per-key backend rooted at a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a storage directory
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(RateError::StorageError(format!("Invalid storage key: '{}'", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl StorageBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so a crash never leaves a half-written document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
