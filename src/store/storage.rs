//! Non-volatile storage backends
//!
//! The store only needs "read the whole image" and "write the whole
//! image"; anything that can do that (a file, a flash page, a key-value
//! blob) satisfies [`NvStorage`]. Writes happen synchronously inside
//! store mutations, so the trait is synchronous by design.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Whole-image persistence contract.
pub trait NvStorage {
    /// Read the stored image, or `None` if nothing has been written yet.
    fn load(&mut self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored image.
    fn store(&mut self, image: &[u8]) -> Result<()>;
}

/// File-backed storage.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvStorage for FileStorage {
    fn load(&mut self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("failed to read config image: {}", self.path.display())
            }),
        }
    }

    fn store(&mut self, image: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, image)
            .with_context(|| format!("failed to write config image: {}", self.path.display()))
    }
}

/// In-memory storage for tests and embedding.
#[derive(Default)]
pub struct MemStorage {
    image: Option<Vec<u8>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out holding a pre-existing image.
    pub fn with_image(image: Vec<u8>) -> Self {
        Self { image: Some(image) }
    }

    /// Inspect the last written image.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }
}

impl NvStorage for MemStorage {
    fn load(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.image.clone())
    }

    fn store(&mut self, image: &[u8]) -> Result<()> {
        self.image = Some(image.to_vec());
        Ok(())
    }
}
