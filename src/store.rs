//! # Style guide store
//!
//! Style guides are plain markdown files kept in a single directory, one file
//! per guide, named `<name>.md`. The directory is the only source of truth:
//! nothing is cached, so every [`StyleGuideStore::load`] reads from disk.
//!
//! Names are restricted to `[A-Za-z0-9_-]`. [`StyleGuideStore::save`] strips
//! anything else before writing, and [`StyleGuideStore::load`] refuses names
//! that are not already in that form, which keeps lookups inside the store
//! directory.
//!
//! ```no_run
//! use markdown_stylist::store::StyleGuideStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StyleGuideStore::new("style_guides");
//! let name = store.save("Acme Corp!", "# Rules").await?;
//! assert_eq!(name, "AcmeCorp");
//! assert_eq!(store.load(&name).await?, "# Rules");
//! # Ok(()) }
//! ```

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

const EXTENSION: &str = "md";

/// Filesystem-backed collection of named style guides.
#[derive(Debug, Clone)]
pub struct StyleGuideStore {
    dir: PathBuf,
}

impl StyleGuideStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the guides live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List guide names, sorted ascending.
    ///
    /// A missing directory is created and reported as empty. Entries that are
    /// not regular `.md` files are skipped.
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            info!("Creating style guide directory: {}", self.dir.display());
            tokio::fs::create_dir_all(&self.dir).await?;
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Number of stored guides. Listing failures count as zero.
    pub async fn count(&self) -> usize {
        self.list().await.map(|names| names.len()).unwrap_or(0)
    }

    /// Read the raw text of a guide.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if `<name>.md` does not exist or `name` is
    ///   not a sanitized name.
    /// - [`StoreError::Io`] for any other read failure.
    pub async fn load(&self, name: &str) -> StoreResult<String> {
        if name.is_empty() || sanitize_name(name) != name {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let path = self.path_for(name);
        debug!("Loading style guide: {}", path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write a guide, overwriting any existing one with the same sanitized
    /// name. Returns the name the guide was stored under.
    ///
    /// # Errors
    /// - [`StoreError::InvalidName`] if nothing is left after sanitizing.
    /// - [`StoreError::Io`] if the directory or file cannot be written.
    pub async fn save(&self, name: &str, content: &str) -> StoreResult<String> {
        let safe_name = sanitize_name(name);
        if safe_name.is_empty() {
            return Err(StoreError::InvalidName);
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&safe_name);
        tokio::fs::write(&path, content).await?;
        info!("Saved style guide '{}' to {}", safe_name, path.display());

        Ok(safe_name)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }
}

/// Drop every character outside `[A-Za-z0-9_-]`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
