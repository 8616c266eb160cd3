//! Voice clip lookup.
//!
//! Clips are addressed by short names such as `round`, `num7` or
//! `message042`. An `AssetStore` maps a name to the raw WAV bytes; the
//! daemon uses a directory of `<name>.wav` files backed by the bundled clips,
//! tests use an in-memory map.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

/// File extension of clips on disk.
const CLIP_EXTENSION: &str = "wav";

/// Source of encoded voice clips.
pub trait AssetStore: Send {
    /// Returns the encoded bytes for `name`, or `None` if there is no such clip.
    fn lookup(&self, name: &str) -> Option<Cow<'_, [u8]>>;
}

/// Returns true if `name` is safe to use as a file stem.
fn is_valid_clip_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ============================================================================
// DirectoryAssets
// ============================================================================

/// Clips stored as `<root>/<name>.wav`.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the clips are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a clip would be read from, if the name is acceptable.
    #[must_use]
    pub fn clip_path(&self, name: &str) -> Option<PathBuf> {
        is_valid_clip_name(name).then(|| self.root.join(format!("{name}.{CLIP_EXTENSION}")))
    }
}

impl AssetStore for DirectoryAssets {
    fn lookup(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        let path = self.clip_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Some(Cow::Owned(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read voice clip");
                None
            }
        }
    }
}

// ============================================================================
// MemoryAssets
// ============================================================================

/// Clips held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    clips: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` under `name`, replacing any previous clip.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.clips.insert(name.into(), bytes.into());
    }

    /// Builder-style `insert`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl AssetStore for MemoryAssets {
    fn lookup(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.clips.get(name).map(|bytes| Cow::Borrowed(bytes.as_slice()))
    }
}

// ============================================================================
// FallbackAssets
// ============================================================================

/// Looks in `primary` first and falls back to `fallback`.
#[derive(Debug, Clone)]
pub struct FallbackAssets<P, F> {
    primary: P,
    fallback: F,
}

impl<P: AssetStore, F: AssetStore> FallbackAssets<P, F> {
    #[must_use]
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: AssetStore, F: AssetStore> AssetStore for FallbackAssets<P, F> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.primary
            .lookup(name)
            .or_else(|| self.fallback.lookup(name))
    }
}
