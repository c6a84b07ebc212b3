//! Resource fetching: loads catalog documents and splat images by URI.
//!
//! The catalog and the atlas builder only see the [`ResourceFetcher`] trait.
//! [`FileFetcher`] reads from disk below a root directory, [`MemoryFetcher`]
//! serves preloaded resources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;

use crate::splat_image::SplatImage;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Errors returned when a resource cannot be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing exists at the URI.
    #[error("resource not found: {uri}")]
    NotFound {
        /// The URI that was requested.
        uri: String,
    },

    /// The resource exists but could not be read.
    #[error("failed to read {uri}: {source}")]
    Io {
        /// The URI that was requested.
        uri: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be decoded as an image.
    #[error("failed to decode image {uri}: {source}")]
    Decode {
        /// The URI that was requested.
        uri: String,
        /// The decoder failure.
        #[source]
        source: image::ImageError,
    },

    /// The image decoded to a pixel layout splat atlases cannot hold.
    #[error("unsupported pixel layout in {uri}")]
    UnsupportedLayout {
        /// The URI that was requested.
        uri: String,
    },
}

// ---------------------------------------------------------------------------
// ResourceFetcher
// ---------------------------------------------------------------------------

/// Blocking access to images and text documents by URI.
pub trait ResourceFetcher {
    /// Fetches and decodes an image.
    fn fetch_image(&self, uri: &str) -> Result<SplatImage, FetchError>;

    /// Fetches a UTF-8 text document.
    fn fetch_text(&self, uri: &str) -> Result<String, FetchError>;
}

/// Resolves `reference` against the document it appeared in.
///
/// Absolute references (a leading `/` or a `scheme://` prefix) are returned
/// unchanged. Relative ones are joined to the directory part of `base`.
pub fn resolve_uri(base: Option<&str>, reference: &str) -> String {
    if reference.starts_with('/') || reference.contains("://") {
        return reference.to_string();
    }
    match base.and_then(|b| b.rsplit_once('/')) {
        Some((dir, _)) => format!("{dir}/{reference}"),
        None => reference.to_string(),
    }
}

// ---------------------------------------------------------------------------
// FileFetcher
// ---------------------------------------------------------------------------

/// Fetches resources from the file system.
///
/// Relative URIs are resolved below `root`; a `file://` prefix is stripped.
#[derive(Clone, Debug)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Creates a fetcher resolving relative URIs below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, uri: &str) -> PathBuf {
        let stripped = uri.strip_prefix("file://").unwrap_or(uri);
        self.root.join(stripped)
    }

    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(uri);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound {
                    uri: uri.to_string(),
                }
            } else {
                FetchError::Io {
                    uri: uri.to_string(),
                    source,
                }
            }
        })
    }
}

impl ResourceFetcher for FileFetcher {
    fn fetch_image(&self, uri: &str) -> Result<SplatImage, FetchError> {
        let bytes = self.read_bytes(uri)?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| FetchError::Decode {
            uri: uri.to_string(),
            source,
        })?;
        SplatImage::new(decoded).ok_or_else(|| FetchError::UnsupportedLayout {
            uri: uri.to_string(),
        })
    }

    fn fetch_text(&self, uri: &str) -> Result<String, FetchError> {
        let bytes = self.read_bytes(uri)?;
        String::from_utf8(bytes).map_err(|e| FetchError::Io {
            uri: uri.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryFetcher
// ---------------------------------------------------------------------------

/// Serves images and documents registered in memory. Every fetch returns a copy.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    images: HashMap<String, DynamicImage>,
    documents: HashMap<String, String>,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image under `uri`, replacing any previous one.
    pub fn insert_image(&mut self, uri: impl Into<String>, image: impl Into<DynamicImage>) {
        self.images.insert(uri.into(), image.into());
    }

    /// Registers a text document under `uri`, replacing any previous one.
    pub fn insert_document(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(uri.into(), text.into());
    }

    /// Builder-style [`MemoryFetcher::insert_image`].
    pub fn with_image(mut self, uri: impl Into<String>, image: impl Into<DynamicImage>) -> Self {
        self.insert_image(uri, image);
        self
    }

    /// Builder-style [`MemoryFetcher::insert_document`].
    pub fn with_document(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert_document(uri, text);
        self
    }
}

impl ResourceFetcher for MemoryFetcher {
    fn fetch_image(&self, uri: &str) -> Result<SplatImage, FetchError> {
        let image = self.images.get(uri).ok_or_else(|| FetchError::NotFound {
            uri: uri.to_string(),
        })?;
        SplatImage::new(image.clone()).ok_or_else(|| FetchError::UnsupportedLayout {
            uri: uri.to_string(),
        })
    }

    fn fetch_text(&self, uri: &str) -> Result<String, FetchError> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                uri: uri.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
