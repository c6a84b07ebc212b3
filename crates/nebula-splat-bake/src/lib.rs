//! Offline splat atlas baking.
//!
//! Reads a splat catalog from disk, builds its texture atlas, and writes the
//! array layers as PNG files together with a RON manifest describing which
//! layer each LOD entry landed in.

use std::path::{Path, PathBuf};

use nebula_config::{BakeConfig, CONFIG_FILE_NAME, CliArgs, ConfigError, default_config_dir};
use nebula_splat::{AtlasBuilder, CatalogError, FileFetcher, SplatCatalog, TextureArray};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// BakeError
// ---------------------------------------------------------------------------

/// Errors that end a bake.
#[derive(Debug, Error)]
pub enum BakeError {
    /// The catalog path has no file name.
    #[error("invalid catalog path {}", path.display())]
    InvalidCatalogPath {
        /// The configured catalog path.
        path: PathBuf,
    },

    /// The catalog could not be fetched or parsed, or is empty.
    #[error("failed to read splat catalog {}: {source}", path.display())]
    Catalog {
        /// The configured catalog path.
        path: PathBuf,
        /// The fetch, parse or emptiness failure.
        #[source]
        source: CatalogError,
    },

    /// Every LOD entry failed to composite.
    #[error("splat catalog {} produced no atlas", path.display())]
    NoAtlas {
        /// The configured catalog path.
        path: PathBuf,
    },

    /// An output directory or file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The directory or file being written.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A layer image could not be encoded as PNG.
    #[error("failed to encode atlas layer {layer}: {source}")]
    Encode {
        /// Index of the layer in the array.
        layer: u32,
        /// The encoder failure.
        #[source]
        source: image::ImageError,
    },

    /// The manifest could not be written as RON.
    #[error("failed to serialize atlas manifest: {0}")]
    Manifest(#[from] ron::Error),
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Whether `bake.ron` existed before the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from an existing file.
    Loaded,
    /// Written with defaults because no file existed.
    Created,
}

/// Bake settings for one run, with command-line overrides applied.
#[derive(Debug)]
pub struct RunConfig {
    /// Directory holding `bake.ron`.
    pub dir: PathBuf,
    /// Settings after command-line overrides.
    pub config: BakeConfig,
    /// Whether `bake.ron` was read or created.
    pub origin: ConfigOrigin,
}

impl RunConfig {
    /// Loads `bake.ron` from the directory given by `--config`, or from the
    /// default config directory, creating it with defaults when missing.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, parsed, or created.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let dir = args.config.clone().unwrap_or_else(default_config_dir);
        let origin = if dir.join(CONFIG_FILE_NAME).exists() {
            ConfigOrigin::Loaded
        } else {
            ConfigOrigin::Created
        };
        let mut config = BakeConfig::load_or_create(&dir)?;
        config.apply_cli_overrides(args);
        Ok(Self {
            dir,
            config,
            origin,
        })
    }

    /// Path of the settings file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Directory of the JSON log file: `logs` inside the config directory.
    pub fn log_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    /// Logs where the settings came from. Call after logging is initialized.
    pub fn log_origin(&self) {
        let path = self.path();
        match self.origin {
            ConfigOrigin::Loaded => info!("Loaded bake config from {}", path.display()),
            ConfigOrigin::Created => info!("Created default bake config at {}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// AtlasManifest
// ---------------------------------------------------------------------------

/// Where one LOD entry landed in the atlas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub primitive: String,
    /// Position of the entry in its primitive's LOD list.
    pub lod: usize,
    pub max_level: i32,
    /// Color+height layer; the material layer follows it. `-1` when unset.
    pub atlas_index: i32,
}

/// Description of a baked atlas, written next to the layer images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasManifest {
    pub catalog: Option<String>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub entries: Vec<ManifestEntry>,
}

impl AtlasManifest {
    pub fn new(catalog: &SplatCatalog, atlas: &TextureArray) -> Self {
        let entries = catalog
            .primitives()
            .iter()
            .flat_map(|(name, primitive)| {
                primitive.lods.iter().enumerate().map(move |(lod, entry)| ManifestEntry {
                    primitive: name.clone(),
                    lod,
                    max_level: entry.max_level(),
                    atlas_index: entry.atlas_index_or_unset(),
                })
            })
            .collect();

        Self {
            catalog: catalog.name.clone(),
            width: atlas.width(),
            height: atlas.height(),
            layers: atlas.layer_count(),
            entries,
        }
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new().depth_limit(3))
    }
}

// ---------------------------------------------------------------------------
// Bake
// ---------------------------------------------------------------------------

/// Outcome of a successful bake.
#[derive(Debug)]
pub struct BakeReport {
    pub manifest: AtlasManifest,
    /// Files written, layer images first and the manifest last.
    pub written: Vec<PathBuf>,
}

/// Reads the configured catalog, builds its atlas, and writes the output.
///
/// # Errors
///
/// Fails when the catalog cannot be read, when it yields no atlas, or when
/// writing the output fails.
pub fn bake(config: &BakeConfig) -> Result<BakeReport, BakeError> {
    let catalog_path = &config.catalog.path;
    let (root, uri) = split_catalog_path(catalog_path)?;

    let fetcher = FileFetcher::new(root);
    let read_error = |source| BakeError::Catalog {
        path: catalog_path.clone(),
        source,
    };
    let mut catalog = SplatCatalog::try_read(&uri, &fetcher).map_err(read_error)?;
    catalog.log_loaded();

    let def = AtlasBuilder::new(&fetcher).build(&mut catalog);
    let atlas = def
        .rgbh_atlas
        .as_ref()
        .filter(|_| def.has_atlas())
        .ok_or_else(|| BakeError::NoAtlas {
            path: catalog_path.clone(),
        })?;

    let manifest = AtlasManifest::new(&catalog, atlas);
    let mut written = Vec::new();

    if config.output.write_layers {
        let dir = &config.output.dir;
        std::fs::create_dir_all(dir).map_err(|source| BakeError::Io {
            path: dir.clone(),
            source,
        })?;

        for layer in 0..atlas.layer_count() {
            if let Some(path) = write_layer(atlas, layer, dir)? {
                written.push(path);
            }
        }

        let manifest_path = config.output.manifest_path();
        let text = manifest.to_ron_string()?;
        std::fs::write(&manifest_path, text).map_err(|source| BakeError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        written.push(manifest_path);
    }

    info!(
        layers = manifest.layers,
        files = written.len(),
        "Baked splat atlas {}x{}",
        manifest.width,
        manifest.height
    );
    Ok(BakeReport { manifest, written })
}

/// File name of one layer image.
pub fn layer_file_name(layer: u32) -> String {
    format!("layer_{layer:03}.png")
}

/// Splits a catalog path into the directory the fetcher reads from and the
/// catalog URI relative to it.
fn split_catalog_path(path: &Path) -> Result<(PathBuf, String), BakeError> {
    let invalid = || BakeError::InvalidCatalogPath {
        path: path.to_path_buf(),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, file_name.to_string()))
}

fn write_layer(
    atlas: &TextureArray,
    layer: u32,
    dir: &Path,
) -> Result<Option<PathBuf>, BakeError> {
    let Some(image) = atlas.image(layer) else {
        return Ok(None);
    };
    let path = dir.join(layer_file_name(layer));
    image
        .as_dynamic()
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|source| BakeError::Encode { layer, source })?;
    debug!(layer, path = %path.display(), "Wrote atlas layer");
    Ok(Some(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
