//! Splat catalog: the classes and primitives that make up a terrain surface
//! material set, read from a configuration tree.

mod class;
mod detail;
mod primitive;

use std::collections::BTreeMap;
use std::collections::btree_map;

use thiserror::Error;
use tracing::{info, warn};

pub use class::{SplatClass, SplatClassLayer};
pub use detail::SplatDetailData;
pub use primitive::{
    SplatPrimitive, SplatPrimitiveLod, SplatPrimitiveLodVector, UNBOUNDED_MAX_LEVEL,
};

use crate::config_tree::{ConfigNode, ConfigTreeError};
use crate::fetch::{FetchError, ResourceFetcher};

/// Format version written by this crate and assumed for documents that omit it.
pub const SPLAT_CATALOG_CURRENT_VERSION: i32 = 1;

/// Document key of the catalog root.
pub const SPLAT_CATALOG_ROOT: &str = "splat_catalog";

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

/// Reasons [`SplatCatalog::try_read`] produced no catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The document could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The document is not valid.
    #[error("failed to parse catalog {uri}: {source}")]
    Parse {
        /// The catalog document.
        uri: String,
        /// What made the document invalid.
        #[source]
        source: ConfigTreeError,
    },

    /// The document holds no primitives and no classes.
    #[error("catalog is empty ({uri})")]
    Empty {
        /// The catalog document.
        uri: String,
    },
}

// ---------------------------------------------------------------------------
// SplatCatalog
// ---------------------------------------------------------------------------

/// Primitives and classes keyed by name, in key order.
#[derive(Clone, Debug, PartialEq)]
pub struct SplatCatalog {
    pub version: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    primitives: BTreeMap<String, SplatPrimitive>,
    classes: BTreeMap<String, SplatClass>,
    base_uri: Option<String>,
}

impl Default for SplatCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SplatCatalog {
    /// Creates an empty catalog at the current format version.
    pub fn new() -> Self {
        Self {
            version: SPLAT_CATALOG_CURRENT_VERSION,
            name: None,
            description: None,
            primitives: BTreeMap::new(),
            classes: BTreeMap::new(),
            base_uri: None,
        }
    }

    /// Builds a catalog from the content of a `splat_catalog` node.
    pub fn from_config(conf: &ConfigNode) -> Self {
        let mut catalog = Self::new();
        catalog.apply_config(conf);
        catalog
    }

    /// Merges `conf` into this catalog.
    ///
    /// Primitives are keyed by their declared name, later duplicates replacing
    /// earlier ones. Classes without a name are dropped.
    pub fn apply_config(&mut self, conf: &ConfigNode) {
        if let Some(version) = conf.get("version") {
            self.version = version;
        }
        if let Some(name) = conf.child_value("name") {
            self.name = Some(name.to_string());
        }
        if let Some(description) = conf.child_value("description") {
            self.description = Some(description.to_string());
        }

        for primitive_conf in conf.child_list("primitives") {
            let primitive = SplatPrimitive::from_config(primitive_conf);
            self.primitives.insert(primitive.name.clone(), primitive);
        }

        for class_conf in conf.child_list("classes") {
            let class = SplatClass::from_config(class_conf);
            if !class.name.is_empty() {
                self.classes.insert(class.name.clone(), class);
            }
        }
    }

    /// Writes the header and one placeholder per class.
    ///
    /// Classes and primitives do not serialize their content yet, so the
    /// result does not reproduce the catalog.
    pub fn to_config(&self) -> ConfigNode {
        let mut conf = ConfigNode::new(SPLAT_CATALOG_ROOT);
        conf.set("version", self.version);
        conf.set_opt("name", self.name.as_deref());
        conf.set_opt("description", self.description.as_deref());

        let mut classes = ConfigNode::new("classes");
        for class in self.classes.values() {
            classes.add_as("class", class.to_config());
        }
        conf.set_child(classes);
        conf
    }

    /// Fetches and parses a catalog document.
    ///
    /// Returns `None` if the document cannot be fetched or parsed, or holds
    /// an empty catalog; the reason is logged.
    pub fn read(uri: &str, fetcher: &dyn ResourceFetcher) -> Option<Self> {
        match Self::try_read(uri, fetcher) {
            Ok(catalog) => {
                catalog.log_loaded();
                Some(catalog)
            }
            Err(CatalogError::Empty { uri }) => {
                warn!("Catalog is empty! ({uri})");
                None
            }
            Err(err) => {
                warn!("Failed to read catalog from {uri}: {err}");
                None
            }
        }
    }

    /// Like [`SplatCatalog::read`], returning the failure instead of logging it.
    pub fn try_read(uri: &str, fetcher: &dyn ResourceFetcher) -> Result<Self, CatalogError> {
        let text = fetcher.fetch_text(uri)?;
        let doc = ConfigNode::from_ron_str(&text).map_err(|source| CatalogError::Parse {
            uri: uri.to_string(),
            source,
        })?;

        let mut catalog = Self::new();
        if let Some(root) = doc.child(SPLAT_CATALOG_ROOT) {
            catalog.apply_config(root);
        }
        if catalog.is_empty() {
            return Err(CatalogError::Empty {
                uri: uri.to_string(),
            });
        }
        catalog.base_uri = Some(uri.to_string());
        Ok(catalog)
    }

    /// Logs the catalog name and class count at `info` level.
    pub fn log_loaded(&self) {
        info!(
            "Catalog \"{}\" contains {} classes",
            self.name.as_deref().unwrap_or_default(),
            self.classes.len()
        );
    }

    /// `true` when the catalog has neither primitives nor classes.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty() && self.classes.is_empty()
    }

    /// The URI the catalog was read from; relative image references resolve against it.
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    pub fn set_base_uri(&mut self, uri: impl Into<String>) {
        self.base_uri = Some(uri.into());
    }

    /// The class called `name`.
    pub fn class(&self, name: &str) -> Option<&SplatClass> {
        self.classes.get(name)
    }

    /// The primitive called `name`, if the catalog declares one.
    pub fn primitive(&self, name: &str) -> Option<&SplatPrimitive> {
        self.primitives.get(name)
    }

    pub fn classes(&self) -> &BTreeMap<String, SplatClass> {
        &self.classes
    }

    pub fn primitives(&self) -> &BTreeMap<String, SplatPrimitive> {
        &self.primitives
    }

    pub(crate) fn primitives_mut(&mut self) -> btree_map::IterMut<'_, String, SplatPrimitive> {
        self.primitives.iter_mut()
    }

    /// Adds or replaces a primitive under its own name.
    pub fn insert_primitive(&mut self, primitive: SplatPrimitive) {
        self.primitives.insert(primitive.name.clone(), primitive);
    }

    /// Adds or replaces a class. Classes without a name are ignored.
    pub fn insert_class(&mut self, class: SplatClass) {
        if !class.name.is_empty() {
            self.classes.insert(class.name.clone(), class);
        }
    }

    /// Clears the atlas index of every LOD entry.
    pub fn reset_atlas_indices(&mut self) {
        for primitive in self.primitives.values_mut() {
            for lod in primitive.lods.iter_mut() {
                lod.texture_atlas_index = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
