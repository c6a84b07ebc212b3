//! Splat primitives and their level-of-detail entries.

use crate::config_tree::ConfigNode;

/// Max level of a LOD entry that does not declare one.
pub const UNBOUNDED_MAX_LEVEL: i32 = i32::MAX;

// ---------------------------------------------------------------------------
// SplatPrimitiveLod
// ---------------------------------------------------------------------------

/// One level-of-detail entry of a primitive: up to six channel images and the
/// atlas slot they were composited into.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatPrimitiveLod {
    /// Highest terrain level (exclusive) this entry applies to. `None` means unbounded.
    pub max_level: Option<i32>,
    pub diffuse: Option<String>,
    pub height: Option<String>,
    pub normal: Option<String>,
    pub smoothness: Option<String>,
    pub roughness: Option<String>,
    pub ao: Option<String>,
    pub(crate) texture_atlas_index: Option<u32>,
}

impl SplatPrimitiveLod {
    /// Reads an entry from its config node. The atlas index starts unset.
    pub fn from_config(conf: &ConfigNode) -> Self {
        let uri = |key| conf.child_value(key).map(str::to_string);
        Self {
            max_level: conf.get("max_level"),
            diffuse: uri("diffuse"),
            height: uri("height"),
            normal: uri("normal"),
            smoothness: uri("smoothness"),
            roughness: uri("roughness"),
            ao: uri("ao"),
            texture_atlas_index: None,
        }
    }

    /// Writes every declared field; the atlas index is runtime state and is not written.
    pub fn to_config(&self) -> ConfigNode {
        let mut conf = ConfigNode::new("lod");
        conf.set_opt("max_level", self.max_level);
        conf.set_opt("diffuse", self.diffuse.as_deref());
        conf.set_opt("height", self.height.as_deref());
        conf.set_opt("normal", self.normal.as_deref());
        conf.set_opt("smoothness", self.smoothness.as_deref());
        conf.set_opt("roughness", self.roughness.as_deref());
        conf.set_opt("ao", self.ao.as_deref());
        conf
    }

    /// Max level with the unbounded default applied.
    pub fn max_level(&self) -> i32 {
        self.max_level.unwrap_or(UNBOUNDED_MAX_LEVEL)
    }

    /// Array layer holding this entry's color+height image, if it was composited.
    ///
    /// The material image sits at the next layer.
    pub fn texture_atlas_index(&self) -> Option<u32> {
        self.texture_atlas_index
    }

    /// The atlas index as shaders see it: `-1` when unset.
    pub fn atlas_index_or_unset(&self) -> i32 {
        self.texture_atlas_index.map_or(-1, |i| i as i32)
    }
}

// ---------------------------------------------------------------------------
// SplatPrimitiveLodVector
// ---------------------------------------------------------------------------

/// LOD entries of a primitive, ordered by ascending max level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatPrimitiveLodVector(pub Vec<SplatPrimitiveLod>);

impl SplatPrimitiveLodVector {
    /// The first entry whose max level exceeds `level`, falling back to the
    /// last entry. `None` only when there are no entries.
    pub fn lod(&self, level: i32) -> Option<&SplatPrimitiveLod> {
        self.0
            .iter()
            .find(|lod| lod.max_level() > level)
            .or_else(|| self.0.last())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SplatPrimitiveLod> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SplatPrimitiveLod> {
        self.0.iter_mut()
    }
}

// ---------------------------------------------------------------------------
// SplatPrimitive
// ---------------------------------------------------------------------------

/// A named surface material with its LOD chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatPrimitive {
    pub name: String,
    pub lods: SplatPrimitiveLodVector,
}

impl SplatPrimitive {
    /// Reads the name and every child of the `lods` node, in order.
    pub fn from_config(conf: &ConfigNode) -> Self {
        Self {
            name: conf.child_value("name").unwrap_or_default().to_string(),
            lods: SplatPrimitiveLodVector(
                conf.child_list("lods")
                    .iter()
                    .map(SplatPrimitiveLod::from_config)
                    .collect(),
            ),
        }
    }

    /// Not implemented yet: always returns an empty node.
    pub fn to_config(&self) -> ConfigNode {
        ConfigNode::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
