//! Splat catalog and texture atlas: terrain surface primitives read from a
//! configuration tree, composited per LOD into one texture array with a
//! lookup buffer for shaders.

mod atlas;
mod catalog;
mod compositor;
mod config_tree;
mod fetch;
mod resolver;
mod splat_image;
mod texture_def;

pub use atlas::AtlasBuilder;
pub use catalog::{
    CatalogError, SPLAT_CATALOG_CURRENT_VERSION, SPLAT_CATALOG_ROOT, SplatCatalog, SplatClass,
    SplatClassLayer, SplatDetailData, SplatPrimitive, SplatPrimitiveLod, SplatPrimitiveLodVector,
    UNBOUNDED_MAX_LEVEL,
};
pub use compositor::{
    ChannelCompositor, CompositedLod, DEFAULT_HEIGHT, DEFAULT_MATERIAL, WATER_PRIMITIVE,
    WATER_SMOOTHNESS,
};
pub use config_tree::{ConfigNode, ConfigTreeError};
pub use fetch::{FetchError, FileFetcher, MemoryFetcher, ResourceFetcher, resolve_uri};
pub use resolver::{ImageResolver, ResolveError};
pub use splat_image::{DataType, ImageLayout, InternalFormat, PixelFormat, SplatImage};
pub use texture_def::{
    GpuLifecycle, GpuResidency, LookupBuffer, LutEntry, MagFilter, MinFilter, SamplerSettings,
    SplatTextureDef, TextureArray, TextureArrayError, WrapMode, mip_level_count,
};
