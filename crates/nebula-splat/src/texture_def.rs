//! Atlas build output: texture arrays, sampler settings, the LOD lookup
//! buffer, and per-device-context residency bookkeeping.

use std::collections::BTreeMap;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::catalog::SplatCatalog;
use crate::splat_image::SplatImage;

// ---------------------------------------------------------------------------
// Sampler settings
// ---------------------------------------------------------------------------

/// Addressing outside the `[0, 1]` texture coordinate range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    /// Tile the texture.
    Repeat,
    /// Tile the texture, mirroring every other copy.
    MirroredRepeat,
    /// Repeat the edge texels.
    ClampToEdge,
}

/// Minification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinFilter {
    /// Nearest texel of the base level.
    Nearest,
    /// Bilinear filtering of the base level.
    Linear,
    /// Bilinear filtering of the nearest mip level.
    LinearMipmapNearest,
    /// Trilinear filtering.
    LinearMipmapLinear,
}

impl MinFilter {
    /// `true` for the filters that read mip levels.
    pub fn uses_mipmaps(self) -> bool {
        matches!(self, Self::LinearMipmapNearest | Self::LinearMipmapLinear)
    }
}

/// Magnification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MagFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear filtering.
    Linear,
}

/// How shaders sample a texture array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerSettings {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub max_anisotropy: f32,
}

impl SamplerSettings {
    /// Settings of splat atlases: tiling, trilinear minification, 4x anisotropy.
    pub const SPLAT_ATLAS: Self = Self {
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Repeat,
        min_filter: MinFilter::LinearMipmapLinear,
        mag_filter: MagFilter::Linear,
        max_anisotropy: 4.0,
    };

    /// Equivalent wgpu sampler descriptor.
    pub fn to_wgpu<'a>(&self, label: Option<&'a str>) -> wgpu::SamplerDescriptor<'a> {
        let (min_filter, mipmap_filter) = match self.min_filter {
            MinFilter::Nearest => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
            MinFilter::Linear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest),
            MinFilter::LinearMipmapNearest => {
                (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest)
            }
            MinFilter::LinearMipmapLinear => {
                (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear)
            }
        };
        let mag_filter = match self.mag_filter {
            MagFilter::Nearest => wgpu::FilterMode::Nearest,
            MagFilter::Linear => wgpu::FilterMode::Linear,
        };
        // wgpu only accepts anisotropy when every filter is linear.
        let all_linear = mag_filter == wgpu::FilterMode::Linear
            && min_filter == wgpu::FilterMode::Linear
            && mipmap_filter == wgpu::MipmapFilterMode::Linear;
        let anisotropy_clamp = if all_linear {
            self.max_anisotropy.clamp(1.0, 16.0) as u16
        } else {
            1
        };

        wgpu::SamplerDescriptor {
            label,
            address_mode_u: address_mode(self.wrap_s),
            address_mode_v: address_mode(self.wrap_t),
            mag_filter,
            min_filter,
            mipmap_filter,
            anisotropy_clamp,
            ..Default::default()
        }
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::SPLAT_ATLAS
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

/// Calculates the number of mip levels for the given dimensions.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height).max(1) as f32).log2().floor() as u32 + 1
}

// ---------------------------------------------------------------------------
// GPU lifecycle
// ---------------------------------------------------------------------------

/// Per-device-context bookkeeping for objects mirrored on the GPU.
pub trait GpuLifecycle {
    /// Makes room for `max_contexts` device contexts.
    fn resize_gpu_object_buffers(&mut self, max_contexts: usize);

    /// Drops the GPU copy for one context, or for all when `context` is `None`.
    fn release_gpu_objects(&mut self, context: Option<usize>);
}

/// Which device contexts hold an uploaded copy of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GpuResidency {
    resident: Vec<bool>,
}

impl GpuResidency {
    pub fn context_slots(&self) -> usize {
        self.resident.len()
    }

    /// Records an upload to `context`, growing the slot list if needed.
    pub fn mark_resident(&mut self, context: usize) {
        if context >= self.resident.len() {
            self.resident.resize(context + 1, false);
        }
        self.resident[context] = true;
    }

    pub fn is_resident(&self, context: usize) -> bool {
        self.resident.get(context).copied().unwrap_or(false)
    }
}

impl GpuLifecycle for GpuResidency {
    fn resize_gpu_object_buffers(&mut self, max_contexts: usize) {
        self.resident.resize(max_contexts, false);
    }

    fn release_gpu_objects(&mut self, context: Option<usize>) {
        match context {
            Some(context) => {
                if let Some(slot) = self.resident.get_mut(context) {
                    *slot = false;
                }
            }
            None => self.resident.fill(false),
        }
    }
}

// ---------------------------------------------------------------------------
// TextureArray
// ---------------------------------------------------------------------------

/// Errors returned when populating a [`TextureArray`].
#[derive(Debug, Error)]
pub enum TextureArrayError {
    /// The array has no such layer.
    #[error("layer {layer} is out of range (array depth {depth})")]
    LayerOutOfRange {
        /// The requested layer.
        layer: u32,
        /// Number of layers in the array.
        depth: u32,
    },

    /// The image extent differs from the array extent.
    #[error("layer {layer} is {actual:?}, array expects {expected:?}")]
    DimensionMismatch {
        /// The requested layer.
        layer: u32,
        /// Array width and height.
        expected: (u32, u32),
        /// Image width and height.
        actual: (u32, u32),
    },
}

/// A 2D texture array: fixed extent and depth, one image per layer.
#[derive(Clone, Debug)]
pub struct TextureArray {
    width: u32,
    height: u32,
    layers: Vec<Option<SplatImage>>,
    sampler: SamplerSettings,
    residency: GpuResidency,
}

impl TextureArray {
    /// Creates an array of `depth` empty layers.
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            layers: vec![None; depth as usize],
            sampler: SamplerSettings::default(),
            residency: GpuResidency::default(),
        }
    }

    /// Replaces the default sampler settings.
    pub fn with_sampler(mut self, sampler: SamplerSettings) -> Self {
        self.sampler = sampler;
        self
    }

    /// Places `image` in `layer`.
    ///
    /// # Errors
    ///
    /// Fails if the layer does not exist or the image extent differs from the array's.
    pub fn set_image(&mut self, layer: u32, image: SplatImage) -> Result<(), TextureArrayError> {
        let depth = self.layer_count();
        let slot = self
            .layers
            .get_mut(layer as usize)
            .ok_or(TextureArrayError::LayerOutOfRange { layer, depth })?;
        if (image.width(), image.height()) != (self.width, self.height) {
            return Err(TextureArrayError::DimensionMismatch {
                layer,
                expected: (self.width, self.height),
                actual: (image.width(), image.height()),
            });
        }
        *slot = Some(image);
        Ok(())
    }

    /// The image placed in `layer`, if any.
    pub fn image(&self, layer: u32) -> Option<&SplatImage> {
        self.layers.get(layer as usize).and_then(Option::as_ref)
    }

    /// Raw bytes of one layer, for texture upload.
    pub fn layer_bytes(&self, layer: u32) -> Option<&[u8]> {
        self.image(layer).map(SplatImage::as_bytes)
    }

    /// Width shared by every layer.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height shared by every layer.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Array depth, populated or not.
    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Number of layers holding an image.
    pub fn populated_layers(&self) -> usize {
        self.layers.iter().filter(|l| l.is_some()).count()
    }

    pub fn is_populated(&self) -> bool {
        self.populated_layers() > 0
    }

    /// How shaders sample this array.
    pub fn sampler(&self) -> &SamplerSettings {
        &self.sampler
    }

    pub fn residency(&self) -> &GpuResidency {
        &self.residency
    }

    pub fn residency_mut(&mut self) -> &mut GpuResidency {
        &mut self.residency
    }

    /// Mip levels a GPU copy needs for the configured minification filter.
    pub fn mip_level_count(&self) -> u32 {
        if self.sampler.min_filter.uses_mipmaps() {
            mip_level_count(self.width, self.height)
        } else {
            1
        }
    }

    /// wgpu format of the first populated layer's internal format tag.
    pub fn texture_format(&self) -> Option<wgpu::TextureFormat> {
        self.layers
            .iter()
            .flatten()
            .next()
            .and_then(|image| image.internal_format().to_wgpu())
    }

    /// Descriptor for creating the GPU texture. `None` if the array is empty
    /// or its format has no wgpu equivalent.
    pub fn wgpu_descriptor<'a>(
        &self,
        label: Option<&'a str>,
    ) -> Option<wgpu::TextureDescriptor<'a>> {
        let format = self.texture_format()?;
        Some(wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: self.layer_count(),
            },
            mip_level_count: self.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }
}

impl GpuLifecycle for TextureArray {
    fn resize_gpu_object_buffers(&mut self, max_contexts: usize) {
        self.residency.resize_gpu_object_buffers(max_contexts);
    }

    fn release_gpu_objects(&mut self, context: Option<usize>) {
        self.residency.release_gpu_objects(context);
    }
}

// ---------------------------------------------------------------------------
// LookupBuffer
// ---------------------------------------------------------------------------

/// One LOD entry as shaders read it. `atlas_index` is `-1` when unset.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LutEntry {
    /// Exclusive upper bound of the levels the entry covers.
    pub max_level: i32,
    pub atlas_index: i32,
}

/// Flat table of every LOD entry, grouped per primitive in catalog key order.
#[derive(Clone, Debug, Default)]
pub struct LookupBuffer {
    entries: Vec<LutEntry>,
    ranges: BTreeMap<String, Range<u32>>,
    residency: GpuResidency,
}

impl LookupBuffer {
    /// Snapshots the max levels and atlas indices of `catalog`.
    pub fn from_catalog(catalog: &SplatCatalog) -> Self {
        let mut entries = Vec::new();
        let mut ranges = BTreeMap::new();
        for (name, primitive) in catalog.primitives() {
            let start = entries.len() as u32;
            entries.extend(primitive.lods.iter().map(|lod| LutEntry {
                max_level: lod.max_level(),
                atlas_index: lod.atlas_index_or_unset(),
            }));
            ranges.insert(name.clone(), start..entries.len() as u32);
        }
        Self {
            entries,
            ranges,
            residency: GpuResidency::default(),
        }
    }

    pub fn entries(&self) -> &[LutEntry] {
        &self.entries
    }

    /// Entry range of one primitive.
    pub fn range(&self, primitive: &str) -> Option<Range<u32>> {
        self.ranges.get(primitive).cloned()
    }

    /// Same selection rule as [`crate::SplatPrimitiveLodVector::lod`].
    pub fn lookup(&self, primitive: &str, level: i32) -> Option<LutEntry> {
        let range = self.ranges.get(primitive)?;
        let lods = &self.entries[range.start as usize..range.end as usize];
        lods.iter()
            .find(|e| e.max_level > level)
            .or_else(|| lods.last())
            .copied()
    }

    /// The table as raw bytes for a storage buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    pub fn residency(&self) -> &GpuResidency {
        &self.residency
    }
}

impl GpuLifecycle for LookupBuffer {
    fn resize_gpu_object_buffers(&mut self, max_contexts: usize) {
        self.residency.resize_gpu_object_buffers(max_contexts);
    }

    fn release_gpu_objects(&mut self, context: Option<usize>) {
        self.residency.release_gpu_objects(context);
    }
}

// ---------------------------------------------------------------------------
// SplatTextureDef
// ---------------------------------------------------------------------------

/// Everything the renderer needs from an atlas build.
#[derive(Clone, Debug, Default)]
pub struct SplatTextureDef {
    /// Color+height and material layers, interleaved per LOD entry.
    pub rgbh_atlas: Option<TextureArray>,
    /// Reserved for a separate material array; builds leave it empty.
    pub material_atlas: Option<TextureArray>,
    /// Max level and atlas index of every LOD entry.
    pub lut_buffer: Option<LookupBuffer>,
}

impl SplatTextureDef {
    /// `true` when the color+height array received at least one layer.
    pub fn has_atlas(&self) -> bool {
        self.rgbh_atlas
            .as_ref()
            .is_some_and(TextureArray::is_populated)
    }
}

impl GpuLifecycle for SplatTextureDef {
    fn resize_gpu_object_buffers(&mut self, max_contexts: usize) {
        if let Some(atlas) = &mut self.rgbh_atlas {
            atlas.resize_gpu_object_buffers(max_contexts);
        }
        if let Some(atlas) = &mut self.material_atlas {
            atlas.resize_gpu_object_buffers(max_contexts);
        }
        if let Some(lut) = &mut self.lut_buffer {
            lut.resize_gpu_object_buffers(max_contexts);
        }
    }

    fn release_gpu_objects(&mut self, context: Option<usize>) {
        if let Some(atlas) = &mut self.rgbh_atlas {
            atlas.release_gpu_objects(context);
        }
        if let Some(atlas) = &mut self.material_atlas {
            atlas.release_gpu_objects(context);
        }
        if let Some(lut) = &mut self.lut_buffer {
            lut.release_gpu_objects(context);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SplatPrimitive, SplatPrimitiveLod, SplatPrimitiveLodVector};
    use image::{Rgba, RgbaImage};

    fn layer(w: u32, h: u32) -> SplatImage {
        SplatImage::new(RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 4])).into()).unwrap()
    }

    #[test]
    fn test_splat_sampler_settings() {
        let sampler = SamplerSettings::default();
        assert_eq!(sampler.wrap_s, WrapMode::Repeat);
        assert_eq!(sampler.wrap_t, WrapMode::Repeat);
        assert_eq!(sampler.min_filter, MinFilter::LinearMipmapLinear);
        assert_eq!(sampler.mag_filter, MagFilter::Linear);
        assert_eq!(sampler.max_anisotropy, 4.0);
    }

    #[test]
    fn test_sampler_maps_to_wgpu() {
        let desc = SamplerSettings::SPLAT_ATLAS.to_wgpu(Some("splat"));
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.mipmap_filter, wgpu::MipmapFilterMode::Linear);
        assert_eq!(desc.anisotropy_clamp, 4);
    }

    #[test]
    fn test_anisotropy_dropped_for_nearest_filtering() {
        let sampler = SamplerSettings {
            mag_filter: MagFilter::Nearest,
            ..SamplerSettings::SPLAT_ATLAS
        };
        assert_eq!(sampler.to_wgpu(None).anisotropy_clamp, 1);
    }

    #[test]
    fn test_set_image_checks_range_and_extent() {
        let mut array = TextureArray::new(4, 4, 2);
        assert!(array.set_image(0, layer(4, 4)).is_ok());
        assert!(matches!(
            array.set_image(2, layer(4, 4)),
            Err(TextureArrayError::LayerOutOfRange { layer: 2, depth: 2 })
        ));
        assert!(matches!(
            array.set_image(1, layer(8, 4)),
            Err(TextureArrayError::DimensionMismatch { .. })
        ));
        assert_eq!(array.layer_count(), 2);
        assert_eq!(array.populated_layers(), 1);
        assert_eq!(array.layer_bytes(0).unwrap().len(), 4 * 4 * 4);
        assert!(array.layer_bytes(1).is_none());
    }

    #[test]
    fn test_wgpu_descriptor_matches_array() {
        let mut array = TextureArray::new(64, 32, 3);
        assert!(array.wgpu_descriptor(None).is_none());
        array.set_image(0, layer(64, 32)).unwrap();

        let desc = array.wgpu_descriptor(Some("splat-rgbh")).unwrap();
        assert_eq!(desc.size.width, 64);
        assert_eq!(desc.size.height, 32);
        assert_eq!(desc.size.depth_or_array_layers, 3);
        assert_eq!(desc.format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(desc.dimension, wgpu::TextureDimension::D2);
        assert_eq!(desc.mip_level_count, 7);
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 16), 9);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn test_residency_resize_and_release() {
        let mut residency = GpuResidency::default();
        residency.resize_gpu_object_buffers(2);
        residency.mark_resident(0);
        residency.mark_resident(3);
        assert_eq!(residency.context_slots(), 4);
        residency.release_gpu_objects(Some(0));
        assert!(!residency.is_resident(0));
        assert!(residency.is_resident(3));
        residency.release_gpu_objects(None);
        assert!(!residency.is_resident(3));
    }

    #[test]
    fn test_texture_def_delegates_lifecycle() {
        let mut def = SplatTextureDef {
            rgbh_atlas: Some(TextureArray::new(2, 2, 1)),
            material_atlas: None,
            lut_buffer: Some(LookupBuffer::default()),
        };
        def.resize_gpu_object_buffers(3);
        let atlas = def.rgbh_atlas.as_ref().unwrap();
        assert_eq!(atlas.residency().context_slots(), 3);
        let lut = def.lut_buffer.as_ref().unwrap();
        assert_eq!(lut.residency().context_slots(), 3);

        let atlas = def.rgbh_atlas.as_mut().unwrap();
        atlas.residency_mut().mark_resident(1);
        def.release_gpu_objects(Some(1));
        let atlas = def.rgbh_atlas.as_ref().unwrap();
        assert!(!atlas.residency().is_resident(1));
        assert!(!def.has_atlas());
    }

    #[test]
    fn test_lookup_buffer_mirrors_lod_selection() {
        let mut catalog = SplatCatalog::new();
        let mut near = SplatPrimitiveLod {
            max_level: Some(10),
            ..Default::default()
        };
        near.texture_atlas_index = Some(0);
        let far = SplatPrimitiveLod::default();
        catalog.insert_primitive(SplatPrimitive {
            name: "rock".into(),
            lods: SplatPrimitiveLodVector(vec![near, far]),
        });

        let lut = LookupBuffer::from_catalog(&catalog);
        assert_eq!(lut.range("rock"), Some(0..2));
        assert_eq!(lut.lookup("rock", 3).unwrap().atlas_index, 0);
        let far = lut.lookup("rock", 12).unwrap();
        assert_eq!(far.atlas_index, -1);
        assert_eq!(far.max_level, i32::MAX);
        assert!(lut.lookup("sand", 0).is_none());
        assert_eq!(lut.as_bytes().len(), 2 * std::mem::size_of::<LutEntry>());
    }
}
