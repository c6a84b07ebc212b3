//! Per-LOD channel compositing.
//!
//! Each LOD entry yields two RGBA layers:
//!
//! - color+height: diffuse RGB, height in alpha;
//! - material: `(normal.x, normal.y, smoothness, ao)`.
//!
//! Missing channels fall back to fixed defaults.

use glam::Vec4;
use tracing::debug;

use crate::catalog::SplatPrimitiveLod;
use crate::resolver::ImageResolver;
use crate::splat_image::{ImageLayout, InternalFormat, SplatImage};

/// Alpha of the color+height layer when no height image is available.
pub const DEFAULT_HEIGHT: f32 = 0.0;

/// Material texel without any source channel: flat normal, mid smoothness, low AO.
pub const DEFAULT_MATERIAL: Vec4 = Vec4::new(0.5, 0.5, 0.25, 0.20);

/// Smoothness of primitives named [`WATER_PRIMITIVE`] that declare neither
/// smoothness nor roughness.
pub const WATER_SMOOTHNESS: f32 = 0.65;

/// Primitive name that gets water smoothness.
pub const WATER_PRIMITIVE: &str = "water";

/// The two layers produced for one LOD entry.
#[derive(Clone, Debug)]
pub struct CompositedLod {
    /// Diffuse RGB with height in alpha.
    pub color_height: SplatImage,
    /// Normal XY, smoothness and ambient occlusion.
    pub material: SplatImage,
}

/// Composites LOD entries for one build pass.
///
/// The first diffuse image that resolves fixes the reference layout every
/// later image of the pass is checked against.
pub struct ChannelCompositor<'a> {
    resolver: ImageResolver<'a>,
    reference: Option<ImageLayout>,
}

impl<'a> ChannelCompositor<'a> {
    /// Starts a pass with no reference layout.
    pub fn new(resolver: ImageResolver<'a>) -> Self {
        Self {
            resolver,
            reference: None,
        }
    }

    /// Layout established by the first composited diffuse image, if any.
    pub fn reference(&self) -> Option<&ImageLayout> {
        self.reference.as_ref()
    }

    /// Composites `lod`, which belongs to the primitive named `primitive_name`.
    ///
    /// Returns `None` when the entry has no diffuse reference or the diffuse
    /// image cannot be resolved.
    pub fn composite(
        &mut self,
        primitive_name: &str,
        lod: &SplatPrimitiveLod,
    ) -> Option<CompositedLod> {
        let diffuse_uri = lod.diffuse.as_deref()?;
        let mut color_height = self.resolver.resolve(diffuse_uri, self.reference.as_ref())?;
        let reference = *self.reference.get_or_insert_with(|| color_height.layout());

        let height = self.resolve_channel(lod.height.as_deref(), &reference);
        encode_height(&mut color_height, height.as_ref());

        let material = self.build_material(primitive_name, lod, &reference)?;

        debug!(
            primitive = primitive_name,
            diffuse = diffuse_uri,
            has_height = height.is_some(),
            "Composited splat LOD"
        );

        Some(CompositedLod {
            color_height,
            material,
        })
    }

    fn resolve_channel(&self, uri: Option<&str>, reference: &ImageLayout) -> Option<SplatImage> {
        uri.and_then(|uri| self.resolver.resolve(uri, Some(reference)))
    }

    fn build_material(
        &self,
        primitive_name: &str,
        lod: &SplatPrimitiveLod,
        reference: &ImageLayout,
    ) -> Option<SplatImage> {
        let mut material = SplatImage::allocate(
            reference.width,
            reference.height,
            reference.pixel_format,
            reference.data_type,
        )?;
        material.set_internal_format(InternalFormat::Rgba8);

        let normal = self.resolve_channel(lod.normal.as_deref(), reference);
        let smooth = self.resolve_channel(lod.smoothness.as_deref(), reference);
        let rough = self.resolve_channel(lod.roughness.as_deref(), reference);
        let ao = self.resolve_channel(lod.ao.as_deref(), reference);
        let is_water = primitive_name == WATER_PRIMITIVE;

        for y in 0..material.height() {
            for x in 0..material.width() {
                let mut texel = DEFAULT_MATERIAL;

                if let Some(normal) = &normal {
                    let n = normal.read(x, y);
                    texel.x = n.x;
                    texel.y = n.y;
                }

                if let Some(smooth) = &smooth {
                    texel.z = smooth.read(x, y).x;
                } else if let Some(rough) = &rough {
                    texel.z = 1.0 - rough.read(x, y).x;
                } else if is_water {
                    texel.z = WATER_SMOOTHNESS;
                }

                if let Some(ao) = &ao {
                    texel.w = ao.read(x, y).x;
                }

                material.write(x, y, texel);
            }
        }

        Some(material)
    }
}

/// Replaces the alpha channel of `color` with the red channel of `height`,
/// or with [`DEFAULT_HEIGHT`].
fn encode_height(color: &mut SplatImage, height: Option<&SplatImage>) {
    for y in 0..color.height() {
        for x in 0..color.width() {
            let mut rgbh = color.read(x, y);
            rgbh.w = height.map_or(DEFAULT_HEIGHT, |h| h.read(x, y).x);
            color.write(x, y, rgbh);
        }
    }
}
