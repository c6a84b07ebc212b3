//! Splat atlas construction: composites every LOD entry of a catalog into one
//! texture array and assigns each entry its layer index.

use tracing::{info, warn};

use crate::catalog::SplatCatalog;
use crate::compositor::ChannelCompositor;
use crate::fetch::ResourceFetcher;
use crate::resolver::ImageResolver;
use crate::splat_image::SplatImage;
use crate::texture_def::{LookupBuffer, SamplerSettings, SplatTextureDef, TextureArray};

// ---------------------------------------------------------------------------
// AtlasBuilder
// ---------------------------------------------------------------------------

/// Builds [`SplatTextureDef`]s from catalogs.
///
/// Each composited LOD entry occupies two consecutive layers: color+height at
/// the entry's atlas index and material right after it.
pub struct AtlasBuilder<'a> {
    fetcher: &'a dyn ResourceFetcher,
}

impl<'a> AtlasBuilder<'a> {
    /// Channel images are fetched through `fetcher`.
    pub fn new(fetcher: &'a dyn ResourceFetcher) -> Self {
        Self { fetcher }
    }

    /// Composites `catalog` into a texture array.
    ///
    /// Atlas indices from earlier builds are cleared first, so rebuilding the
    /// same catalog assigns the same indices. Entries that produce no images
    /// keep an unset index. When no entry produces images the returned def
    /// has no atlas.
    pub fn build(&self, catalog: &mut SplatCatalog) -> SplatTextureDef {
        catalog.reset_atlas_indices();

        let base_uri = catalog.base_uri().map(str::to_owned);
        let mut compositor =
            ChannelCompositor::new(ImageResolver::new(self.fetcher, base_uri.as_deref()));

        let mut layers: Vec<SplatImage> = Vec::new();
        for (name, primitive) in catalog.primitives_mut() {
            for lod in primitive.lods.iter_mut() {
                let Some(composited) = compositor.composite(name, lod) else {
                    continue;
                };
                lod.texture_atlas_index = Some(layers.len() as u32);
                layers.push(composited.color_height);
                layers.push(composited.material);
            }
        }

        let mut def = SplatTextureDef::default();
        let Some(first) = layers.first() else {
            return def;
        };

        let mut array = TextureArray::new(first.width(), first.height(), layers.len() as u32)
            .with_sampler(SamplerSettings::SPLAT_ATLAS);
        for (layer, image) in layers.into_iter().enumerate() {
            if let Err(err) = array.set_image(layer as u32, image) {
                warn!("Skipping splat atlas layer: {err}");
            }
        }

        info!(
            "Catalog \"{}\" atlas size = {}",
            catalog.name.as_deref().unwrap_or_default(),
            array.layer_count()
        );

        def.rgbh_atlas = Some(array);
        def.lut_buffer = Some(LookupBuffer::from_catalog(catalog));
        def
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
