//! Image compatibility resolution for texture-array layers.
//!
//! Every layer of a texture array must share pixel format, data type, and
//! dimensions. [`ImageResolver`] fetches a channel image and brings it in line
//! with the reference layout of the current build pass, or rejects it.

use thiserror::Error;
use tracing::warn;

use crate::fetch::{FetchError, ResourceFetcher, resolve_uri};
use crate::splat_image::{ImageLayout, SplatImage};

/// Why a channel image could not be used.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The image could not be fetched or decoded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Conversion and resizing did not produce an array-compatible image.
    #[error(
        "image {uri} was found, but cannot be used because it is not compatible with other splat images (same dimensions, pixel format, etc.)"
    )]
    Incompatible {
        /// The image URI after resolution against the catalog.
        uri: String,
    },
}

/// Fetches channel images relative to a catalog and normalizes them against
/// a reference layout.
pub struct ImageResolver<'a> {
    fetcher: &'a dyn ResourceFetcher,
    base_uri: Option<&'a str>,
}

impl<'a> ImageResolver<'a> {
    /// `base_uri` is the catalog document URI relative references resolve against.
    pub fn new(fetcher: &'a dyn ResourceFetcher, base_uri: Option<&'a str>) -> Self {
        Self { fetcher, base_uri }
    }

    /// Resolves `reference`, logging and returning `None` on failure.
    pub fn resolve(&self, reference: &str, layout: Option<&ImageLayout>) -> Option<SplatImage> {
        match self.try_resolve(reference, layout) {
            Ok(image) => Some(image),
            Err(ResolveError::Fetch(err)) => {
                warn!("Image in the splat catalog failed to load: {err}");
                None
            }
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }

    /// Fetches `reference` and makes it compatible with `layout`.
    ///
    /// Images with a zero extent are rejected. Without a layout the image is
    /// the first of the pass and is returned as 8-bit RGBA so that height can
    /// be packed into its alpha channel.
    /// Otherwise an incompatible image is converted to the reference format,
    /// resized to the reference dimensions, and tagged with the reference
    /// internal format.
    pub fn try_resolve(
        &self,
        reference: &str,
        layout: Option<&ImageLayout>,
    ) -> Result<SplatImage, ResolveError> {
        let uri = resolve_uri(self.base_uri, reference);
        let image = self.fetcher.fetch_image(&uri)?;
        let incompatible = || ResolveError::Incompatible { uri: uri.clone() };

        if image.width() == 0 || image.height() == 0 {
            return Err(incompatible());
        }

        let Some(layout) = layout else {
            return Ok(image.into_rgba8());
        };

        if image.is_array_compatible_with(layout) {
            return Ok(image);
        }

        let mut converted = image
            .convert(layout.pixel_format, layout.data_type)
            .ok_or_else(incompatible)?;

        if converted.width() != layout.width || converted.height() != layout.height {
            converted = converted
                .resize(layout.width, layout.height)
                .ok_or_else(incompatible)?;
        }

        if !converted.is_array_compatible_with(layout) {
            return Err(incompatible());
        }

        converted.set_internal_format(layout.internal_format);
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::splat_image::{DataType, InternalFormat, PixelFormat};
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn reference_layout() -> ImageLayout {
        ImageLayout {
            width: 8,
            height: 8,
            pixel_format: PixelFormat::Rgba,
            data_type: DataType::U8,
            internal_format: InternalFormat::Srgb8Alpha8,
        }
    }

    #[test]
    fn test_first_image_is_promoted_to_rgba8() {
        let fetcher =
            MemoryFetcher::new().with_image("d.png", RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        let resolver = ImageResolver::new(&fetcher, None);
        let image = resolver.resolve("d.png", None).unwrap();
        assert_eq!(image.pixel_format(), PixelFormat::Rgba);
        assert_eq!(image.data_type(), DataType::U8);
        assert_eq!((image.width(), image.height()), (4, 4));
    }

    #[test]
    fn test_compatible_image_is_returned_unchanged() {
        let fetcher = MemoryFetcher::new()
            .with_image("n.png", RgbaImage::from_pixel(8, 8, Rgba([5, 6, 7, 8])));
        let resolver = ImageResolver::new(&fetcher, None);
        let layout = reference_layout();
        let image = resolver.resolve("n.png", Some(&layout)).unwrap();
        assert_eq!(image.internal_format(), InternalFormat::Rgba8);
        assert_eq!(&image.as_bytes()[..4], &[5, 6, 7, 8]);
    }

    #[test]
    fn test_incompatible_image_is_converted_and_resized() {
        let fetcher =
            MemoryFetcher::new().with_image("h.png", GrayImage::from_pixel(16, 4, Luma([200])));
        let resolver = ImageResolver::new(&fetcher, None);
        let layout = reference_layout();
        let image = resolver.resolve("h.png", Some(&layout)).unwrap();
        assert!(image.is_array_compatible_with(&layout));
        assert_eq!(image.internal_format(), InternalFormat::Srgb8Alpha8);
        assert_eq!(&image.as_bytes()[..4], &[200, 200, 200, 255]);
    }

    #[test]
    fn test_missing_image_resolves_to_none() {
        let fetcher = MemoryFetcher::new();
        let resolver = ImageResolver::new(&fetcher, None);
        assert!(resolver.resolve("missing.png", None).is_none());
        assert!(matches!(
            resolver.try_resolve("missing.png", None),
            Err(ResolveError::Fetch(FetchError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_unrecoverable_image_is_rejected() {
        let fetcher = MemoryFetcher::new().with_image("empty.png", RgbaImage::new(0, 0));
        let resolver = ImageResolver::new(&fetcher, None);
        let layout = reference_layout();
        assert!(matches!(
            resolver.try_resolve("empty.png", Some(&layout)),
            Err(ResolveError::Incompatible { .. })
        ));
        assert!(resolver.resolve("empty.png", Some(&layout)).is_none());
    }

    #[test]
    fn test_zero_extent_first_image_is_rejected() {
        let fetcher = MemoryFetcher::new().with_image("empty.png", RgbaImage::new(0, 0));
        let resolver = ImageResolver::new(&fetcher, None);
        assert!(matches!(
            resolver.try_resolve("empty.png", None),
            Err(ResolveError::Incompatible { uri }) if uri == "empty.png"
        ));
    }

    #[test]
    fn test_references_resolve_against_base_uri() {
        let fetcher = MemoryFetcher::new().with_image("splat/rock.png", RgbaImage::new(2, 2));
        let resolver = ImageResolver::new(&fetcher, Some("splat/catalog.ron"));
        assert!(resolver.resolve("rock.png", None).is_some());
    }
}
