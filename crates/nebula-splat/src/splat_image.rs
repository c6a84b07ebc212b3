//! Decoded splat source images: pixel layout tags, normalized pixel access,
//! format conversion, resizing, and texture-array compatibility.

use glam::Vec4;
use image::imageops::FilterType;
use image::{
    ColorType, DynamicImage, GenericImage, GenericImageView, ImageBuffer, Luma, LumaA, Pixel,
    Rgb, Rgba,
};

// ---------------------------------------------------------------------------
// Layout tags
// ---------------------------------------------------------------------------

/// Channel layout of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
}

/// Per-component storage type of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    U16,
    F32,
}

/// Storage format a GPU texture should allocate for an image.
///
/// Normally derived from the pixel layout, but it can be overridden so that
/// converted images inherit the tag of the atlas reference image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Srgb8Alpha8,
    R16,
    Rg16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
}

impl InternalFormat {
    /// The tag matching a pixel format and data type, if the pair exists.
    pub fn from_layout(format: PixelFormat, data_type: DataType) -> Option<Self> {
        use DataType::*;
        use PixelFormat::*;
        match (format, data_type) {
            (Luminance, U8) => Some(Self::R8),
            (LuminanceAlpha, U8) => Some(Self::Rg8),
            (Rgb, U8) => Some(Self::Rgb8),
            (Rgba, U8) => Some(Self::Rgba8),
            (Luminance, U16) => Some(Self::R16),
            (LuminanceAlpha, U16) => Some(Self::Rg16),
            (Rgb, U16) => Some(Self::Rgb16),
            (Rgba, U16) => Some(Self::Rgba16),
            (Rgb, F32) => Some(Self::Rgb32F),
            (Rgba, F32) => Some(Self::Rgba32F),
            (Luminance | LuminanceAlpha, F32) => None,
        }
    }

    /// Equivalent wgpu texture format. Three-channel formats have none.
    pub fn to_wgpu(self) -> Option<wgpu::TextureFormat> {
        use wgpu::TextureFormat as T;
        match self {
            Self::R8 => Some(T::R8Unorm),
            Self::Rg8 => Some(T::Rg8Unorm),
            Self::Rgba8 => Some(T::Rgba8Unorm),
            Self::Srgb8Alpha8 => Some(T::Rgba8UnormSrgb),
            Self::R16 => Some(T::R16Unorm),
            Self::Rg16 => Some(T::Rg16Unorm),
            Self::Rgba16 => Some(T::Rgba16Unorm),
            Self::Rgba32F => Some(T::Rgba32Float),
            Self::Rgb8 | Self::Rgb16 | Self::Rgb32F => None,
        }
    }
}

fn layout_of(color: ColorType) -> Option<(PixelFormat, DataType)> {
    use DataType::*;
    use PixelFormat::*;
    Some(match color {
        ColorType::L8 => (Luminance, U8),
        ColorType::La8 => (LuminanceAlpha, U8),
        ColorType::Rgb8 => (Rgb, U8),
        ColorType::Rgba8 => (Rgba, U8),
        ColorType::L16 => (Luminance, U16),
        ColorType::La16 => (LuminanceAlpha, U16),
        ColorType::Rgb16 => (Rgb, U16),
        ColorType::Rgba16 => (Rgba, U16),
        ColorType::Rgb32F => (Rgb, F32),
        ColorType::Rgba32F => (Rgba, F32),
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// ImageLayout
// ---------------------------------------------------------------------------

/// Everything a texture array requires its layers to agree on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLayout {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data_type: DataType,
    pub internal_format: InternalFormat,
}

impl ImageLayout {
    /// Same pixel format, data type, and dimensions.
    pub fn is_array_compatible_with(&self, other: &ImageLayout) -> bool {
        self.pixel_format == other.pixel_format
            && self.data_type == other.data_type
            && self.width == other.width
            && self.height == other.height
    }
}

// ---------------------------------------------------------------------------
// SplatImage
// ---------------------------------------------------------------------------

/// A decoded image with explicit layout and normalized per-pixel access.
///
/// Pixels are read and written as RGBA [`Vec4`]s. Integer formats map to
/// `[0.0, 1.0]`; luminance images read as `(l, l, l, a)` and store the red
/// component on write.
#[derive(Clone, Debug)]
pub struct SplatImage {
    image: DynamicImage,
    internal_format: InternalFormat,
}

impl SplatImage {
    /// Wraps a decoded image. Returns `None` for color types without a
    /// [`PixelFormat`]/[`DataType`] equivalent.
    pub fn new(image: DynamicImage) -> Option<Self> {
        let (format, data_type) = layout_of(image.color())?;
        let internal_format = InternalFormat::from_layout(format, data_type)?;
        Some(Self {
            image,
            internal_format,
        })
    }

    /// Allocates a zero-filled image with the given layout.
    pub fn allocate(
        width: u32,
        height: u32,
        format: PixelFormat,
        data_type: DataType,
    ) -> Option<Self> {
        use DataType::*;
        use PixelFormat::*;
        let image = match (format, data_type) {
            (Luminance, U8) => DynamicImage::ImageLuma8(ImageBuffer::new(width, height)),
            (LuminanceAlpha, U8) => DynamicImage::ImageLumaA8(ImageBuffer::new(width, height)),
            (Rgb, U8) => DynamicImage::ImageRgb8(ImageBuffer::new(width, height)),
            (Rgba, U8) => DynamicImage::ImageRgba8(ImageBuffer::new(width, height)),
            (Luminance, U16) => DynamicImage::ImageLuma16(ImageBuffer::new(width, height)),
            (LuminanceAlpha, U16) => DynamicImage::ImageLumaA16(ImageBuffer::new(width, height)),
            (Rgb, U16) => DynamicImage::ImageRgb16(ImageBuffer::new(width, height)),
            (Rgba, U16) => DynamicImage::ImageRgba16(ImageBuffer::new(width, height)),
            (Rgb, F32) => DynamicImage::ImageRgb32F(ImageBuffer::new(width, height)),
            (Rgba, F32) => DynamicImage::ImageRgba32F(ImageBuffer::new(width, height)),
            (Luminance | LuminanceAlpha, F32) => return None,
        };
        Self::new(image)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Channel layout of the decoded pixels.
    pub fn pixel_format(&self) -> PixelFormat {
        self.layout().pixel_format
    }

    /// Component storage type of the decoded pixels.
    pub fn data_type(&self) -> DataType {
        self.layout().data_type
    }

    pub fn internal_format(&self) -> InternalFormat {
        self.internal_format
    }

    pub fn set_internal_format(&mut self, internal_format: InternalFormat) {
        self.internal_format = internal_format;
    }

    /// Extent, layout and internal format, as compared between array layers.
    pub fn layout(&self) -> ImageLayout {
        // `new` rejected every color type `layout_of` cannot describe.
        let (pixel_format, data_type) =
            layout_of(self.image.color()).unwrap_or((PixelFormat::Rgba, DataType::U8));
        ImageLayout {
            width: self.image.width(),
            height: self.image.height(),
            pixel_format,
            data_type,
            internal_format: self.internal_format,
        }
    }

    pub fn is_array_compatible_with(&self, other: &ImageLayout) -> bool {
        self.layout().is_array_compatible_with(other)
    }

    /// Borrows the decoded pixels.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Raw pixel bytes in row-major order, suitable for a texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    /// Converts to another layout. Returns `None` for layouts the image
    /// backend cannot store (floating-point luminance).
    ///
    /// The internal format of the result is derived from the new layout.
    pub fn convert(&self, format: PixelFormat, data_type: DataType) -> Option<Self> {
        use DataType::*;
        use PixelFormat::*;
        let converted = match (format, data_type) {
            (Luminance, U8) => DynamicImage::ImageLuma8(self.image.to_luma8()),
            (LuminanceAlpha, U8) => DynamicImage::ImageLumaA8(self.image.to_luma_alpha8()),
            (Rgb, U8) => DynamicImage::ImageRgb8(self.image.to_rgb8()),
            (Rgba, U8) => DynamicImage::ImageRgba8(self.image.to_rgba8()),
            (Luminance, U16) => DynamicImage::ImageLuma16(self.image.to_luma16()),
            (LuminanceAlpha, U16) => DynamicImage::ImageLumaA16(self.image.to_luma_alpha16()),
            (Rgb, U16) => DynamicImage::ImageRgb16(self.image.to_rgb16()),
            (Rgba, U16) => DynamicImage::ImageRgba16(self.image.to_rgba16()),
            (Rgb, F32) => DynamicImage::ImageRgb32F(self.image.to_rgb32f()),
            (Rgba, F32) => DynamicImage::ImageRgba32F(self.image.to_rgba32f()),
            (Luminance | LuminanceAlpha, F32) => return None,
        };
        Self::new(converted)
    }

    /// Converts to 8-bit RGBA, or returns `self` if it already is.
    pub fn into_rgba8(self) -> Self {
        if self.image.color() == ColorType::Rgba8 {
            return self;
        }
        Self {
            image: DynamicImage::ImageRgba8(self.image.to_rgba8()),
            internal_format: InternalFormat::Rgba8,
        }
    }

    /// Resamples to `width` x `height`, keeping the layout and internal format.
    ///
    /// Returns `None` when either the source or the target has a zero extent.
    pub fn resize(&self, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || self.width() == 0 || self.height() == 0 {
            return None;
        }
        Some(Self {
            image: self.image.resize_exact(width, height, FilterType::Triangle),
            internal_format: self.internal_format,
        })
    }

    /// Reads pixel `(x, y)` as normalized RGBA.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn read(&self, x: u32, y: u32) -> Vec4 {
        match &self.image {
            DynamicImage::ImageLuma8(img) => unorm8(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageLumaA8(img) => unorm8(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageRgb8(img) => unorm8(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageRgba8(img) => unorm8(*img.get_pixel(x, y)),
            DynamicImage::ImageLuma16(img) => unorm16(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageLumaA16(img) => unorm16(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageRgb16(img) => unorm16(img.get_pixel(x, y).to_rgba()),
            DynamicImage::ImageRgba16(img) => unorm16(*img.get_pixel(x, y)),
            DynamicImage::ImageRgb32F(img) => Vec4::from_array(img.get_pixel(x, y).to_rgba().0),
            DynamicImage::ImageRgba32F(img) => Vec4::from_array(img.get_pixel(x, y).0),
            other => unorm8(other.get_pixel(x, y)),
        }
    }

    /// Writes normalized RGBA to pixel `(x, y)`, dropping channels the layout lacks.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn write(&mut self, x: u32, y: u32, rgba: Vec4) {
        let [r, g, b, a] = rgba.to_array();
        match &mut self.image {
            DynamicImage::ImageLuma8(img) => img.put_pixel(x, y, Luma([to_u8(r)])),
            DynamicImage::ImageLumaA8(img) => img.put_pixel(x, y, LumaA([to_u8(r), to_u8(a)])),
            DynamicImage::ImageRgb8(img) => {
                img.put_pixel(x, y, Rgb([to_u8(r), to_u8(g), to_u8(b)]))
            }
            DynamicImage::ImageRgba8(img) => {
                img.put_pixel(x, y, Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(a)]))
            }
            DynamicImage::ImageLuma16(img) => img.put_pixel(x, y, Luma([to_u16(r)])),
            DynamicImage::ImageLumaA16(img) => img.put_pixel(x, y, LumaA([to_u16(r), to_u16(a)])),
            DynamicImage::ImageRgb16(img) => {
                img.put_pixel(x, y, Rgb([to_u16(r), to_u16(g), to_u16(b)]))
            }
            DynamicImage::ImageRgba16(img) => {
                img.put_pixel(x, y, Rgba([to_u16(r), to_u16(g), to_u16(b), to_u16(a)]))
            }
            DynamicImage::ImageRgb32F(img) => img.put_pixel(x, y, Rgb([r, g, b])),
            DynamicImage::ImageRgba32F(img) => img.put_pixel(x, y, Rgba([r, g, b, a])),
            other => other.put_pixel(x, y, Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(a)])),
        }
    }
}

fn unorm8(p: Rgba<u8>) -> Vec4 {
    Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / u8::MAX as f32
}

fn unorm16(p: Rgba<u16>) -> Vec4 {
    Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / u16::MAX as f32
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * u8::MAX as f32).round() as u8
}

fn to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
