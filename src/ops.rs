//! Local raster post-processing operations.
//!
//! Byte-in/byte-out wrappers over the `image` crate: crop, resize, format
//! conversion, and brightness/contrast/saturation adjustment. The output
//! keeps the input encoding except for [`convert`].

use crate::error::{ImagenxError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Output encodings supported by [`convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// PNG (lossless).
    Png,
    /// JPEG (lossy, no alpha).
    Jpeg,
    /// WebP (lossless encoder).
    WebP,
}

impl OutputFormat {
    /// Maps a file extension to an output format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// The canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    fn to_image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

fn decode(data: &[u8]) -> Result<(DynamicImage, ImageFormat)> {
    let format = image::guess_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;
    Ok((img, format))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    // JPEG cannot carry an alpha channel
    if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut out, format)?;
    } else {
        img.write_to(&mut out, format)?;
    }
    Ok(out.into_inner())
}

/// Crops the region at `(x, y)` with the given dimensions.
///
/// The region must lie entirely within the source image.
pub fn crop(data: &[u8], x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(ImagenxError::InvalidRequest(
            "crop dimensions must be positive".into(),
        ));
    }

    let (img, format) = decode(data)?;
    let (src_w, src_h) = (img.width(), img.height());
    let in_bounds = x.checked_add(width).map_or(false, |right| right <= src_w)
        && y.checked_add(height).map_or(false, |bottom| bottom <= src_h);
    if !in_bounds {
        return Err(ImagenxError::InvalidRequest(format!(
            "crop region {x},{y} {width}x{height} exceeds source bounds {src_w}x{src_h}"
        )));
    }

    encode(&img.crop_imm(x, y, width, height), format)
}

/// Resizes to exactly `width` x `height` with Lanczos3 filtering.
pub fn resize(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(ImagenxError::InvalidRequest(
            "resize dimensions must be positive".into(),
        ));
    }
    let (img, format) = decode(data)?;
    encode(&img.resize_exact(width, height, FilterType::Lanczos3), format)
}

/// Re-encodes the image in the requested format.
pub fn convert(data: &[u8], format: OutputFormat) -> Result<Vec<u8>> {
    let (img, _) = decode(data)?;
    encode(&img, format.to_image_format())
}

/// Adjusts brightness, contrast, and saturation in one pass.
///
/// `brightness` is an additive offset per channel (-255..=255, 0 = no
/// change); `contrast` a percentage delta (0.0 = no change); `saturation` a
/// multiplier around per-pixel luma (1.0 = no change, 0.0 = grayscale).
pub fn adjust(data: &[u8], brightness: i32, contrast: f32, saturation: f32) -> Result<Vec<u8>> {
    let (img, format) = decode(data)?;
    let mut rgba = img.to_rgba8();

    if brightness != 0 {
        rgba = image::imageops::brighten(&rgba, brightness);
    }
    if contrast != 0.0 {
        rgba = image::imageops::contrast(&rgba, contrast);
    }
    if (saturation - 1.0).abs() > f32::EPSILON {
        apply_saturation(&mut rgba, saturation);
    }

    encode(&DynamicImage::ImageRgba8(rgba), format)
}

/// Blends each pixel against its Rec. 601 luma; alpha is untouched.
fn apply_saturation(img: &mut RgbaImage, factor: f32) {
    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        let mix = |c: u8| (luma + (f32::from(c) - luma) * factor).clamp(0.0, 255.0) as u8;
        *pixel = image::Rgba([mix(r), mix(g), mix(b), a]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// A 4x4 PNG with a red/blue checker pattern.
    fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 40, 40, 255])
            } else {
                Rgba([40, 40, 200, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_crop_dimensions() {
        let cropped = crop(&sample_png(), 1, 1, 2, 2).unwrap();
        let img = image::load_from_memory(&cropped).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        // Output keeps the input encoding
        assert_eq!(image::guess_format(&cropped).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let err = crop(&sample_png(), 2, 2, 4, 4).unwrap_err();
        assert!(matches!(err, ImagenxError::InvalidRequest(_)));

        let err = crop(&sample_png(), 0, 0, 0, 4).unwrap_err();
        assert!(matches!(err, ImagenxError::InvalidRequest(_)));
    }

    #[test]
    fn test_crop_overflow_is_rejected() {
        assert!(crop(&sample_png(), u32::MAX, 0, 2, 2).is_err());
    }

    #[test]
    fn test_resize_dimensions() {
        let resized = resize(&sample_png(), 8, 2).unwrap();
        let img = image::load_from_memory(&resized).unwrap();
        assert_eq!((img.width(), img.height()), (8, 2));
    }

    #[test]
    fn test_convert_to_jpeg() {
        let jpeg = convert(&sample_png(), OutputFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_convert_to_webp() {
        let webp = convert(&sample_png(), OutputFormat::WebP).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_adjust_zero_saturation_is_grayscale() {
        let gray = adjust(&sample_png(), 0, 0.0, 0.0).unwrap();
        let img = image::load_from_memory(&gray).unwrap().to_rgba8();
        for pixel in img.pixels() {
            let [r, g, b, _] = pixel.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn test_adjust_brightness() {
        let black = RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(black)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();

        let brighter = adjust(&out.into_inner(), 50, 0.0, 1.0).unwrap();
        let img = image::load_from_memory(&brighter).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0[0], 60);
    }

    #[test]
    fn test_adjust_identity_keeps_pixels() {
        let unchanged = adjust(&sample_png(), 0, 0.0, 1.0).unwrap();
        let original = image::load_from_memory(&sample_png()).unwrap().to_rgba8();
        let result = image::load_from_memory(&unchanged).unwrap().to_rgba8();
        assert_eq!(original.as_raw(), result.as_raw());
    }

    #[test]
    fn test_invalid_data_is_rejected() {
        assert!(matches!(
            crop(b"not an image", 0, 0, 1, 1).unwrap_err(),
            ImagenxError::Image(_)
        ));
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_extension("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("webp"), Some(OutputFormat::WebP));
        assert_eq!(OutputFormat::from_extension("gif"), None);
    }
}
