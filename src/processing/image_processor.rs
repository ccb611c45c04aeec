use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::filter::{bilateral_filter, gaussian_blur_f32};
use imageproc::morphology::{close, open};
use imageproc::rect::Rect;

use crate::models::Side;
use crate::utils::ScanError;

/// The binarized variants handed to the OCR strategy runner, together with
/// the oriented source image they were derived from. The inverted copy is
/// only produced for the back side, where light-on-dark security print
/// sometimes transcribes better inverted.
#[derive(Debug)]
pub struct PreprocessedImage {
    pub rotated: DynamicImage,
    pub binary: GrayImage,
    pub inverted: Option<GrayImage>,
}

/// Image loading and enhancement for identity card photographs. All
/// operations return new buffers; inputs are never mutated.
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    pub fn decode(path: &Path) -> Result<DynamicImage, ScanError> {
        image::open(path)
            .map_err(|e| ScanError::ImageLoad(format!("{}: {}", path.display(), e)))
    }

    /// Produce the OCR-ready variants for one side. The back gets a harder
    /// treatment because the security-pattern background interferes with
    /// character strokes.
    pub fn preprocess(rotated: DynamicImage, side: Side) -> PreprocessedImage {
        let gray = rotated.to_luma8();
        match side {
            Side::Front => {
                let adjusted = Self::scale_abs(&gray, 1.5, 15.0);
                let blurred = gaussian_blur_f32(&adjusted, 0.8);
                let binary = Self::despeckle(&Self::adaptive_mean_threshold(&blurred, 11, 2));
                PreprocessedImage {
                    rotated,
                    binary,
                    inverted: None,
                }
            }
            Side::Back => {
                let adjusted = Self::scale_abs(&gray, 2.5, 30.0);
                let filtered = bilateral_filter(&adjusted, 11, 17.0, 17.0);
                let binary = Self::despeckle(&Self::adaptive_mean_threshold(&filtered, 15, 5));
                let mut inverted = binary.clone();
                image::imageops::invert(&mut inverted);
                PreprocessedImage {
                    rotated,
                    binary,
                    inverted: Some(inverted),
                }
            }
        }
    }

    /// Linear intensity scaling: `pixel * gain + offset`, saturating at the
    /// channel bounds.
    fn scale_abs(image: &GrayImage, gain: f32, offset: f32) -> GrayImage {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let value = pixel.0[0] as f32 * gain + offset;
            pixel.0[0] = value.clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// Adaptive thresholding against the local window mean minus a bias,
    /// using an integral image for constant-time window sums. Windows are
    /// clipped at the borders.
    fn adaptive_mean_threshold(image: &GrayImage, block_size: u32, bias: i32) -> GrayImage {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut integral = vec![0u64; stride * (height as usize + 1)];
        for y in 0..height as usize {
            let mut row_sum = 0u64;
            for x in 0..width as usize {
                row_sum += image.get_pixel(x as u32, y as u32).0[0] as u64;
                integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
            }
        }

        let radius = (block_size / 2) as i64;
        let mut out = GrayImage::new(width, height);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let x0 = (x - radius).max(0) as usize;
                let y0 = (y - radius).max(0) as usize;
                let x1 = ((x + radius).min(width as i64 - 1) + 1) as usize;
                let y1 = ((y + radius).min(height as i64 - 1) + 1) as usize;
                let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                    - integral[y0 * stride + x1]
                    - integral[y1 * stride + x0];
                let count = ((x1 - x0) * (y1 - y0)) as u64;
                let mean = (sum / count) as i32;
                let pixel = image.get_pixel(x as u32, y as u32).0[0] as i32;
                let value: u8 = if pixel > mean - bias { 255 } else { 0 };
                out.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
        out
    }

    /// Morphological close then open, removing speckle while keeping
    /// character strokes connected.
    fn despeckle(binary: &GrayImage) -> GrayImage {
        open(&close(binary, Norm::LInf, 1), Norm::LInf, 1)
    }

    /// Diagnostic overlay: Otsu-binarize, find outer contours and box every
    /// region large enough to plausibly be a text block.
    pub fn annotate_text_regions(image: &DynamicImage) -> RgbImage {
        const MIN_REGION_AREA: u32 = 500;

        let gray = image.to_luma8();
        let binary = threshold(&gray, otsu_level(&gray), ThresholdType::BinaryInverted);
        let mut annotated = image.to_rgb8();
        for contour in find_contours::<i32>(&binary) {
            if contour.border_type != BorderType::Outer || contour.points.is_empty() {
                continue;
            }
            let mut min_x = i32::MAX;
            let mut min_y = i32::MAX;
            let mut max_x = i32::MIN;
            let mut max_y = i32::MIN;
            for point in &contour.points {
                min_x = min_x.min(point.x);
                min_y = min_y.min(point.y);
                max_x = max_x.max(point.x);
                max_y = max_y.max(point.y);
            }
            let region_width = (max_x - min_x + 1) as u32;
            let region_height = (max_y - min_y + 1) as u32;
            if region_width * region_height > MIN_REGION_AREA {
                draw_hollow_rect_mut(
                    &mut annotated,
                    Rect::at(min_x, min_y).of_size(region_width, region_height),
                    Rgb([0, 255, 0]),
                );
            }
        }
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn test_scale_abs_saturates() {
        let image = flat_image(4, 4, 200);
        let scaled = ImagePreprocessor::scale_abs(&image, 1.5, 15.0);
        assert!(scaled.pixels().all(|p| p.0[0] == 255));

        let dark = flat_image(4, 4, 10);
        let scaled = ImagePreprocessor::scale_abs(&dark, 1.5, 15.0);
        assert!(scaled.pixels().all(|p| p.0[0] == 30));
    }

    #[test]
    fn test_adaptive_threshold_separates_dark_spot() {
        // Light background with a dark spot; the spot falls below the local
        // mean minus bias, the background stays above it.
        let mut image = flat_image(21, 21, 200);
        image.put_pixel(10, 10, Luma([20]));
        let binary = ImagePreprocessor::adaptive_mean_threshold(&image, 11, 2);
        assert_eq!(binary.get_pixel(10, 10).0[0], 0);
        assert_eq!(binary.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_preprocess_inverted_variant_is_back_only() {
        let image = DynamicImage::ImageLuma8(flat_image(32, 24, 128));
        let front = ImagePreprocessor::preprocess(image.clone(), Side::Front);
        assert!(front.inverted.is_none());
        assert_eq!(front.binary.dimensions(), (32, 24));

        let back = ImagePreprocessor::preprocess(image, Side::Back);
        let inverted = back.inverted.expect("back side produces an inverted copy");
        assert_eq!(inverted.dimensions(), back.binary.dimensions());
        // The inversion is an exact complement of the binary variant.
        for (a, b) in back.binary.pixels().zip(inverted.pixels()) {
            assert_eq!(a.0[0], 255 - b.0[0]);
        }
    }

    #[test]
    fn test_decode_missing_file() {
        let err = ImagePreprocessor::decode(Path::new("no_such_image.jpg")).unwrap_err();
        assert!(matches!(err, ScanError::ImageLoad(_)));
    }

    #[test]
    fn test_annotate_keeps_dimensions() {
        let image = DynamicImage::ImageLuma8(flat_image(64, 48, 255));
        let annotated = ImagePreprocessor::annotate_text_regions(&image);
        assert_eq!(annotated.dimensions(), (64, 48));
    }
}
