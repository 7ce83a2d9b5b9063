//! Image preprocessing module
//!
//! Prepares decoded images for the recognition engine:
//! - Grayscale conversion
//! - Contrast measurement
//! - Contrast stretching for washed-out inputs

use crate::types::RecognitionParams;
use image::{DynamicImage, GrayImage};
use imageproc::stats::percentile;

/// Contrast of a grayscale image in [0, 1]
///
/// Measured as the spread between the 10th and 90th intensity percentiles,
/// which ignores isolated specks and glare.
pub fn measure_contrast(image: &GrayImage) -> f32 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }
    let low = percentile(image, 10);
    let high = percentile(image, 90);
    f32::from(high.saturating_sub(low)) / 255.0
}

/// Linearly map the `[p10, p90]` band so its spread becomes `target` (0-1),
/// centered on mid-gray
pub fn stretch_contrast(image: &GrayImage, target: f32) -> GrayImage {
    let low = f32::from(percentile(image, 10));
    let high = f32::from(percentile(image, 90));
    let spread = high - low;
    if spread <= 0.0 {
        // Flat image, nothing to stretch
        return image.clone();
    }

    let target_spread = target.clamp(0.0, 1.0) * 255.0;
    let out_low = 127.5 - target_spread / 2.0;
    let scale = target_spread / spread;

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = out_low + (f32::from(pixel.0[0]) - low) * scale;
        pixel.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Convert to grayscale and enhance contrast when it falls below `contrast_ths`
pub fn prepare_for_recognition(input: &DynamicImage, params: &RecognitionParams) -> GrayImage {
    let gray = input.to_luma8();
    let contrast = measure_contrast(&gray);

    if contrast < params.contrast_ths {
        tracing::debug!(
            contrast,
            target = params.adjust_contrast,
            "Low contrast input, stretching"
        );
        stretch_contrast(&gray, params.adjust_contrast)
    } else {
        gray
    }
}
