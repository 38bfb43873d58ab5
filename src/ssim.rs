//! Structural similarity between frames.
//!
//! Used by the imagery deduplication criterion: a candidate frame is only
//! novel when its similarity to the last saved frame drops below the
//! configured threshold. Frames are compared on a downsampled grayscale
//! rendition — global statistics on a small thumbnail are stable, cheap,
//! and more than discriminating enough for "did the shot change".

use image::{GrayImage, RgbImage, imageops};

/// Edge length of the downsampled comparison thumbnail.
const SAMPLE_EDGE: u32 = 64;

// Standard SSIM stabilisation constants for 8-bit dynamic range.
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Compute a structural-similarity score between two frames in `[0, 1]`.
///
/// `1.0` means structurally identical. Inputs with different dimensions are
/// comparable: both are resampled to the same thumbnail before scoring.
pub fn structural_similarity(a: &RgbImage, b: &RgbImage) -> f64 {
    let a = thumbnail_gray(a);
    let b = thumbnail_gray(b);
    ssim_global(&a, &b)
}

fn thumbnail_gray(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    imageops::resize(&gray, SAMPLE_EDGE, SAMPLE_EDGE, imageops::FilterType::Triangle)
}

/// Single-window SSIM over the full thumbnail.
fn ssim_global(a: &GrayImage, b: &GrayImage) -> f64 {
    let n = (a.width() * a.height()) as f64;

    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        sum_a += pa.0[0] as f64;
        sum_b += pb.0[0] as f64;
    }
    let mean_a = sum_a / n;
    let mean_b = sum_b / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut covariance = 0.0;
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        let da = pa.0[0] as f64 - mean_a;
        let db = pb.0[0] as f64 - mean_b;
        var_a += da * da;
        var_b += db * db;
        covariance += da * db;
    }
    var_a /= n;
    var_b /= n;
    covariance /= n;

    let luminance = (2.0 * mean_a * mean_b + C1) / (mean_a * mean_a + mean_b * mean_b + C1);
    let contrast = (2.0 * covariance + C2) / (var_a + var_b + C2);

    (luminance * contrast).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn identical_frames_score_one() {
        let frame = solid(32, 32, 128);
        let score = structural_similarity(&frame, &frame);
        assert!(score > 0.999, "score was {score}");
    }

    #[test]
    fn opposite_frames_score_low() {
        let black = solid(32, 32, 0);
        let white = solid(32, 32, 255);
        let score = structural_similarity(&black, &white);
        assert!(score < 0.05, "score was {score}");
    }

    #[test]
    fn moderately_different_frames_fall_between() {
        let dim = solid(32, 32, 100);
        let bright = solid(32, 32, 200);
        let score = structural_similarity(&dim, &bright);
        assert!(score > 0.05 && score < 0.95, "score was {score}");
    }

    #[test]
    fn mismatched_dimensions_are_comparable() {
        let small = solid(16, 16, 90);
        let large = solid(64, 48, 90);
        let score = structural_similarity(&small, &large);
        assert!(score > 0.99, "score was {score}");
    }
}
