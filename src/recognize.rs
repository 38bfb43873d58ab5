//! The text-recognition seam.
//!
//! Recognition itself is an external collaborator: the pipeline only needs
//! the [`TextRecognizer`] trait. Backends are typically heavy (model
//! loading), so [`prepare`](TextRecognizer::prepare) is called exactly once
//! per worker before its consume loop — never lazily mid-stream.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::SiftError;

/// A single piece of text located on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    /// The four corner points of the detected text box, in pixel
    /// coordinates (x, y).
    pub corners: [(f32, f32); 4],
    /// The recognized text.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextObservation {
    /// Vertical extent of the observation as `(y_min, y_max)`.
    pub fn vertical_extent(&self) -> (f32, f32) {
        let mut y_min = f32::MAX;
        let mut y_max = f32::MIN;
        for &(_, y) in &self.corners {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        (y_min, y_max)
    }
}

/// Which part of the frame to run recognition on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRegion {
    /// The whole frame.
    #[default]
    All,
    /// The top third of the frame.
    Top,
    /// The bottom third of the frame.
    Bottom,
}

impl TextRegion {
    /// Crop the frame to this region.
    ///
    /// `All` returns a copy of the full frame; `Top` and `Bottom` return
    /// the respective third.
    pub fn crop(self, image: &RgbImage) -> RgbImage {
        let height = image.height();
        let third = height / 3;
        match self {
            TextRegion::All => image.clone(),
            TextRegion::Top => {
                image::imageops::crop_imm(image, 0, 0, image.width(), third.max(1)).to_image()
            }
            TextRegion::Bottom => image::imageops::crop_imm(
                image,
                0,
                height.saturating_sub(third.max(1)),
                image.width(),
                third.max(1),
            )
            .to_image(),
        }
    }
}

impl std::fmt::Display for TextRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TextRegion::All => "all",
            TextRegion::Top => "top",
            TextRegion::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for TextRegion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "all" => Ok(TextRegion::All),
            "top" => Ok(TextRegion::Top),
            "bottom" => Ok(TextRegion::Bottom),
            other => Err(format!("unsupported text region: {other}")),
        }
    }
}

/// The text-recognition collaborator contract.
///
/// Implementations must be [`Send`] and [`Sync`]: one shared instance is
/// handed to every analysis worker.
pub trait TextRecognizer: Send + Sync {
    /// Load or warm up the backend.
    ///
    /// Called once per worker before it starts consuming frames. The
    /// default is a no-op for lightweight backends.
    fn prepare(&self) -> Result<(), SiftError> {
        Ok(())
    }

    /// Recognize text on (a region of) a frame, returning plain text.
    fn recognize(
        &self,
        image: &RgbImage,
        region: TextRegion,
        language: &str,
    ) -> Result<String, SiftError>;

    /// Recognize text with bounding boxes and confidences.
    ///
    /// Used by the transcript-aligned pipeline, which needs observation
    /// geometry for subtitle-band inference.
    fn recognize_detailed(
        &self,
        image: &RgbImage,
        language: &str,
    ) -> Result<Vec<TextObservation>, SiftError>;
}

/// A recognizer that finds no text.
///
/// Useful for imagery-only deduplication runs and for tests: every frame
/// degrades to the empty-text case.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(
        &self,
        _image: &RgbImage,
        _region: TextRegion,
        _language: &str,
    ) -> Result<String, SiftError> {
        Ok(String::new())
    }

    fn recognize_detailed(
        &self,
        _image: &RgbImage,
        _language: &str,
    ) -> Result<Vec<TextObservation>, SiftError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn crop_regions_have_expected_shapes() {
        let mut image = RgbImage::from_pixel(90, 90, Rgb([0, 0, 0]));
        // Mark the top-left pixel so Top and Bottom are distinguishable.
        image.put_pixel(0, 0, Rgb([255, 255, 255]));

        let all = TextRegion::All.crop(&image);
        assert_eq!((all.width(), all.height()), (90, 90));

        let top = TextRegion::Top.crop(&image);
        assert_eq!((top.width(), top.height()), (90, 30));
        assert_eq!(top.get_pixel(0, 0).0, [255, 255, 255]);

        let bottom = TextRegion::Bottom.crop(&image);
        assert_eq!((bottom.width(), bottom.height()), (90, 30));
        assert_eq!(bottom.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn vertical_extent_spans_all_corners() {
        let observation = TextObservation {
            corners: [(5.0, 42.0), (80.0, 40.0), (80.0, 61.0), (5.0, 63.0)],
            text: "line".to_string(),
            confidence: 0.8,
        };
        assert_eq!(observation.vertical_extent(), (40.0, 63.0));
    }

    #[test]
    fn region_round_trips_through_strings() {
        for region in [TextRegion::All, TextRegion::Top, TextRegion::Bottom] {
            let parsed: TextRegion = region.to_string().parse().unwrap();
            assert_eq!(parsed, region);
        }
        assert!("middle".parse::<TextRegion>().is_err());
    }
}
