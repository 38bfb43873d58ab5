//! Subtitle-band inference.
//!
//! The transcript-aligned pipeline collects text observations across the
//! whole video, then estimates the horizontal band of rows where subtitles
//! live. The band is computed once from the fully collected data and
//! reused to re-filter every frame's observations during the save pass —
//! it is never recomputed mid-stream.

use serde::{Deserialize, Serialize};

use crate::recognize::TextObservation;

/// Observations must exceed this confidence to vote on the band.
pub const BAND_CONFIDENCE: f32 = 0.5;

/// Observations must exceed this confidence to contribute text.
pub const TEXT_CONFIDENCE: f32 = 0.3;

/// Rows whose coverage reaches this fraction of the peak join the band.
const COVERAGE_FRACTION: f64 = 0.5;

/// Padding added above and below the detected band, as a fraction of the
/// frame height.
const BAND_PADDING: f64 = 0.02;

/// Plausibility bounds on the band height as a fraction of frame height.
const MIN_BAND_FRACTION: f64 = 0.05;
const MAX_BAND_FRACTION: f64 = 0.80;

/// A horizontal band of image rows, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleBand {
    /// First row of the band (inclusive).
    pub y_start: u32,
    /// Row after the last row of the band (exclusive).
    pub y_end: u32,
}

impl SubtitleBand {
    /// The fallback band: the bottom third of the frame.
    pub fn bottom_third(height: u32) -> Self {
        Self {
            y_start: (height as f64 * 0.66) as u32,
            y_end: height,
        }
    }

    /// Band height in rows.
    pub fn height(&self) -> u32 {
        self.y_end.saturating_sub(self.y_start)
    }

    /// Whether an observation's vertical extent overlaps this band by more
    /// than half the observation's own height.
    pub fn contains_observation(&self, observation: &TextObservation) -> bool {
        let (y_min, y_max) = observation.vertical_extent();
        let observation_height = y_max - y_min;
        if observation_height <= 0.0 {
            return false;
        }
        let overlap = (self.y_end as f32).min(y_max) - (self.y_start as f32).max(y_min);
        overlap > observation_height * 0.5
    }
}

/// Infer the subtitle band from all observations collected for a video.
///
/// Builds a per-row coverage histogram from the vertical extents of
/// confident observations, grows a band outward from the peak row while
/// coverage stays at ≥ 50% of the maximum, pads it slightly, and clips it
/// to the frame. Falls back to the bottom third when there is nothing to
/// work with or the result is implausibly thin or tall.
pub fn infer_band(observations: &[TextObservation], height: u32) -> SubtitleBand {
    if height == 0 {
        return SubtitleBand { y_start: 0, y_end: 0 };
    }

    let mut coverage = vec![0u32; height as usize];
    for observation in observations {
        if observation.confidence <= BAND_CONFIDENCE {
            continue;
        }
        let (y_min, y_max) = observation.vertical_extent();
        let from = (y_min.max(0.0) as usize).min(height as usize);
        let to = (y_max.max(0.0) as usize).min(height as usize);
        for row in &mut coverage[from..to] {
            *row += 1;
        }
    }

    let peak_coverage = coverage.iter().copied().max().unwrap_or(0);
    if peak_coverage == 0 {
        log::debug!("No confident observations; falling back to bottom third");
        return SubtitleBand::bottom_third(height);
    }

    let cutoff = (peak_coverage as f64 * COVERAGE_FRACTION).ceil() as u32;
    let peak_row = coverage
        .iter()
        .position(|&c| c == peak_coverage)
        .unwrap_or(0);

    let mut band_start = peak_row;
    while band_start > 0 && coverage[band_start - 1] >= cutoff {
        band_start -= 1;
    }
    let mut band_end = peak_row + 1;
    while band_end < coverage.len() && coverage[band_end] >= cutoff {
        band_end += 1;
    }

    let padding = (height as f64 * BAND_PADDING) as usize;
    let y_start = band_start.saturating_sub(padding) as u32;
    let y_end = ((band_end + padding) as u32).min(height);

    let band = SubtitleBand { y_start, y_end };
    let band_fraction = band.height() as f64 / height as f64;
    if !(MIN_BAND_FRACTION..=MAX_BAND_FRACTION).contains(&band_fraction) {
        log::debug!(
            "Inferred band {}..{} is implausible ({:.1}% of height); falling back to bottom third",
            band.y_start,
            band.y_end,
            band_fraction * 100.0,
        );
        return SubtitleBand::bottom_third(height);
    }

    log::info!(
        "Inferred subtitle band: rows {}..{} of {height}",
        band.y_start,
        band.y_end,
    );
    band
}

/// Assemble a frame's subtitle text from the observations that survive the
/// band filter and the text-confidence gate.
pub fn assemble_band_text(observations: &[TextObservation], band: &SubtitleBand) -> String {
    let parts: Vec<&str> = observations
        .iter()
        .filter(|observation| {
            observation.confidence > TEXT_CONFIDENCE && band.contains_observation(observation)
        })
        .map(|observation| observation.text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    parts.join(" ")
}
