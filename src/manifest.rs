//! The persisted per-video manifest.
//!
//! One [`VideoManifest`] is written per processed video (as
//! `metadata.json` in the video's output directory) after the whole
//! aggregation pass completes — never partially. It records what was
//! processed, the configuration in effect, and one [`FrameRecord`] per
//! saved frame, ordered by frame number.

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::SiftError, pipeline::DedupMode, recognize::TextRegion, region::SubtitleBand,
};

/// File name of the manifest inside a video's output directory.
pub const MANIFEST_FILE_NAME: &str = "metadata.json";

/// A saved frame, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame number within the source video.
    pub frame_number: u64,
    /// Timestamp in seconds (`frame_number / fps`).
    pub timestamp: f64,
    /// Image file name, derived from `saved_index`.
    pub filename: String,
    /// Recognized on-screen text for this frame.
    pub text: String,
    /// Spoken text aligned with this frame, when the transcript pipeline
    /// produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt_text: Option<String>,
    /// Zero-based save order; contiguous and increasing with
    /// `frame_number`.
    pub saved_index: u64,
}

impl FrameRecord {
    /// The image file name for a given save index.
    pub fn filename_for(saved_index: u64) -> String {
        format!("frame_{saved_index:06}.jpg")
    }
}

/// The per-video metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoManifest {
    /// Name of the source video (file stem).
    pub video_name: String,
    /// Number of analyzed frames that reached the aggregator.
    pub total_frames_processed: u64,
    /// Number of frames that survived deduplication and were written.
    pub frames_saved: u64,
    /// Deduplication mode in effect.
    pub dedup_mode: DedupMode,
    /// Configured recognition region.
    pub text_region: TextRegion,
    /// Recognition language code.
    pub language: String,
    /// Imagery-similarity threshold in effect.
    pub ssim_threshold: f64,
    /// Text-similarity threshold in effect.
    pub text_threshold: f64,
    /// The subtitle band inferred for this video, when the transcript
    /// pipeline ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_band: Option<SubtitleBand>,
    /// Source frame rate.
    pub fps: f64,
    /// When the manifest was generated.
    pub generated_at: DateTime<Utc>,
    /// The saved frames, ordered by `frame_number`.
    pub frames: Vec<FrameRecord>,
}

impl VideoManifest {
    /// Write the manifest as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SiftError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!(
            "Wrote manifest for {} ({} of {} frame(s) saved)",
            self.video_name,
            self.frames_saved,
            self.total_frames_processed,
        );
        Ok(())
    }

    /// Read a manifest back from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SiftError> {
        let json = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}
