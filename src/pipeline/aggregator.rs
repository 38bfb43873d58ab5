//! The aggregator (saver).
//!
//! The single consumer at the end of the pipeline. It drains the results
//! channel until every worker has signalled completion, infers the
//! subtitle band (transcript pipeline only), re-orders everything by frame
//! number — workers finish out of submission order, and sequential
//! deduplication is only meaningful on a temporally sorted stream — and
//! then makes one pass: filter, dedup against the last *saved* frame,
//! write accepted frames to disk, and finally write the manifest.
//!
//! The manifest is written exactly once, after the pass completes.

use std::{fs, path::PathBuf};

use chrono::Utc;
use image::RgbImage;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    error::SiftError,
    manifest::{FrameRecord, MANIFEST_FILE_NAME, VideoManifest},
    recognize::{TextObservation, TextRegion},
    region::{self, SubtitleBand},
    ssim, text,
};

use super::{DedupMode, ResultItem, TextPayload};

/// Settings for the aggregation and save pass.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Directory receiving frame images and the manifest.
    pub output_dir: PathBuf,
    /// Name of the source video.
    pub video_name: String,
    /// Source frame rate, for timestamps.
    pub fps: f64,
    /// Number of workers feeding the results channel — the number of
    /// sentinels to wait for.
    pub num_workers: usize,
    /// Deduplication mode.
    pub dedup_mode: DedupMode,
    /// Imagery-similarity threshold.
    pub ssim_threshold: f64,
    /// Text-similarity threshold.
    pub text_threshold: f64,
    /// Only save frames with meaningful text.
    pub only_with_text: bool,
    /// Configured recognition region (echoed into the manifest).
    pub text_region: TextRegion,
    /// Recognition language (echoed into the manifest).
    pub language: String,
}

/// The last frame that was actually saved.
struct LastSaved {
    image: RgbImage,
    text: String,
}

/// Drain the results channel and run the save pass.
///
/// Blocks until `num_workers` sentinels have arrived (a closed channel
/// counts as "everyone is gone"). Always writes a manifest, even when
/// nothing was collected — an empty run is still a valid result.
pub fn run(
    results: &mut UnboundedReceiver<ResultItem>,
    options: &SaveOptions,
) -> Result<VideoManifest, SiftError> {
    let expected_sentinels = options.num_workers.max(1);

    // Collection: everything is gathered before any decision is made.
    let mut collected = Vec::new();
    let mut finished_workers = 0usize;
    while finished_workers < expected_sentinels {
        match results.blocking_recv() {
            Some(ResultItem::Frame(frame)) => collected.push(frame),
            Some(ResultItem::Done) => finished_workers += 1,
            None => {
                log::warn!(
                    "Results channel closed after {finished_workers}/{expected_sentinels} sentinel(s)"
                );
                break;
            }
        }
    }

    log::info!(
        "Collected {} analyzed frame(s) for {}",
        collected.len(),
        options.video_name,
    );

    // Region inference, once, from the fully collected observations.
    let band = infer_band_from(&collected);

    // Mandatory temporal re-ordering before sequential dedup.
    collected.sort_by_key(|frame| frame.frame_index);

    fs::create_dir_all(&options.output_dir)?;

    let total_processed = collected.len() as u64;
    let mut last_saved: Option<LastSaved> = None;
    let mut records: Vec<FrameRecord> = Vec::new();

    for frame in collected {
        let (frame_text, stt_text) = match &frame.payload {
            TextPayload::Plain(text) => (text.trim().to_string(), None),
            TextPayload::Subtitle {
                observations,
                stt_text,
            } => {
                let assembled = match &band {
                    Some(band) => region::assemble_band_text(observations, band),
                    None => String::new(),
                };
                (assembled, Some(stt_text.clone()))
            }
        };

        // Transcript pipeline: a frame whose observations do not survive
        // the band filter is dropped outright, regardless of dedup mode.
        if matches!(frame.payload, TextPayload::Subtitle { .. }) && frame_text.trim().is_empty() {
            continue;
        }

        if !should_save(&frame.image, &frame_text, last_saved.as_ref(), options) {
            continue;
        }

        let saved_index = records.len() as u64;
        let filename = FrameRecord::filename_for(saved_index);
        let path = options.output_dir.join(&filename);
        if let Err(error) = frame.image.save(&path) {
            // The pass continues; this frame is simply not part of the
            // manifest.
            log::error!("Failed to write {}: {error}", path.display());
            continue;
        }

        let timestamp = if options.fps > 0.0 {
            frame.frame_index as f64 / options.fps
        } else {
            0.0
        };
        records.push(FrameRecord {
            frame_number: frame.frame_index,
            timestamp,
            filename,
            text: frame_text.clone(),
            stt_text,
            saved_index,
        });
        last_saved = Some(LastSaved {
            image: frame.image,
            text: frame_text,
        });
    }

    let manifest = VideoManifest {
        video_name: options.video_name.clone(),
        total_frames_processed: total_processed,
        frames_saved: records.len() as u64,
        dedup_mode: options.dedup_mode,
        text_region: options.text_region,
        language: options.language.clone(),
        ssim_threshold: options.ssim_threshold,
        text_threshold: options.text_threshold,
        subtitle_band: band,
        fps: options.fps,
        generated_at: Utc::now(),
        frames: records,
    };
    manifest.save(options.output_dir.join(MANIFEST_FILE_NAME))?;

    Ok(manifest)
}

/// Collect qualifying observations and infer the subtitle band.
///
/// Returns `None` when no frame carries detailed observations (plain
/// pipeline) — the band concept does not apply there.
fn infer_band_from(collected: &[super::AnalyzedFrame]) -> Option<SubtitleBand> {
    let mut observations: Vec<TextObservation> = Vec::new();
    let mut height = 0u32;
    let mut any_subtitle = false;

    for frame in collected {
        if let TextPayload::Subtitle {
            observations: frame_observations,
            ..
        } = &frame.payload
        {
            any_subtitle = true;
            height = height.max(frame.image.height());
            observations.extend(frame_observations.iter().cloned());
        }
    }

    if !any_subtitle {
        return None;
    }
    Some(region::infer_band(&observations, height))
}

/// The deduplication decision.
///
/// The `both` mode's asymmetry is deliberate and load-bearing: frames with
/// meaningful text must differ in text *and* imagery, frames without text
/// fall back to imagery alone.
fn should_save(
    image: &RgbImage,
    frame_text: &str,
    last_saved: Option<&LastSaved>,
    options: &SaveOptions,
) -> bool {
    if options.only_with_text && !text::has_meaningful_text(frame_text) {
        return false;
    }

    // The first accepted frame has nothing to be compared against.
    let Some(last) = last_saved else {
        return true;
    };

    let normalized = text::normalize_text(frame_text);
    let normalized_last = text::normalize_text(&last.text);

    match options.dedup_mode {
        DedupMode::Ssim => {
            ssim::structural_similarity(image, &last.image) < options.ssim_threshold
        }
        DedupMode::Text => {
            !normalized.is_empty()
                && text::is_significantly_different(
                    &normalized,
                    &normalized_last,
                    options.text_threshold,
                )
        }
        DedupMode::Both => {
            let imagery_differs =
                ssim::structural_similarity(image, &last.image) < options.ssim_threshold;
            if normalized.is_empty() {
                imagery_differs
            } else {
                imagery_differs
                    && text::is_significantly_different(
                        &normalized,
                        &normalized_last,
                        options.text_threshold,
                    )
            }
        }
    }
}
