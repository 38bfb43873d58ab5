//! The transcription seam and transcript handling.
//!
//! Transcription is an external collaborator behind the [`Transcriber`]
//! trait. What belongs to this crate is what happens to the segments
//! afterwards: filtering out degenerate and hallucinated entries, and
//! turning each surviving segment into a frame-extraction task at its
//! midpoint.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;

/// A time-stamped transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start in seconds.
    pub start: f64,
    /// Segment end in seconds.
    pub end: f64,
    /// Transcribed text.
    pub text: String,
}

/// The audio-transcription collaborator contract.
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into time-ordered segments.
    fn transcribe(
        &self,
        audio_path: &Path,
        model: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, SiftError>;
}

/// Filter degenerate and hallucinated segments out of a raw transcript.
///
/// Drops zero/negative-duration segments, segments that repeat the
/// previous start time, and repeated short texts — a segment identical to
/// its predecessor is almost certainly a decoding loop when it is brief
/// (< 5 s) or short (< 5 characters).
pub fn clean_segments(segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let mut cleaned = Vec::with_capacity(segments.len());
    let mut last_text = String::new();
    let mut last_start = f64::MIN;

    for segment in segments {
        let duration = segment.end - segment.start;
        if duration <= 0.0 || segment.start == last_start {
            continue;
        }

        let text = segment.text.trim().to_string();
        if text == last_text && (duration < 5.0 || text.chars().count() < 5) {
            continue;
        }

        last_text = text.clone();
        last_start = segment.start;
        cleaned.push(TranscriptSegment {
            start: segment.start,
            end: segment.end,
            text,
        });
    }

    cleaned
}

/// Build one frame-extraction task per segment, at the segment midpoint.
///
/// Midpoints past the end of the video are clamped to the last frame.
/// Returns `(frame_number, segment_text)` pairs in transcript order.
pub fn segment_tasks(
    segments: &[TranscriptSegment],
    frames_per_second: f64,
    frame_count: u64,
) -> Vec<(u64, String)> {
    if frames_per_second <= 0.0 {
        return Vec::new();
    }

    segments
        .iter()
        .map(|segment| {
            let midpoint = (segment.start + segment.end) / 2.0;
            let mut frame = (midpoint * frames_per_second) as u64;
            if frame_count > 0 {
                frame = frame.min(frame_count - 1);
            }
            (frame, segment.text.clone())
        })
        .collect()
}

/// Partition items round-robin across `buckets` workers.
///
/// Order is preserved within each bucket; bucket sizes differ by at most
/// one. `buckets` is clamped to a minimum of 1.
pub fn partition_round_robin<T>(items: Vec<T>, buckets: usize) -> Vec<Vec<T>> {
    let buckets = buckets.max(1);
    let mut partitions: Vec<Vec<T>> = (0..buckets).map(|_| Vec::new()).collect();
    for (index, item) in items.into_iter().enumerate() {
        partitions[index % buckets].push(item);
    }
    partitions
}
