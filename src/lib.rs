//! # framesift
//!
//! Sift a representative, deduplicated subset of frames out of a video
//! and pair each retained frame with recognized on-screen (and optionally
//! spoken) text, ready for subtitle/caption search indexing.
//!
//! The crate is built around a concurrent producer/consumer pipeline: a
//! frame source samples the video (by fixed interval, by detected scene
//! boundaries, or aligned to a speech transcript), a pool of workers runs
//! text recognition, and a single aggregator re-orders the results,
//! deduplicates them against the last saved frame, and persists the
//! survivors plus a JSON manifest. Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Process a video
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{NullRecognizer, ProcessOptions};
//!
//! # async fn example() -> Result<(), framesift::SiftError> {
//! let manifest = framesift::process_video(
//!     "input.mp4",
//!     "output/input",
//!     Arc::new(NullRecognizer),
//!     &ProcessOptions::new()
//!         .with_interval(30)
//!         .with_only_with_text(false),
//! )
//! .await?;
//! println!("saved {} of {} frames", manifest.frames_saved, manifest.total_frames_processed);
//! # Ok(())
//! # }
//! ```
//!
//! ### Scene-aware sampling
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{NullRecognizer, ProcessOptions, SceneOptions};
//!
//! # async fn example() -> Result<(), framesift::SiftError> {
//! let options = ProcessOptions::new().with_scene_sampling(SceneOptions::new(), 3);
//! framesift::process_video("input.mp4", "out", Arc::new(NullRecognizer), &options).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Detect scenes only
//!
//! ```no_run
//! use framesift::{SceneOptions, VideoFile, detect_scenes};
//!
//! # fn example() -> Result<(), framesift::SiftError> {
//! let mut video = VideoFile::open("input.mp4")?;
//! for scene in detect_scenes(&mut video, &SceneOptions::new())? {
//!     println!("frames {}..{}", scene.start, scene.end);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline shape
//!
//! ```text
//! segmenter/selector → frame source → [work channel, bounded]
//!     → worker pool → [results channel, unbounded] → aggregator
//!     → frame files + metadata.json
//! ```
//!
//! Shutdown is count-based: one sentinel per worker at each stage
//! boundary, so partial failures (unreadable frames, failed recognition,
//! unwritable files) can never hang the pipeline.
//!
//! ## External collaborators
//!
//! Text recognition and audio transcription are deliberately *not*
//! implemented here: bring your own backends via the [`TextRecognizer`]
//! and [`Transcriber`] traits. [`NullRecognizer`] is provided for
//! imagery-only deduplication runs.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod audio;
mod conversion;
pub mod decoder;
pub mod error;
pub mod keyframes;
pub mod manifest;
pub mod media;
pub mod pipeline;
pub mod recognize;
pub mod region;
pub mod scene;
pub mod ssim;
pub mod text;
pub mod transcribe;

pub use audio::extract_audio_16k;
pub use decoder::{DecoderFactory, FrameDecoder, FrameSink};
pub use error::SiftError;
pub use keyframes::select_keyframes;
pub use manifest::{FrameRecord, MANIFEST_FILE_NAME, VideoManifest};
pub use media::{VideoFile, VideoInfo};
pub use pipeline::{
    AnalyzedFrame, DedupMode, FrameSample, ProcessOptions, ResultItem, Sampling, SourcePlan,
    TextPayload, WorkItem, process_video, run_pipeline,
    stt::{process_with_stt, process_with_transcript},
};
pub use recognize::{NullRecognizer, TextObservation, TextRecognizer, TextRegion};
pub use region::{SubtitleBand, assemble_band_text, infer_band};
pub use scene::{
    SceneDetectionMode, SceneInterval, SceneOptions, detect_scenes, intervals_from_cuts,
};
pub use ssim::structural_similarity;
pub use text::{has_meaningful_text, is_significantly_different, normalize_text, similarity_ratio};
pub use transcribe::{
    Transcriber, TranscriptSegment, clean_segments, partition_round_robin, segment_tasks,
};
