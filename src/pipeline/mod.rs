//! The frame extraction and aggregation pipeline.
//!
//! One frame source, N analysis workers, and a single aggregator, wired
//! together with two channels: a bounded work channel (backpressure
//! against decode speed) and an unbounded results channel (the aggregator
//! must never block a worker). Shutdown is count-based: the source sends
//! one sentinel per worker, every worker forwards exactly one sentinel
//! downstream, and the aggregator stops after it has seen them all — no
//! shared counters, no polling.
//!
//! Each stage runs as a blocking task (`tokio::task::spawn_blocking`):
//! decoding and recognition are synchronous, CPU-heavy calls that must not
//! starve the async runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{NullRecognizer, ProcessOptions, SiftError};
//!
//! # async fn example() -> Result<(), SiftError> {
//! let manifest = framesift::process_video(
//!     "input.mp4",
//!     "output/input",
//!     Arc::new(NullRecognizer),
//!     &ProcessOptions::new().with_interval(30),
//! )
//! .await?;
//! println!("saved {} frames", manifest.frames_saved);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod source;
pub mod stt;
pub mod worker;

use std::{fs, path::Path, sync::Arc, time::Duration};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};

use crate::{
    conversion,
    decoder::{DecoderFactory, FrameDecoder},
    error::SiftError,
    keyframes,
    manifest::VideoManifest,
    media::VideoFile,
    recognize::{TextObservation, TextRecognizer, TextRegion},
    scene::{self, SceneOptions},
};

/// A decoded frame on its way to analysis. Ownership transfers on send.
#[derive(Debug)]
pub struct FrameSample {
    /// Frame number within the source video.
    pub frame_index: u64,
    /// The decoded RGB frame.
    pub image: RgbImage,
}

/// Text attached to an analyzed frame.
#[derive(Debug, Clone)]
pub enum TextPayload {
    /// Plain recognized text (interval / scene pipelines).
    Plain(String),
    /// Detailed recognition plus aligned speech (transcript pipeline).
    Subtitle {
        /// Text observations with geometry and confidence.
        observations: Vec<TextObservation>,
        /// Spoken text for the segment this frame represents.
        stt_text: String,
    },
}

/// A frame that has been through text recognition.
#[derive(Debug)]
pub struct AnalyzedFrame {
    /// Frame number within the source video.
    pub frame_index: u64,
    /// The decoded RGB frame.
    pub image: RgbImage,
    /// Recognition output.
    pub payload: TextPayload,
}

/// Message on the work channel (source → workers).
#[derive(Debug)]
pub enum WorkItem {
    /// A frame to analyze.
    Frame(FrameSample),
    /// The source is done; one is sent per worker.
    Done,
}

/// Message on the results channel (workers → aggregator).
#[derive(Debug)]
pub enum ResultItem {
    /// An analyzed frame.
    Frame(AnalyzedFrame),
    /// A worker is done; one is sent per worker.
    Done,
}

/// Which similarity signals gate whether a candidate frame is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Imagery similarity only.
    Ssim,
    /// Text similarity only.
    Text,
    /// Both signals; frames without meaningful text fall back to imagery
    /// alone.
    #[default]
    Both,
}

impl std::fmt::Display for DedupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DedupMode::Ssim => "ssim",
            DedupMode::Text => "text",
            DedupMode::Both => "both",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DedupMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ssim" => Ok(DedupMode::Ssim),
            "text" => Ok(DedupMode::Text),
            "both" => Ok(DedupMode::Both),
            other => Err(format!("unsupported dedup mode: {other}")),
        }
    }
}

/// How the frame source picks frames.
#[derive(Debug, Clone)]
pub enum Sampling {
    /// Every Nth frame.
    Interval(u64),
    /// Scene detection followed by per-scene keyframe selection.
    Scenes {
        /// Scene detection settings.
        scene: SceneOptions,
        /// Keyframes per scene.
        keyframes_per_scene: u64,
    },
}

/// What the frame source will actually decode.
///
/// Computed by [`process_video`] (which may run scene detection first)
/// and consumed by [`run_pipeline`].
#[derive(Debug, Clone)]
pub enum SourcePlan {
    /// Sequential sampling of every `every`-th frame, up to `limit`.
    Interval {
        /// Sampling interval.
        every: u64,
        /// Optional frame-count cap.
        limit: Option<u64>,
    },
    /// Seek-and-decode of precomputed keyframe indices.
    Keyframes(Vec<u64>),
}

/// Settings for one processing run.
///
/// All fields have defaults matching a subtitle-indexing workload; use the
/// builder methods to adjust.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Frame sampling strategy. Default: every 30th frame.
    pub sampling: Sampling,
    /// Deduplication mode. Default: [`DedupMode::Both`].
    pub dedup_mode: DedupMode,
    /// Region of the frame handed to recognition. Default: whole frame.
    pub region: TextRegion,
    /// Recognition language code. Default: `"eng"`.
    pub language: String,
    /// Number of analysis workers. Default: 4.
    pub num_workers: usize,
    /// Worker batch size. Default: 8.
    pub batch_size: usize,
    /// Imagery-similarity threshold; lower scores mean "new". Default: 0.9.
    pub ssim_threshold: f64,
    /// Text-similarity threshold; lower ratios mean "new". Default: 0.85.
    pub text_threshold: f64,
    /// Only save frames with meaningful recognized text. Default: true.
    pub only_with_text: bool,
    /// Only process the first part of the video. Default: unlimited.
    pub max_duration: Option<Duration>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            sampling: Sampling::Interval(30),
            dedup_mode: DedupMode::Both,
            region: TextRegion::All,
            language: "eng".to_string(),
            num_workers: 4,
            batch_size: 8,
            ssim_threshold: 0.9,
            text_threshold: 0.85,
            only_with_text: true,
            max_duration: None,
        }
    }
}

impl ProcessOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample every `every`-th frame.
    #[must_use]
    pub fn with_interval(mut self, every: u64) -> Self {
        self.sampling = Sampling::Interval(every);
        self
    }

    /// Sample keyframes per detected scene.
    #[must_use]
    pub fn with_scene_sampling(mut self, scene: SceneOptions, keyframes_per_scene: u64) -> Self {
        self.sampling = Sampling::Scenes {
            scene,
            keyframes_per_scene,
        };
        self
    }

    /// Set the deduplication mode.
    #[must_use]
    pub fn with_dedup_mode(mut self, mode: DedupMode) -> Self {
        self.dedup_mode = mode;
        self
    }

    /// Set the recognition region.
    #[must_use]
    pub fn with_region(mut self, region: TextRegion) -> Self {
        self.region = region;
        self
    }

    /// Set the recognition language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the number of analysis workers. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    /// Set the worker batch size. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the imagery-similarity threshold.
    #[must_use]
    pub fn with_ssim_threshold(mut self, threshold: f64) -> Self {
        self.ssim_threshold = threshold;
        self
    }

    /// Set the text-similarity threshold.
    #[must_use]
    pub fn with_text_threshold(mut self, threshold: f64) -> Self {
        self.text_threshold = threshold;
        self
    }

    /// Control whether frames without meaningful text are saved.
    #[must_use]
    pub fn with_only_with_text(mut self, only: bool) -> Self {
        self.only_with_text = only;
        self
    }

    /// Process only the first `duration` of the video.
    #[must_use]
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}

/// Process one video end to end.
///
/// Opens the video, runs scene detection when the sampling strategy asks
/// for it, and drives the source → workers → aggregator pipeline. The
/// saved frames and `metadata.json` land in `output_dir`.
///
/// # Errors
///
/// Opening failures are fatal for this video. Individual frame decode,
/// recognition, and frame-write failures are logged and degraded; they
/// never abort the run.
pub async fn process_video<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_dir: Q,
    recognizer: Arc<dyn TextRecognizer>,
    options: &ProcessOptions,
) -> Result<VideoManifest, SiftError> {
    let video_path = video_path.as_ref().to_path_buf();

    // Probe (and, for scene sampling, segment) on a throwaway handle; the
    // source task opens its own decoder on its own thread.
    let (plan, video_name, fps) = {
        let mut video = VideoFile::open(&video_path)?;
        let info = video.info().clone();
        let video_name = video.name();

        let limit = options.max_duration.map(|duration| {
            conversion::duration_to_frame_number(duration, info.frames_per_second)
        });

        let plan = match &options.sampling {
            Sampling::Interval(every) => SourcePlan::Interval {
                every: *every,
                limit,
            },
            Sampling::Scenes {
                scene,
                keyframes_per_scene,
            } => {
                let mut scene_options = scene.clone();
                if scene_options.max_duration.is_none() {
                    scene_options.max_duration = options.max_duration;
                }
                let scenes = scene::detect_scenes(&mut video, &scene_options)?;
                let mut selected = keyframes::select_keyframes(&scenes, *keyframes_per_scene);
                if let Some(limit) = limit {
                    selected.retain(|&frame| frame < limit);
                }
                SourcePlan::Keyframes(selected)
            }
        };

        (plan, video_name, info.frames_per_second)
    };

    let source_path = video_path.clone();
    let open_decoder: DecoderFactory =
        Box::new(move || Ok(Box::new(VideoFile::open(&source_path)?) as Box<dyn FrameDecoder>));

    run_pipeline(
        open_decoder,
        plan,
        recognizer,
        options,
        output_dir.as_ref(),
        &video_name,
        fps,
    )
    .await
}

/// Drive the pipeline with a caller-supplied decoder factory.
///
/// This is the testable core of [`process_video`]: any [`FrameDecoder`]
/// will do, including synthetic in-memory ones. The factory runs on the
/// source task's thread, so the decoder itself never crosses threads.
pub async fn run_pipeline(
    open_decoder: DecoderFactory,
    plan: SourcePlan,
    recognizer: Arc<dyn TextRecognizer>,
    options: &ProcessOptions,
    output_dir: &Path,
    video_name: &str,
    fps: f64,
) -> Result<VideoManifest, SiftError> {
    fs::create_dir_all(output_dir)?;
    let num_workers = options.num_workers.max(1);

    let (work_tx, work_rx) = mpsc::channel::<WorkItem>(source::WORK_CHANNEL_DEPTH);
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<ResultItem>();

    let source_handle = source::spawn(open_decoder, plan, work_tx, num_workers);
    let worker_handles = worker::spawn_pool(
        num_workers,
        Arc::new(Mutex::new(work_rx)),
        result_tx,
        recognizer,
        worker::WorkerOptions {
            batch_size: options.batch_size.max(1),
            region: options.region,
            language: options.language.clone(),
        },
    );

    let save_options = aggregator::SaveOptions {
        output_dir: output_dir.to_path_buf(),
        video_name: video_name.to_string(),
        fps,
        num_workers,
        dedup_mode: options.dedup_mode,
        ssim_threshold: options.ssim_threshold,
        text_threshold: options.text_threshold,
        only_with_text: options.only_with_text,
        text_region: options.region,
        language: options.language.clone(),
    };
    let aggregator_handle =
        tokio::task::spawn_blocking(move || aggregator::run(&mut result_rx, &save_options));

    source_handle.await.map_err(task_failed)?;
    for handle in worker_handles {
        handle.await.map_err(task_failed)?;
    }
    aggregator_handle.await.map_err(task_failed)?
}

fn task_failed(error: tokio::task::JoinError) -> SiftError {
    SiftError::TaskFailed(error.to_string())
}
