//! The transcript-aligned pipeline.
//!
//! Instead of uniform or scene-based sampling, this variant extracts one
//! frame per transcript segment (at the segment midpoint). Tasks are
//! partitioned round-robin across a small fixed worker set — at most four,
//! to bound the number of concurrent seeks against the same file — and
//! each worker owns its own decoder, fusing seek, decode, and detailed
//! recognition before emitting into the shared results channel. The
//! aggregator is the same one the other pipelines use; here its input
//! carries observation geometry, so subtitle-band inference kicks in.

use std::{path::Path, sync::Arc};

use tokio::sync::mpsc;

use crate::{
    audio,
    decoder::FrameDecoder,
    error::SiftError,
    manifest::VideoManifest,
    media::VideoFile,
    recognize::TextRecognizer,
    transcribe::{self, Transcriber, TranscriptSegment},
};

use super::{AnalyzedFrame, ProcessOptions, ResultItem, TextPayload, aggregator};

/// Upper bound on transcript workers; each one seeks independently.
const MAX_SEEK_WORKERS: usize = 4;

/// Process a video end to end through the speech-aligned pipeline.
///
/// Extracts the audio track (one permissive retry, then fatal), runs the
/// transcription collaborator, and hands the cleaned segments to
/// [`process_with_transcript`]. The intermediate WAV file is placed in the
/// output directory and removed once transcription finishes.
pub async fn process_with_stt<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_dir: Q,
    transcriber: Arc<dyn Transcriber>,
    recognizer: Arc<dyn TextRecognizer>,
    model: &str,
    stt_language: &str,
    options: &ProcessOptions,
) -> Result<VideoManifest, SiftError> {
    let video_path = video_path.as_ref();
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let audio_path = output_dir.join("audio_16k.wav");
    audio::extract_audio_16k(video_path, &audio_path)?;

    let transcribed = transcriber.transcribe(&audio_path, model, stt_language);
    if let Err(error) = std::fs::remove_file(&audio_path) {
        log::debug!("Could not remove {}: {error}", audio_path.display());
    }
    let segments = transcribed?;

    process_with_transcript(video_path, output_dir, segments, recognizer, options).await
}

/// Process a video with an externally supplied transcript.
///
/// Segments are cleaned (hallucination filter), turned into one
/// midpoint-frame task each, and distributed round-robin over the worker
/// set. Each worker sends exactly one sentinel when its task list is
/// exhausted — also when opening its decoder failed.
pub async fn process_with_transcript<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_dir: Q,
    segments: Vec<TranscriptSegment>,
    recognizer: Arc<dyn TextRecognizer>,
    options: &ProcessOptions,
) -> Result<VideoManifest, SiftError> {
    let video_path = video_path.as_ref().to_path_buf();
    let output_dir = output_dir.as_ref();

    // Probe once for stream properties; workers open their own handles.
    let video = VideoFile::open(&video_path)?;
    let info = video.info().clone();
    let video_name = video.name();
    drop(video);

    let segments = transcribe::clean_segments(segments);
    let tasks =
        transcribe::segment_tasks(&segments, info.frames_per_second, info.frame_count);
    log::info!(
        "Transcript pipeline: {} segment(s) → {} frame task(s) for {video_name}",
        segments.len(),
        tasks.len(),
    );

    let worker_count = options.num_workers.clamp(1, MAX_SEEK_WORKERS);
    let partitions = transcribe::partition_round_robin(tasks, worker_count);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<ResultItem>();

    let mut handles = Vec::with_capacity(worker_count);
    for (worker_id, worker_tasks) in partitions.into_iter().enumerate() {
        let path = video_path.clone();
        let results = result_tx.clone();
        let recognizer = Arc::clone(&recognizer);
        let language = options.language.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            run_extractor(worker_id, &path, worker_tasks, &results, recognizer.as_ref(), &language);
        }));
    }
    drop(result_tx);

    let save_options = aggregator::SaveOptions {
        output_dir: output_dir.to_path_buf(),
        video_name: video_name.clone(),
        fps: info.frames_per_second,
        num_workers: worker_count,
        dedup_mode: options.dedup_mode,
        ssim_threshold: options.ssim_threshold,
        text_threshold: options.text_threshold,
        only_with_text: options.only_with_text,
        text_region: options.region,
        language: options.language.clone(),
    };
    let aggregator_handle =
        tokio::task::spawn_blocking(move || aggregator::run(&mut result_rx, &save_options));

    for handle in handles {
        handle
            .await
            .map_err(|error| SiftError::TaskFailed(error.to_string()))?;
    }
    aggregator_handle
        .await
        .map_err(|error| SiftError::TaskFailed(error.to_string()))?
}

/// One transcript worker: seek, decode, recognize, emit — then a sentinel.
fn run_extractor(
    worker_id: usize,
    video_path: &Path,
    tasks: Vec<(u64, String)>,
    results: &mpsc::UnboundedSender<ResultItem>,
    recognizer: &dyn TextRecognizer,
    language: &str,
) {
    let outcome = (|| -> Result<(), SiftError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let mut video = VideoFile::open(video_path)?;
        if let Err(error) = recognizer.prepare() {
            log::error!("Transcript worker {worker_id}: recognizer failed to prepare: {error}");
        }

        for (frame_number, stt_text) in tasks {
            let image = match video.frame_at(frame_number) {
                Ok(image) => image,
                Err(error) => {
                    log::warn!(
                        "Transcript worker {worker_id}: skipping frame {frame_number}: {error}"
                    );
                    continue;
                }
            };

            let observations = match recognizer.recognize_detailed(&image, language) {
                Ok(observations) => observations,
                Err(error) => {
                    log::error!(
                        "Transcript worker {worker_id}: recognition failed on frame {frame_number}: {error}"
                    );
                    Vec::new()
                }
            };

            let analyzed = AnalyzedFrame {
                frame_index: frame_number,
                image,
                payload: TextPayload::Subtitle {
                    observations,
                    stt_text,
                },
            };
            if results.send(ResultItem::Frame(analyzed)).is_err() {
                return Err(SiftError::ChannelClosed);
            }
        }

        Ok(())
    })();

    if let Err(error) = outcome {
        log::error!("Transcript worker {worker_id} stopped early: {error}");
    }

    // The sentinel goes out on every path.
    let _ = results.send(ResultItem::Done);
}
