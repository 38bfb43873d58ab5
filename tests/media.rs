//! FFmpeg-backed decoder tests.
//!
//! These require a fixture video at `tests/fixtures/sample_video.mp4`
//! (see `tests/fixtures/generate_fixtures.sh`) and are skipped when it is
//! absent.

use std::{path::Path, sync::Arc};

use framesift::{
    DedupMode, FrameDecoder, ProcessOptions, SceneOptions, SiftError, TextObservation,
    TextRecognizer, TextRegion, TranscriptSegment, VideoFile, detect_scenes,
    process_with_transcript,
};
use image::RgbImage;

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[test]
fn open_reports_stream_properties() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let video = VideoFile::open(path).expect("Failed to open fixture");
    let info = video.info();
    assert!(info.width > 0);
    assert!(info.height > 0);
    assert!(info.frames_per_second > 0.0);
    assert!(info.frame_count > 0);
    assert_eq!(video.name(), "sample_video");
}

#[test]
fn open_missing_file_fails() {
    let result = VideoFile::open("tests/fixtures/does_not_exist.mp4");
    assert!(result.is_err());
}

#[test]
fn interval_sampling_visits_every_nth_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let mut visited = Vec::new();
    video
        .for_each_sampled(10, None, &mut |frame_number, image| {
            assert!(image.width() > 0);
            visited.push(frame_number);
            Ok(())
        })
        .expect("Sampling failed");

    assert!(!visited.is_empty());
    assert!(visited.iter().all(|n| n % 10 == 0));
    let mut sorted = visited.clone();
    sorted.sort_unstable();
    assert_eq!(visited, sorted);
}

#[test]
fn targeted_extraction_returns_requested_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let mut visited = Vec::new();
    video
        .for_each_at(&[0, 5, 20], &mut |frame_number, _| {
            visited.push(frame_number);
            Ok(())
        })
        .expect("Extraction failed");

    assert!(!visited.is_empty());
}

#[test]
fn scene_detection_covers_the_video() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let frame_count = video.info().frame_count;
    let scenes =
        detect_scenes(&mut video, &SceneOptions::new()).expect("Scene detection failed");

    assert!(!scenes.is_empty());
    assert_eq!(scenes.first().unwrap().start, 0);
    assert_eq!(scenes.last().unwrap().end, frame_count);

    let mut previous_end = 0;
    for scene in &scenes {
        assert_eq!(scene.start, previous_end);
        previous_end = scene.end;
    }
}

/// A deterministic stand-in OCR backend: reports one bottom-of-frame
/// observation whose text depends on the frame content.
struct BottomBannerRecognizer;

impl TextRecognizer for BottomBannerRecognizer {
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
        image: &RgbImage,
        _language: &str,
    ) -> Result<Vec<TextObservation>, SiftError> {
        let height = image.height() as f32;
        let shade = image.get_pixel(image.width() / 2, image.height() / 2).0[0];
        Ok(vec![TextObservation {
            corners: [
                (10.0, height * 0.90),
                (200.0, height * 0.90),
                (200.0, height * 0.95),
                (10.0, height * 0.95),
            ],
            text: format!("banner shade {shade}"),
            confidence: 0.9,
        }])
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn transcript_pipeline_runs_end_to_end() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let segments = vec![
        TranscriptSegment {
            start: 0.0,
            end: 2.0,
            text: "first spoken line".to_string(),
        },
        TranscriptSegment {
            start: 6.0,
            end: 8.0,
            text: "second spoken line".to_string(),
        },
    ];

    let options = ProcessOptions::new()
        .with_workers(2)
        .with_dedup_mode(DedupMode::Text)
        .with_only_with_text(false);

    let manifest = process_with_transcript(
        path,
        dir.path(),
        segments,
        Arc::new(BottomBannerRecognizer),
        &options,
    )
    .await
    .expect("transcript pipeline failed");

    assert_eq!(manifest.total_frames_processed, 2);
    assert!(manifest.subtitle_band.is_some());
    assert!(manifest.frames_saved >= 1);
    let first = &manifest.frames[0];
    assert!(first.stt_text.is_some());
    assert!(first.text.starts_with("banner shade"));
}

#[test]
fn audio_extraction_produces_a_wav_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let wav_path = dir.path().join("audio_16k.wav");

    match framesift::extract_audio_16k(path, &wav_path) {
        Ok(()) => {
            let metadata = std::fs::metadata(&wav_path).expect("WAV file missing");
            assert!(metadata.len() > 44, "WAV should contain samples");
        }
        // The fixture may be silent video.
        Err(framesift::SiftError::NoAudioStream) => {}
        Err(error) => panic!("Audio extraction failed: {error}"),
    }
}
