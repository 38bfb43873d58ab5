//! Manifest round-trip tests.

use chrono::Utc;
use framesift::{
    DedupMode, FrameRecord, MANIFEST_FILE_NAME, SubtitleBand, TextRegion, VideoManifest,
};

fn sample_manifest() -> VideoManifest {
    VideoManifest {
        video_name: "episode_01".to_string(),
        total_frames_processed: 120,
        frames_saved: 2,
        dedup_mode: DedupMode::Both,
        text_region: TextRegion::Bottom,
        language: "eng".to_string(),
        ssim_threshold: 0.9,
        text_threshold: 0.85,
        subtitle_band: Some(SubtitleBand {
            y_start: 380,
            y_end: 460,
        }),
        fps: 23.976,
        generated_at: Utc::now(),
        frames: vec![
            FrameRecord {
                frame_number: 0,
                timestamp: 0.0,
                filename: "frame_000000.jpg".to_string(),
                text: "previously on".to_string(),
                stt_text: Some("previously, on the show".to_string()),
                saved_index: 0,
            },
            FrameRecord {
                frame_number: 360,
                timestamp: 15.015,
                filename: "frame_000001.jpg".to_string(),
                text: "第二幕".to_string(),
                stt_text: None,
                saved_index: 1,
            },
        ],
    }
}

#[test]
fn manifest_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(MANIFEST_FILE_NAME);

    let manifest = sample_manifest();
    manifest.save(&path).unwrap();

    let loaded = VideoManifest::load(&path).unwrap();

    assert_eq!(loaded.video_name, manifest.video_name);
    assert_eq!(loaded.total_frames_processed, 120);
    assert_eq!(loaded.frames_saved, 2);
    assert_eq!(loaded.dedup_mode, DedupMode::Both);
    assert_eq!(loaded.subtitle_band, manifest.subtitle_band);
    assert_eq!(loaded.frames.len(), manifest.frames.len());

    for (loaded_record, original) in loaded.frames.iter().zip(&manifest.frames) {
        assert_eq!(loaded_record.frame_number, original.frame_number);
        assert_eq!(loaded_record.filename, original.filename);
        assert_eq!(loaded_record.text, original.text);
        assert_eq!(loaded_record.stt_text, original.stt_text);
        assert_eq!(loaded_record.saved_index, original.saved_index);
    }
}

#[test]
fn dedup_mode_serializes_as_lowercase_string() {
    let json = serde_json::to_string(&sample_manifest()).unwrap();
    assert!(json.contains("\"dedup_mode\":\"both\""));
    assert!(json.contains("\"text_region\":\"bottom\""));
}

#[test]
fn missing_stt_text_is_omitted_from_json() {
    let manifest = sample_manifest();
    let json = serde_json::to_string_pretty(&manifest).unwrap();
    // Exactly one record carries stt_text.
    assert_eq!(json.matches("stt_text").count(), 1);
}

#[test]
fn filename_is_zero_padded() {
    assert_eq!(FrameRecord::filename_for(0), "frame_000000.jpg");
    assert_eq!(FrameRecord::filename_for(42), "frame_000042.jpg");
    assert_eq!(FrameRecord::filename_for(123_456), "frame_123456.jpg");
}
