//! Aggregator tests.
//!
//! These drive the aggregator directly through its results channel, which
//! lets arrival order, sentinel counting, and dedup decisions be exercised
//! without a decoder or recognizer in the loop.

use std::path::Path;

use framesift::{
    AnalyzedFrame, DedupMode, MANIFEST_FILE_NAME, ResultItem, TextObservation, TextPayload,
    TextRegion,
    pipeline::aggregator::{self, SaveOptions},
};
use image::{Rgb, RgbImage};
use tokio::sync::mpsc;

fn solid(value: u8) -> RgbImage {
    RgbImage::from_pixel(32, 32, Rgb([value, value, value]))
}

fn plain_frame(frame_index: u64, value: u8, text: &str) -> ResultItem {
    ResultItem::Frame(AnalyzedFrame {
        frame_index,
        image: solid(value),
        payload: TextPayload::Plain(text.to_string()),
    })
}

fn save_options(output_dir: &Path, num_workers: usize, mode: DedupMode) -> SaveOptions {
    SaveOptions {
        output_dir: output_dir.to_path_buf(),
        video_name: "test_video".to_string(),
        fps: 25.0,
        num_workers,
        dedup_mode: mode,
        ssim_threshold: 0.9,
        text_threshold: 0.85,
        only_with_text: false,
        text_region: TextRegion::All,
        language: "eng".to_string(),
    }
}

#[test]
fn records_are_sorted_with_contiguous_indices_despite_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Shuffled arrival, as if workers finished out of submission order.
    for &(frame, value, text) in &[
        (90u64, 10u8, "ninety"),
        (30, 80, "thirty"),
        (120, 160, "one twenty"),
        (0, 240, "zero"),
        (60, 40, "sixty"),
    ] {
        tx.send(plain_frame(frame, value, text)).unwrap();
    }
    tx.send(ResultItem::Done).unwrap();
    tx.send(ResultItem::Done).unwrap();
    drop(tx);

    // Thresholds that accept everything: only ordering is under test.
    let mut options = save_options(dir.path(), 2, DedupMode::Ssim);
    options.ssim_threshold = 1.1;

    let manifest = aggregator::run(&mut rx, &options).unwrap();

    assert_eq!(manifest.total_frames_processed, 5);
    assert_eq!(manifest.frames_saved, 5);

    let frame_numbers: Vec<u64> = manifest.frames.iter().map(|r| r.frame_number).collect();
    assert_eq!(frame_numbers, vec![0, 30, 60, 90, 120]);

    for (expected_index, record) in manifest.frames.iter().enumerate() {
        assert_eq!(record.saved_index, expected_index as u64);
        assert_eq!(
            record.filename,
            format!("frame_{expected_index:06}.jpg")
        );
        assert!(dir.path().join(&record.filename).exists());
    }
}

#[test]
fn identical_text_is_saved_once() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    tx.send(plain_frame(0, 100, "same subtitle line")).unwrap();
    tx.send(plain_frame(30, 200, "same subtitle line")).unwrap();
    tx.send(ResultItem::Done).unwrap();
    drop(tx);

    let options = save_options(dir.path(), 1, DedupMode::Text);
    let manifest = aggregator::run(&mut rx, &options).unwrap();

    assert_eq!(manifest.total_frames_processed, 2);
    assert_eq!(manifest.frames_saved, 1);
    assert_eq!(manifest.frames[0].frame_number, 0);
}

#[test]
fn zero_frames_with_three_workers_terminates_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for _ in 0..3 {
        tx.send(ResultItem::Done).unwrap();
    }
    drop(tx);

    let options = save_options(dir.path(), 3, DedupMode::Both);
    let manifest = aggregator::run(&mut rx, &options).unwrap();

    assert_eq!(manifest.total_frames_processed, 0);
    assert_eq!(manifest.frames_saved, 0);
    assert!(manifest.frames.is_empty());
    assert!(dir.path().join(MANIFEST_FILE_NAME).exists());
}

#[test]
fn only_with_text_drops_textless_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    tx.send(plain_frame(0, 20, "")).unwrap();
    tx.send(plain_frame(30, 220, "actual words")).unwrap();
    tx.send(ResultItem::Done).unwrap();
    drop(tx);

    let mut options = save_options(dir.path(), 1, DedupMode::Both);
    options.only_with_text = true;

    let manifest = aggregator::run(&mut rx, &options).unwrap();
    assert_eq!(manifest.frames_saved, 1);
    assert_eq!(manifest.frames[0].frame_number, 30);
}

#[test]
fn both_mode_uses_imagery_alone_for_empty_text() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Same text, very different imagery: `both` requires text AND imagery
    // to differ when text is present, so the second frame is rejected.
    tx.send(plain_frame(0, 20, "caption")).unwrap();
    tx.send(plain_frame(30, 230, "caption")).unwrap();
    // Empty text falls back to imagery alone, and frame 60 looks like 0.
    tx.send(plain_frame(60, 235, "")).unwrap();
    tx.send(ResultItem::Done).unwrap();
    drop(tx);

    let options = save_options(dir.path(), 1, DedupMode::Both);
    let manifest = aggregator::run(&mut rx, &options).unwrap();

    let frame_numbers: Vec<u64> = manifest.frames.iter().map(|r| r.frame_number).collect();
    assert_eq!(frame_numbers, vec![0, 60]);
}

fn subtitle_frame(
    frame_index: u64,
    value: u8,
    stt_text: &str,
    observations: Vec<TextObservation>,
) -> ResultItem {
    ResultItem::Frame(AnalyzedFrame {
        frame_index,
        image: RgbImage::from_pixel(320, 240, Rgb([value, value, value])),
        payload: TextPayload::Subtitle {
            observations,
            stt_text: stt_text.to_string(),
        },
    })
}

fn bottom_observation(text: &str) -> TextObservation {
    TextObservation {
        corners: [(20.0, 200.0), (300.0, 200.0), (300.0, 225.0), (20.0, 225.0)],
        text: text.to_string(),
        confidence: 0.9,
    }
}

fn top_observation(text: &str) -> TextObservation {
    TextObservation {
        corners: [(20.0, 10.0), (300.0, 10.0), (300.0, 35.0), (20.0, 35.0)],
        text: text.to_string(),
        confidence: 0.9,
    }
}

#[test]
fn subtitle_frames_outside_the_band_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Three frames vote the band to the bottom of the frame; the fourth
    // only has a top-of-frame title, so its text does not survive the
    // band filter and the frame is dropped outright.
    tx.send(subtitle_frame(0, 10, "first line", vec![bottom_observation("alpha one")]))
        .unwrap();
    tx.send(subtitle_frame(30, 90, "second line", vec![bottom_observation("bravo two")]))
        .unwrap();
    tx.send(subtitle_frame(60, 170, "third line", vec![bottom_observation("charlie three")]))
        .unwrap();
    tx.send(subtitle_frame(90, 250, "spoken only", vec![top_observation("station logo")]))
        .unwrap();
    tx.send(ResultItem::Done).unwrap();
    drop(tx);

    let options = save_options(dir.path(), 1, DedupMode::Text);
    let manifest = aggregator::run(&mut rx, &options).unwrap();

    let band = manifest.subtitle_band.expect("band should be inferred");
    assert!(band.y_start >= 120, "band started at {}", band.y_start);

    let frame_numbers: Vec<u64> = manifest.frames.iter().map(|r| r.frame_number).collect();
    assert_eq!(frame_numbers, vec![0, 30, 60]);

    assert_eq!(manifest.frames[0].text, "alpha one");
    assert_eq!(manifest.frames[0].stt_text.as_deref(), Some("first line"));
}
