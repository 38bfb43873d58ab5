//! Transcript cleaning and task construction tests.

use framesift::{TranscriptSegment, clean_segments, partition_round_robin, segment_tasks};

fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
    TranscriptSegment {
        start,
        end,
        text: text.to_string(),
    }
}

#[test]
fn zero_duration_segments_are_dropped() {
    let cleaned = clean_segments(vec![
        segment(0.0, 2.0, "hello there"),
        segment(2.0, 2.0, "glitch"),
        segment(3.0, 2.5, "backwards"),
    ]);
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].text, "hello there");
}

#[test]
fn repeated_start_segments_are_dropped() {
    let cleaned = clean_segments(vec![
        segment(0.0, 2.0, "first"),
        segment(0.0, 4.0, "duplicate start"),
        segment(4.0, 6.0, "second"),
    ]);
    let texts: Vec<&str> = cleaned.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn short_repeated_text_is_treated_as_hallucination() {
    let cleaned = clean_segments(vec![
        segment(0.0, 2.0, "uh"),
        segment(2.0, 4.0, "uh"),
        segment(4.0, 6.0, "uh"),
    ]);
    assert_eq!(cleaned.len(), 1);
}

#[test]
fn long_repeated_text_survives() {
    // Identical text is kept when the segment is long enough in both
    // duration and length — repetition in dialogue does happen.
    let cleaned = clean_segments(vec![
        segment(0.0, 6.0, "and the winner is..."),
        segment(6.0, 12.0, "and the winner is..."),
    ]);
    assert_eq!(cleaned.len(), 2);
}

#[test]
fn tasks_land_on_segment_midpoints() {
    let segments = vec![segment(0.0, 2.0, "one"), segment(10.0, 14.0, "two")];
    let tasks = segment_tasks(&segments, 25.0, 1_000);

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0], (25, "one".to_string())); // midpoint 1.0s
    assert_eq!(tasks[1], (300, "two".to_string())); // midpoint 12.0s
}

#[test]
fn midpoints_are_clamped_to_the_last_frame() {
    let segments = vec![segment(98.0, 102.0, "end credits")];
    let tasks = segment_tasks(&segments, 25.0, 2_000);
    assert_eq!(tasks[0].0, 1_999);
}

#[test]
fn zero_fps_yields_no_tasks() {
    let segments = vec![segment(0.0, 2.0, "anything")];
    assert!(segment_tasks(&segments, 0.0, 100).is_empty());
}

#[test]
fn round_robin_preserves_order_and_balances() {
    let partitions = partition_round_robin((0..10).collect::<Vec<_>>(), 4);

    assert_eq!(partitions.len(), 4);
    assert_eq!(partitions[0], vec![0, 4, 8]);
    assert_eq!(partitions[1], vec![1, 5, 9]);
    assert_eq!(partitions[2], vec![2, 6]);
    assert_eq!(partitions[3], vec![3, 7]);

    let sizes: Vec<usize> = partitions.iter().map(Vec::len).collect();
    let max = sizes.iter().max().unwrap();
    let min = sizes.iter().min().unwrap();
    assert!(max - min <= 1);
}

#[test]
fn round_robin_clamps_bucket_count() {
    let partitions = partition_round_robin(vec![1, 2, 3], 0);
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0], vec![1, 2, 3]);
}
