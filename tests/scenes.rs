//! Scene interval assembly tests.

use framesift::intervals_from_cuts;

#[test]
fn no_cuts_yields_single_interval() {
    let intervals = intervals_from_cuts(&[], 100, 15);
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, 0);
    assert_eq!(intervals[0].end, 100);
}

#[test]
fn cuts_split_the_video() {
    let intervals = intervals_from_cuts(&[30, 60], 100, 15);
    let bounds: Vec<(u64, u64)> = intervals.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0, 30), (30, 60), (60, 100)]);
}

#[test]
fn close_cuts_are_dropped() {
    // The cut at 35 is only 5 frames after the accepted one at 30.
    let intervals = intervals_from_cuts(&[30, 35, 60], 100, 15);
    let bounds: Vec<(u64, u64)> = intervals.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0, 30), (30, 60), (60, 100)]);
}

#[test]
fn short_tail_merges_into_last_scene() {
    let intervals = intervals_from_cuts(&[30, 90], 100, 15);
    // 100 - 90 = 10 < 15, so the tail joins the scene that started at 30.
    let bounds: Vec<(u64, u64)> = intervals.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0, 30), (30, 100)]);
}

#[test]
fn intervals_are_ordered_and_non_overlapping() {
    let intervals = intervals_from_cuts(&[20, 21, 47, 90, 150, 151, 400], 500, 15);

    let mut previous_end = 0;
    for interval in &intervals {
        assert_eq!(
            interval.start, previous_end,
            "intervals must tile without gaps"
        );
        assert!(interval.start < interval.end);
        previous_end = interval.end;
    }
    assert_eq!(previous_end, 500);
}

#[test]
fn cuts_past_the_end_are_ignored() {
    let intervals = intervals_from_cuts(&[50, 120], 100, 15);
    let bounds: Vec<(u64, u64)> = intervals.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0, 50), (50, 100)]);
}

#[test]
fn empty_video_yields_no_intervals() {
    assert!(intervals_from_cuts(&[10], 0, 15).is_empty());
}
