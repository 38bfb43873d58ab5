//! Subtitle-band inference tests.

use framesift::{SubtitleBand, TextObservation, assemble_band_text, infer_band};

fn observation(y_min: f32, y_max: f32, confidence: f32, text: &str) -> TextObservation {
    TextObservation {
        corners: [
            (10.0, y_min),
            (200.0, y_min),
            (200.0, y_max),
            (10.0, y_max),
        ],
        text: text.to_string(),
        confidence,
    }
}

#[test]
fn no_observations_falls_back_to_bottom_third() {
    let band = infer_band(&[], 480);
    assert_eq!(band.y_start, (480.0 * 0.66) as u32);
    assert_eq!(band.y_end, 480);
}

#[test]
fn low_confidence_observations_do_not_vote() {
    // Confidence at or below 0.5 is ignored, so coverage stays empty.
    let observations = vec![observation(100.0, 130.0, 0.4, "faint")];
    let band = infer_band(&observations, 480);
    assert_eq!(band.y_start, (480.0 * 0.66) as u32);
    assert_eq!(band.y_end, 480);
}

#[test]
fn implausibly_thin_band_falls_back() {
    // A 2-row band plus padding stays under 5% of a 1000-row frame.
    let observations = vec![
        observation(100.0, 102.0, 0.9, "a"),
        observation(100.0, 102.0, 0.9, "b"),
    ];
    let band = infer_band(&observations, 1000);
    assert_eq!(band.y_start, (1000.0 * 0.66) as u32);
    assert_eq!(band.y_end, 1000);
}

#[test]
fn consistent_cluster_is_detected() {
    let observations: Vec<TextObservation> = (0..8)
        .map(|i| observation(400.0, 440.0, 0.9, &format!("line {i}")))
        .collect();
    let band = infer_band(&observations, 480);

    // The detected band covers the cluster, padded, and stays in bounds.
    assert!(band.y_start <= 400);
    assert!(band.y_end >= 440);
    assert!(band.y_end <= 480);
    let fraction = band.height() as f64 / 480.0;
    assert!(fraction >= 0.05 && fraction <= 0.80, "fraction {fraction}");
}

#[test]
fn majority_cluster_wins_over_outliers() {
    let mut observations: Vec<TextObservation> = (0..6)
        .map(|i| observation(400.0, 440.0, 0.9, &format!("subtitle {i}")))
        .collect();
    // A lone on-screen title near the top should not drag the band up.
    observations.push(observation(20.0, 60.0, 0.9, "title"));

    let band = infer_band(&observations, 480);
    assert!(band.y_start >= 300, "band started at {}", band.y_start);
    assert!(band.y_end >= 440);
}

#[test]
fn overlap_must_exceed_half_the_observation_height() {
    let band = SubtitleBand {
        y_start: 100,
        y_end: 200,
    };

    // 10 of 20 rows inside: exactly half, not enough.
    assert!(!band.contains_observation(&observation(90.0, 110.0, 0.9, "edge")));
    // 15 of 20 rows inside.
    assert!(band.contains_observation(&observation(95.0, 115.0, 0.9, "in")));
    // Fully outside.
    assert!(!band.contains_observation(&observation(300.0, 320.0, 0.9, "out")));
}

#[test]
fn assemble_filters_by_band_and_confidence() {
    let band = SubtitleBand {
        y_start: 400,
        y_end: 460,
    };
    let observations = vec![
        observation(410.0, 440.0, 0.9, "hello"),
        observation(415.0, 445.0, 0.2, "noise"),
        observation(10.0, 40.0, 0.9, "title"),
        observation(420.0, 450.0, 0.8, "world"),
    ];

    assert_eq!(assemble_band_text(&observations, &band), "hello world");
}

#[test]
fn assemble_with_nothing_surviving_is_empty() {
    let band = SubtitleBand {
        y_start: 400,
        y_end: 460,
    };
    let observations = vec![observation(10.0, 40.0, 0.9, "title")];
    assert_eq!(assemble_band_text(&observations, &band), "");
}
