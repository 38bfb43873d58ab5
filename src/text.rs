//! Text normalization and similarity.
//!
//! Shared by the deduplication pass and the subtitle-band text assembly.
//! Normalization keeps ideographic scripts intact (CJK characters count as
//! alphanumeric), so mixed-language subtitles compare sensibly.

/// Normalize text for comparison.
///
/// Lowercases, strips everything that is neither alphanumeric nor
/// whitespace, and collapses whitespace runs to single spaces. Results
/// shorter than 2 characters normalize to the empty string — they carry no
/// meaningful content.
pub fn normalize_text(text: &str) -> String {
    if text.trim().chars().count() < 2 {
        return String::new();
    }

    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.chars().count() < 2 {
        String::new()
    } else {
        normalized
    }
}

/// Similarity ratio between two strings in `[0.0, 1.0]`.
///
/// `1.0` means identical; the ratio is `1 − distance/max_len` where
/// `distance` is the Levenshtein edit distance over characters.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let longest = a_chars.len().max(b_chars.len());
    if longest == 0 {
        return 1.0;
    }

    let distance = levenshtein(&a_chars, &b_chars);
    1.0 - distance as f64 / longest as f64
}

/// Whether two normalized texts differ enough to count as new content.
///
/// Both empty → same. Exactly one empty → different. Otherwise different
/// when the similarity ratio falls below `threshold`.
pub fn is_significantly_different(a: &str, b: &str, threshold: f64) -> bool {
    if a.is_empty() && b.is_empty() {
        return false;
    }
    if a.is_empty() || b.is_empty() {
        return true;
    }
    similarity_ratio(a, b) < threshold
}

/// Whether the text contains meaningful content after normalization.
pub fn has_meaningful_text(text: &str) -> bool {
    !normalize_text(text).is_empty()
}

/// Classic two-row Levenshtein distance over character slices.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution_cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j] + substitution_cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
