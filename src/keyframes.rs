//! Keyframe selection.
//!
//! Given the scene list, picks which frame indices to sample: short scenes
//! contribute every frame, longer ones an evenly spaced subset. The policy
//! favours even coverage over per-scene representativeness and is fully
//! deterministic.

use crate::scene::SceneInterval;

/// Select keyframes to extract from each scene.
///
/// For a scene of length `L = end - start`:
/// - `L ≤ keyframes_per_scene`: every frame in `start..end` is selected.
/// - otherwise: `keyframes_per_scene` frames at `start + i·⌊L/k⌋`, each
///   strictly below `end`.
///
/// The result is sorted ascending. `keyframes_per_scene` is clamped to a
/// minimum of 1.
pub fn select_keyframes(scenes: &[SceneInterval], keyframes_per_scene: u64) -> Vec<u64> {
    let per_scene = keyframes_per_scene.max(1);
    let mut keyframes = Vec::new();

    for scene in scenes {
        if scene.is_empty() {
            continue;
        }
        let length = scene.len();

        if length <= per_scene {
            keyframes.extend(scene.start..scene.end);
        } else {
            let step = length / per_scene;
            for i in 0..per_scene {
                let frame = scene.start + i * step;
                if frame < scene.end {
                    keyframes.push(frame);
                }
            }
        }
    }

    keyframes.sort_unstable();
    keyframes
}
