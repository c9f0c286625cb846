use serde::{Deserialize, Serialize};

use super::Emotion;

/// Position of an emotion on the circumplex, both axes in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValenceArousal {
    pub valence: f64,
    pub arousal: f64,
}

impl ValenceArousal {
    pub fn new(valence: f64, arousal: f64) -> Self {
        Self { valence, arousal }
    }
}

/// Fixed valence/arousal coordinates for each canonical emotion.
/// Exact lookup; there is no interpolation between emotions.
pub fn valence_arousal(emotion: Emotion) -> ValenceArousal {
    match emotion {
        Emotion::Angry => ValenceArousal::new(-0.8, 0.8),
        Emotion::Disgust => ValenceArousal::new(-0.6, 0.2),
        Emotion::Fear => ValenceArousal::new(-0.7, 0.7),
        Emotion::Happy => ValenceArousal::new(0.9, 0.6),
        Emotion::Sad => ValenceArousal::new(-0.7, -0.4),
        Emotion::Surprise => ValenceArousal::new(0.4, 0.8),
        Emotion::Neutral => ValenceArousal::new(0.0, 0.0),
    }
}
