use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{map_speech_distribution, FusionError};
use crate::emotion::{
    valence_arousal, DistributionError, Emotion, EmotionDistribution, SpeechDistribution,
    EMOTION_COUNT,
};

/// Trust weight of the facial (video) modality
pub const VIDEO_WEIGHT: f64 = 0.6;

/// Trust weight of the speech (audio) modality
pub const AUDIO_WEIGHT: f64 = 0.4;

/// A runner-up above this fraction of the dominant score forms a compound emotion
pub const COMPOUND_RATIO: f64 = 0.3;

/// Lowest confidence classified as moderate
pub const MODERATE_THRESHOLD: f64 = 0.4;

/// Lowest confidence classified as strong
pub const STRONG_THRESHOLD: f64 = 0.7;

/// Intensity band of the dominant emotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Mild,
    Moderate,
    Strong,
}

impl Intensity {
    /// Classify a confidence value. Each band includes its lower bound.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < MODERATE_THRESHOLD {
            Self::Mild
        } else if confidence < STRONG_THRESHOLD {
            Self::Moderate
        } else {
            Self::Strong
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two co-occurring emotions, rendered as `"Primary-Secondary"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompoundEmotion {
    pub primary: Emotion,
    pub secondary: Emotion,
}

impl fmt::Display for CompoundEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.primary, self.secondary)
    }
}

impl std::str::FromStr for CompoundEmotion {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (primary, secondary) = s
            .split_once('-')
            .ok_or_else(|| DistributionError::UnknownLabel(s.to_string()))?;
        Ok(Self {
            primary: primary.parse()?,
            secondary: secondary.parse()?,
        })
    }
}

impl Serialize for CompoundEmotion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompoundEmotion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Multimodal judgment produced by [`fuse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub dominant_emotion: Emotion,
    pub compound_emotion: Option<CompoundEmotion>,
    pub intensity: Intensity,
    /// Fused score of the dominant emotion
    pub confidence: f64,
    pub emotion_distribution: EmotionDistribution,
    pub valence: f64,
    pub arousal: f64,
}

/// Fuse a facial distribution with a speech distribution that has already
/// been mapped into the canonical vocabulary.
///
/// Pure and deterministic. Ties for the dominant and runner-up emotions go
/// to the label that comes first in canonical order. Returns
/// [`FusionError::NoData`] when neither input carries any positive score.
pub fn fuse(
    video: &EmotionDistribution,
    audio: &EmotionDistribution,
) -> Result<FusionResult, FusionError> {
    let mut scores = [0.0; EMOTION_COUNT];
    for emotion in Emotion::ALL {
        scores[emotion.index()] =
            VIDEO_WEIGHT * video.get(emotion) + AUDIO_WEIGHT * audio.get(emotion);
    }
    let fused = EmotionDistribution::from_trusted(scores);

    if !fused.has_mass() {
        return Err(FusionError::NoData);
    }

    // Stable sort keeps canonical order among equal scores
    let mut ranked: Vec<(Emotion, f64)> = fused.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(&(dominant, confidence)) = ranked.first() else {
        return Err(FusionError::NoData);
    };

    let compound_emotion = ranked
        .get(1)
        .filter(|(_, score)| *score > COMPOUND_RATIO * confidence)
        .map(|&(secondary, _)| CompoundEmotion {
            primary: dominant,
            secondary,
        });

    let va = valence_arousal(dominant);
    let intensity = Intensity::from_confidence(confidence);

    tracing::debug!(
        "Fused emotion: {} ({}, conf:{:.2}){}",
        dominant,
        intensity,
        confidence,
        compound_emotion
            .map(|c| format!(" compound {}", c))
            .unwrap_or_default()
    );

    Ok(FusionResult {
        dominant_emotion: dominant,
        compound_emotion,
        intensity,
        confidence,
        emotion_distribution: fused,
        valence: va.valence,
        arousal: va.arousal,
    })
}

/// Map a raw speech distribution into the canonical vocabulary, then fuse
pub fn fuse_modalities(
    video: &EmotionDistribution,
    speech: &SpeechDistribution,
) -> Result<FusionResult, FusionError> {
    fuse(video, &map_speech_distribution(speech))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::SpeechEmotion;
    use proptest::prelude::*;

    fn dist(pairs: &[(Emotion, f64)]) -> EmotionDistribution {
        EmotionDistribution::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_weighting_formula() {
        let video = dist(&[(Emotion::Happy, 0.7), (Emotion::Sad, 0.2), (Emotion::Neutral, 0.1)]);
        let audio = dist(&[(Emotion::Happy, 0.3), (Emotion::Angry, 0.5), (Emotion::Neutral, 0.2)]);
        let result = fuse(&video, &audio).unwrap();

        for emotion in Emotion::ALL {
            assert_eq!(
                result.emotion_distribution.get(emotion),
                0.6 * video.get(emotion) + 0.4 * audio.get(emotion)
            );
        }
    }

    #[test]
    fn test_fused_keys_are_canonical() {
        let result = fuse(&dist(&[(Emotion::Fear, 1.0)]), &EmotionDistribution::zeros()).unwrap();
        let labels: Vec<Emotion> = result.emotion_distribution.iter().map(|(e, _)| e).collect();
        assert_eq!(labels, Emotion::ALL.to_vec());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["emotion_distribution"].as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_compound_emotion_present() {
        // Identical inputs make the fused scores equal the inputs
        let input = dist(&[(Emotion::Happy, 0.5), (Emotion::Sad, 0.2), (Emotion::Angry, 0.1)]);
        let result = fuse(&input, &input).unwrap();

        assert_eq!(result.dominant_emotion, Emotion::Happy);
        let compound = result.compound_emotion.unwrap();
        assert_eq!(compound.to_string(), "Happy-Sad");
    }

    #[test]
    fn test_compound_emotion_absent() {
        let input = dist(&[(Emotion::Happy, 0.5), (Emotion::Sad, 0.1)]);
        let result = fuse(&input, &input).unwrap();

        assert_eq!(result.dominant_emotion, Emotion::Happy);
        assert!(result.compound_emotion.is_none());
    }

    #[test]
    fn test_compound_serializes_as_string() {
        let input = dist(&[(Emotion::Angry, 0.6), (Emotion::Disgust, 0.4)]);
        let json = serde_json::to_value(fuse(&input, &input).unwrap()).unwrap();
        assert_eq!(json["compound_emotion"], "Angry-Disgust");
        assert_eq!(json["dominant_emotion"], "Angry");

        let absent = dist(&[(Emotion::Angry, 1.0)]);
        let json = serde_json::to_value(fuse(&absent, &absent).unwrap()).unwrap();
        assert!(json["compound_emotion"].is_null());
    }

    #[test]
    fn test_tie_breaks_by_canonical_order() {
        let input = dist(&[(Emotion::Neutral, 0.4), (Emotion::Sad, 0.4), (Emotion::Happy, 0.2)]);
        let result = fuse(&input, &input).unwrap();
        assert_eq!(result.dominant_emotion, Emotion::Sad);
        assert_eq!(
            result.compound_emotion,
            Some(CompoundEmotion {
                primary: Emotion::Sad,
                secondary: Emotion::Neutral
            })
        );
    }

    #[test]
    fn test_intensity_bands() {
        assert_eq!(Intensity::from_confidence(0.39), Intensity::Mild);
        assert_eq!(Intensity::from_confidence(0.4), Intensity::Moderate);
        assert_eq!(Intensity::from_confidence(0.69), Intensity::Moderate);
        assert_eq!(Intensity::from_confidence(0.7), Intensity::Strong);
        assert_eq!(Intensity::from_confidence(0.0), Intensity::Mild);
        assert_eq!(Intensity::from_confidence(1.0), Intensity::Strong);
    }

    #[test]
    fn test_valence_arousal_follow_dominant() {
        let input = dist(&[(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)]);
        let result = fuse(&input, &input).unwrap();
        assert_eq!(result.valence, 0.9);
        assert_eq!(result.arousal, 0.6);
        assert_eq!(result.intensity, Intensity::Strong);
    }

    #[test]
    fn test_no_data() {
        let empty: EmotionDistribution = serde_json::from_str("{}").unwrap();
        assert_eq!(fuse(&empty, &empty), Err(FusionError::NoData));
        assert_eq!(
            fuse_modalities(&empty, &SpeechDistribution::zeros()),
            Err(FusionError::NoData)
        );
    }

    #[test]
    fn test_single_modality_decides() {
        // A faceless frame leaves only the speech signal
        let speech = SpeechDistribution::from_pairs([
            (SpeechEmotion::Angry, 0.9),
            (SpeechEmotion::Calm, 0.1),
        ])
        .unwrap();
        let result = fuse_modalities(&EmotionDistribution::zeros(), &speech).unwrap();
        assert_eq!(result.dominant_emotion, Emotion::Angry);
        assert!((result.confidence - 0.36).abs() < 1e-12);
        assert_eq!(result.intensity, Intensity::Mild);
    }

    #[test]
    fn test_deterministic() {
        let video = dist(&[(Emotion::Surprise, 0.45), (Emotion::Fear, 0.35), (Emotion::Happy, 0.2)]);
        let audio = dist(&[(Emotion::Fear, 0.6), (Emotion::Neutral, 0.4)]);
        let first = fuse(&video, &audio).unwrap();
        let second = fuse(&video, &audio).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
    }

    #[test]
    fn test_result_roundtrip() {
        let video = dist(&[(Emotion::Disgust, 0.8), (Emotion::Angry, 0.2)]);
        let result = fuse(&video, &video).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let restored: FusionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, result);
    }

    fn normalized() -> impl Strategy<Value = EmotionDistribution> {
        proptest::collection::vec(0.0f64..1.0, EMOTION_COUNT).prop_map(|raw| {
            let total: f64 = raw.iter().sum();
            let mut scores = [0.0; EMOTION_COUNT];
            if total > 0.0 {
                for (slot, value) in scores.iter_mut().zip(&raw) {
                    *slot = value / total;
                }
            }
            EmotionDistribution::from_scores(scores).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_confidence_is_max_and_bounded(video in normalized(), audio in normalized()) {
            match fuse(&video, &audio) {
                Ok(result) => {
                    let max = result
                        .emotion_distribution
                        .iter()
                        .map(|(_, s)| s)
                        .fold(0.0f64, f64::max);
                    prop_assert_eq!(result.confidence, max);
                    prop_assert!(result.confidence >= 0.0 && result.confidence <= 1.0 + 1e-9);
                    prop_assert_eq!(result.intensity, Intensity::from_confidence(result.confidence));
                }
                Err(FusionError::NoData) => {
                    prop_assert!(!video.has_mass() && !audio.has_mass());
                }
            }
        }

        #[test]
        fn prop_compound_never_repeats_dominant(video in normalized(), audio in normalized()) {
            if let Ok(result) = fuse(&video, &audio) {
                if let Some(compound) = result.compound_emotion {
                    prop_assert_eq!(compound.primary, result.dominant_emotion);
                    prop_assert_ne!(compound.secondary, result.dominant_emotion);
                    prop_assert!(
                        result.emotion_distribution.get(compound.secondary)
                            > COMPOUND_RATIO * result.confidence
                    );
                }
            }
        }
    }
}
