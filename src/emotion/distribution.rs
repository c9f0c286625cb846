use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

use super::vocabulary::{Emotion, SpeechEmotion, EMOTION_COUNT, SPEECH_EMOTION_COUNT};

/// Errors raised while building a distribution from raw model output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("Unknown emotion label: {0}")]
    UnknownLabel(String),

    #[error("Invalid score {score} for label {label}: scores must be finite and non-negative")]
    InvalidScore { label: String, score: f64 },

    #[error("Label {0} reported more than once")]
    DuplicateLabel(String),
}

fn check_score(label: &str, score: f64) -> Result<f64, DistributionError> {
    if score.is_finite() && score >= 0.0 {
        Ok(score)
    } else {
        Err(DistributionError::InvalidScore {
            label: label.to_string(),
            score,
        })
    }
}

/// Scores over the canonical 7-label vocabulary.
///
/// Every label is always present; labels the producer did not report read
/// as 0. Scores are finite and non-negative but need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct EmotionDistribution {
    scores: [f64; EMOTION_COUNT],
}

impl EmotionDistribution {
    /// All-zero distribution
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Build from scores in canonical order
    pub fn from_scores(scores: [f64; EMOTION_COUNT]) -> Result<Self, DistributionError> {
        for (emotion, score) in Emotion::ALL.iter().zip(scores) {
            check_score(emotion.as_str(), score)?;
        }
        Ok(Self { scores })
    }

    /// Build from (label, score) pairs. Unlisted labels are 0; a repeated
    /// label keeps its last score.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, DistributionError>
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        let mut scores = [0.0; EMOTION_COUNT];
        for (emotion, score) in pairs {
            scores[emotion.index()] = check_score(emotion.as_str(), score)?;
        }
        Ok(Self { scores })
    }

    /// Scores computed inside the crate from already-validated inputs
    pub(crate) fn from_trusted(scores: [f64; EMOTION_COUNT]) -> Self {
        Self { scores }
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.scores[emotion.index()]
    }

    /// (label, score) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.scores[e.index()]))
    }

    pub fn scores(&self) -> &[f64; EMOTION_COUNT] {
        &self.scores
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// True when at least one label carries a positive score
    pub fn has_mass(&self) -> bool {
        self.scores.iter().any(|&s| s > 0.0)
    }
}

/// Labels match case-insensitively; two spellings of one label are rejected.
impl TryFrom<BTreeMap<String, f64>> for EmotionDistribution {
    type Error = DistributionError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut scores = [0.0; EMOTION_COUNT];
        let mut seen = [false; EMOTION_COUNT];
        for (label, score) in raw {
            match label.parse::<Emotion>() {
                Ok(emotion) => {
                    let idx = emotion.index();
                    if seen[idx] {
                        return Err(DistributionError::DuplicateLabel(emotion.as_str().to_string()));
                    }
                    seen[idx] = true;
                    scores[idx] = check_score(&label, score)?;
                }
                Err(_) => tracing::debug!("Ignoring unknown facial emotion label: {}", label),
            }
        }
        Ok(Self { scores })
    }
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EMOTION_COUNT))?;
        for (emotion, score) in self.iter() {
            map.serialize_entry(emotion.as_str(), &score)?;
        }
        map.end()
    }
}

/// Scores over the speech model's native 8-label vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct SpeechDistribution {
    scores: [f64; SPEECH_EMOTION_COUNT],
}

impl SpeechDistribution {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, DistributionError>
    where
        I: IntoIterator<Item = (SpeechEmotion, f64)>,
    {
        let mut scores = [0.0; SPEECH_EMOTION_COUNT];
        for (emotion, score) in pairs {
            scores[emotion.index()] = check_score(emotion.as_str(), score)?;
        }
        Ok(Self { scores })
    }

    pub fn get(&self, emotion: SpeechEmotion) -> f64 {
        self.scores[emotion.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeechEmotion, f64)> + '_ {
        SpeechEmotion::ALL
            .iter()
            .map(move |&e| (e, self.scores[e.index()]))
    }

    pub fn has_mass(&self) -> bool {
        self.scores.iter().any(|&s| s > 0.0)
    }
}

/// Labels match case-insensitively; two spellings of one label are rejected.
impl TryFrom<BTreeMap<String, f64>> for SpeechDistribution {
    type Error = DistributionError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut scores = [0.0; SPEECH_EMOTION_COUNT];
        let mut seen = [false; SPEECH_EMOTION_COUNT];
        for (label, score) in raw {
            match label.parse::<SpeechEmotion>() {
                Ok(emotion) => {
                    let idx = emotion.index();
                    if seen[idx] {
                        return Err(DistributionError::DuplicateLabel(emotion.as_str().to_string()));
                    }
                    seen[idx] = true;
                    scores[idx] = check_score(&label, score)?;
                }
                Err(_) => tracing::debug!("Ignoring unknown speech emotion label: {}", label),
            }
        }
        Ok(Self { scores })
    }
}

impl Serialize for SpeechDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SPEECH_EMOTION_COUNT))?;
        for (emotion, score) in self.iter() {
            map.serialize_entry(emotion.as_str(), &score)?;
        }
        map.end()
    }
}
