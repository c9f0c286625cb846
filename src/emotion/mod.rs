//! Emotion vocabularies, score distributions and the valence/arousal table.

mod distribution;
mod valence;
mod vocabulary;

pub use distribution::{DistributionError, EmotionDistribution, SpeechDistribution};
pub use valence::{valence_arousal, ValenceArousal};
pub use vocabulary::{Emotion, SpeechEmotion, EMOTION_COUNT, SPEECH_EMOTION_COUNT};
