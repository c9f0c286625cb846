//! Producer backed by the JSON the inference service emits.
//!
//! The facial and speech models run out of process and report their
//! predictions as JSON, either as a file next to the recording or inline
//! with a realtime frame. This adapter accepts every shape they emit.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{AudioEmotionProducer, MediaInput, ProducerError, VideoEmotionProducer};
use crate::emotion::{EmotionDistribution, SpeechDistribution};

#[derive(Deserialize)]
struct FaceOutput {
    all_emotions: EmotionDistribution,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VideoOutput {
    Failed { error: String },
    // Whole-file prediction, already averaged over every detected face
    File { emotion_distribution: EmotionDistribution },
    // Single frame; one entry per detected face
    Frame { faces: Vec<FaceOutput> },
    Bare(EmotionDistribution),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AudioOutput {
    Failed { error: String },
    File { emotion_distribution: SpeechDistribution },
    Chunk { all_emotions: SpeechDistribution },
    Bare(SpeechDistribution),
}

/// Reads model predictions from JSON media
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOutputProducer;

impl ModelOutputProducer {
    pub fn new() -> Self {
        Self
    }

    fn parse<T: for<'de> Deserialize<'de>>(input: &MediaInput) -> Result<T, ProducerError> {
        let bytes = input.read_bytes()?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ProducerError::Parse(format!("{} ({})", e, input.describe()))
        })
    }
}

impl VideoEmotionProducer for ModelOutputProducer {
    fn predict_video(&self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError> {
        match Self::parse::<VideoOutput>(input)? {
            VideoOutput::Failed { error } => Err(ProducerError::Upstream(error)),
            VideoOutput::File {
                emotion_distribution,
            } => Ok(emotion_distribution),
            VideoOutput::Frame { faces } => match faces.into_iter().next() {
                Some(face) => Ok(face.all_emotions),
                None => {
                    warn!("No face detected in {}", input.describe());
                    Ok(EmotionDistribution::zeros())
                }
            },
            VideoOutput::Bare(distribution) => {
                debug!("Bare facial distribution from {}", input.describe());
                Ok(distribution)
            }
        }
    }
}

impl AudioEmotionProducer for ModelOutputProducer {
    fn predict_audio(&self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError> {
        match Self::parse::<AudioOutput>(input)? {
            AudioOutput::Failed { error } => Err(ProducerError::Upstream(error)),
            AudioOutput::File {
                emotion_distribution,
            } => Ok(emotion_distribution),
            AudioOutput::Chunk { all_emotions } => Ok(all_emotions),
            AudioOutput::Bare(distribution) => Ok(distribution),
        }
    }
}
