use std::sync::Mutex;

use super::{AudioEmotionProducer, MediaInput, ProducerError, VideoEmotionProducer};
use crate::emotion::{EmotionDistribution, SpeechDistribution};

/// Facial inference engine that needs exclusive access while predicting
pub trait VideoEmotionModel: Send {
    fn infer_video(&mut self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError>;
}

/// Speech inference engine that needs exclusive access while predicting
pub trait AudioEmotionModel: Send {
    fn infer_audio(&mut self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError>;
}

/// Shares a non-reentrant model between threads.
///
/// Inference calls are serialized on an internal mutex; everything
/// downstream of the producer (mapping, fusion) stays lock-free.
pub struct Exclusive<M> {
    model: Mutex<M>,
}

impl<M> Exclusive<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }

    /// Take the model back, e.g. to unload it
    pub fn into_inner(self) -> Result<M, ProducerError> {
        self.model
            .into_inner()
            .map_err(|_| ProducerError::Unavailable("model lock poisoned".to_string()))
    }

    fn with_model<T>(
        &self,
        f: impl FnOnce(&mut M) -> Result<T, ProducerError>,
    ) -> Result<T, ProducerError> {
        let mut model = self.model.lock().map_err(|_| {
            tracing::error!("Model lock poisoned by a panicked inference call");
            ProducerError::Unavailable("model lock poisoned".to_string())
        })?;
        f(&mut model)
    }
}

impl<M: VideoEmotionModel> VideoEmotionProducer for Exclusive<M> {
    fn predict_video(&self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError> {
        self.with_model(|model| model.infer_video(input))
    }
}

impl<M: AudioEmotionModel> AudioEmotionProducer for Exclusive<M> {
    fn predict_audio(&self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError> {
        self.with_model(|model| model.infer_audio(input))
    }
}
