use tracing::debug;

use super::{AudioEmotionProducer, MediaInput, ProducerError, VideoEmotionProducer};
use crate::cache::{CacheStats, LruCache};
use crate::emotion::{EmotionDistribution, SpeechDistribution};

/// Memoizes a producer's predictions by media content hash.
///
/// Only successful predictions are cached; errors always reach the caller.
pub struct Cached<P, V> {
    inner: P,
    cache: LruCache<String, V>,
}

impl<P, V: Clone> Cached<P, V> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            cache: LruCache::new(capacity),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn get_or_predict(
        &self,
        input: &MediaInput,
        predict: impl FnOnce(&P) -> Result<V, ProducerError>,
    ) -> Result<V, ProducerError> {
        let key = input.content_key()?;

        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "Prediction cache HIT");
            return Ok(hit);
        }

        debug!(key = %key, "Prediction cache MISS");
        let value = predict(&self.inner)?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }
}

impl<P: VideoEmotionProducer> VideoEmotionProducer for Cached<P, EmotionDistribution> {
    fn predict_video(&self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError> {
        self.get_or_predict(input, |inner| inner.predict_video(input))
    }
}

impl<P: AudioEmotionProducer> AudioEmotionProducer for Cached<P, SpeechDistribution> {
    fn predict_audio(&self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError> {
        self.get_or_predict(input, |inner| inner.predict_audio(input))
    }
}
