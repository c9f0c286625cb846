//! Per-modality emotion producers.
//!
//! Producers wrap the external inference engines (facial CNN, speech LSTM).
//! They are explicitly constructed service objects handed to the pipeline,
//! so tests can swap in fakes and no model lives in a process-wide global.

mod cached;
mod exclusive;
mod model_output;

pub use cached::Cached;
pub use exclusive::{AudioEmotionModel, Exclusive, VideoEmotionModel};
pub use model_output::ModelOutputProducer;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::emotion::{EmotionDistribution, SpeechDistribution};

/// Errors reported by emotion producers
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Failed to read media {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("Model reported an error: {0}")]
    Upstream(String),

    #[error("Producer unavailable: {0}")]
    Unavailable(String),
}

/// Media handed to a producer: a recorded file or an in-memory frame/chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    File(PathBuf),
    Inline(Vec<u8>),
}

impl MediaInput {
    /// Decode a browser-style `data:<mime>;base64,<payload>` URI.
    /// A bare base64 payload without the `data:` header is also accepted.
    pub fn from_data_uri(uri: &str) -> Result<Self, ProducerError> {
        let payload = if uri.starts_with("data:") {
            uri.split_once(',')
                .map(|(_, data)| data)
                .ok_or_else(|| ProducerError::InvalidInput("data URI has no payload".to_string()))?
        } else {
            uri
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ProducerError::InvalidInput(format!("invalid base64 payload: {}", e)))?;
        Ok(Self::Inline(bytes))
    }

    /// Raw media bytes
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>, ProducerError> {
        match self {
            Self::File(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|source| ProducerError::Io {
                    path: path.clone(),
                    source,
                }),
            Self::Inline(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    /// Content address of the media: base64url(sha256(bytes))
    pub fn content_key(&self) -> Result<String, ProducerError> {
        let bytes = self.read_bytes()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => format!("{:?}", path),
            Self::Inline(bytes) => format!("<inline {} bytes>", bytes.len()),
        }
    }
}

/// Facial emotion producer over the canonical 7-label vocabulary
pub trait VideoEmotionProducer: Send + Sync {
    fn predict_video(&self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError>;
}

/// Speech emotion producer over the speech model's native 8-label vocabulary
pub trait AudioEmotionProducer: Send + Sync {
    fn predict_audio(&self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError>;
}

impl<T: VideoEmotionProducer + ?Sized> VideoEmotionProducer for Arc<T> {
    fn predict_video(&self, input: &MediaInput) -> Result<EmotionDistribution, ProducerError> {
        (**self).predict_video(input)
    }
}

impl<T: AudioEmotionProducer + ?Sized> AudioEmotionProducer for Arc<T> {
    fn predict_audio(&self, input: &MediaInput) -> Result<SpeechDistribution, ProducerError> {
        (**self).predict_audio(input)
    }
}
