//! Fusion of facial and speech emotion distributions.
//!
//! The speech distribution is first translated into the canonical facial
//! vocabulary, then both are blended with fixed modality weights and the
//! blend is reduced to a single judgment.

mod mapper;
mod scorer;

pub use mapper::map_speech_distribution;
pub use scorer::{
    fuse, fuse_modalities, CompoundEmotion, FusionResult, Intensity, AUDIO_WEIGHT,
    COMPOUND_RATIO, MODERATE_THRESHOLD, STRONG_THRESHOLD, VIDEO_WEIGHT,
};

use thiserror::Error;

/// Errors that can occur during fusion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    #[error("No emotion data: both modality distributions are empty")]
    NoData,
}
