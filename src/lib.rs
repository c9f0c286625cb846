//! Multimodal emotion fusion.
//!
//! Blends a facial-emotion distribution and a speech-emotion distribution
//! into a single judgment: dominant emotion, optional compound emotion,
//! intensity band, confidence and a valence/arousal pair.

pub mod cache;
pub mod config;
pub mod emotion;
pub mod fusion;
pub mod pipeline;
pub mod producer;
pub mod session;
pub mod timeline;


pub use emotion::{
    valence_arousal, DistributionError, Emotion, EmotionDistribution, SpeechDistribution,
    SpeechEmotion, ValenceArousal,
};
pub use fusion::{
    fuse, fuse_modalities, map_speech_distribution, CompoundEmotion, FusionError, FusionResult,
    Intensity,
};
pub use pipeline::{AnalysisMode, FusionPipeline, FusionRecord, PipelineError};
pub use producer::{AudioEmotionProducer, MediaInput, ProducerError, VideoEmotionProducer};
