//! Runs both producers and fuses their output into a timestamped record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::emotion::{EmotionDistribution, SpeechDistribution};
use crate::fusion::{fuse_modalities, FusionError, FusionResult};
use crate::producer::{AudioEmotionProducer, MediaInput, ProducerError, VideoEmotionProducer};

/// Errors that can occur while analyzing a media pair
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Video producer failed")]
    Video(#[source] ProducerError),

    #[error("Audio producer failed")]
    Audio(#[source] ProducerError),

    #[error(transparent)]
    Fusion(#[from] FusionError),
}

/// How the inputs were captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Whole recorded files, one aggregate prediction per modality
    File,
    /// A single frame and audio chunk
    Realtime,
}

/// A fused judgment plus the inputs it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionRecord {
    pub id: Uuid,
    pub mode: AnalysisMode,
    pub created_at: DateTime<Utc>,
    /// Position within the session (0 for file-level analyses)
    pub offset_ms: u64,
    #[serde(flatten)]
    pub result: FusionResult,
    pub video_distribution: EmotionDistribution,
    pub audio_distribution: SpeechDistribution,
}

/// Fusion pipeline over injected video and audio producers
#[derive(Clone)]
pub struct FusionPipeline {
    video: Arc<dyn VideoEmotionProducer>,
    audio: Arc<dyn AudioEmotionProducer>,
}

impl FusionPipeline {
    pub fn new(
        video: Arc<dyn VideoEmotionProducer>,
        audio: Arc<dyn AudioEmotionProducer>,
    ) -> Self {
        Self { video, audio }
    }

    /// Analyze a recorded video file and its audio track.
    ///
    /// Each producer runs once over its whole file; any frame-by-frame
    /// averaging happens inside the producer.
    pub fn analyze_files(
        &self,
        video_path: &Path,
        audio_path: &Path,
    ) -> Result<FusionRecord, PipelineError> {
        info!("Analyzing files: video={:?} audio={:?}", video_path, audio_path);
        self.analyze(
            AnalysisMode::File,
            &MediaInput::File(video_path.to_path_buf()),
            &MediaInput::File(audio_path.to_path_buf()),
            0,
        )
    }

    /// Analyze one frame and the audio chunk captured alongside it
    pub fn analyze_realtime(
        &self,
        frame: &MediaInput,
        chunk: &MediaInput,
        offset_ms: u64,
    ) -> Result<FusionRecord, PipelineError> {
        self.analyze(AnalysisMode::Realtime, frame, chunk, offset_ms)
    }

    fn analyze(
        &self,
        mode: AnalysisMode,
        video_input: &MediaInput,
        audio_input: &MediaInput,
        offset_ms: u64,
    ) -> Result<FusionRecord, PipelineError> {
        let start_time = std::time::Instant::now();

        let video_distribution = self
            .video
            .predict_video(video_input)
            .map_err(PipelineError::Video)?;
        let audio_distribution = self
            .audio
            .predict_audio(audio_input)
            .map_err(PipelineError::Audio)?;

        let result = fuse_modalities(&video_distribution, &audio_distribution)?;

        debug!(
            "Fusion at {}ms: {} ({}) in {:?}",
            offset_ms,
            result.dominant_emotion,
            result.intensity,
            start_time.elapsed()
        );

        Ok(FusionRecord {
            id: Uuid::new_v4(),
            mode,
            created_at: Utc::now(),
            offset_ms,
            result,
            video_distribution,
            audio_distribution,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::emotion::{Emotion, SpeechEmotion};

    /// Producer returning a fixed distribution, or an error when `None`
    pub struct FixedVideo(pub Option<EmotionDistribution>);

    impl VideoEmotionProducer for FixedVideo {
        fn predict_video(&self, _input: &MediaInput) -> Result<EmotionDistribution, ProducerError> {
            self.0
                .ok_or_else(|| ProducerError::Upstream("no face model".to_string()))
        }
    }

    pub struct FixedAudio(pub Option<SpeechDistribution>);

    impl AudioEmotionProducer for FixedAudio {
        fn predict_audio(&self, _input: &MediaInput) -> Result<SpeechDistribution, ProducerError> {
            self.0
                .ok_or_else(|| ProducerError::Upstream("no speech model".to_string()))
        }
    }

    pub fn happy_video() -> EmotionDistribution {
        EmotionDistribution::from_pairs([(Emotion::Happy, 0.8), (Emotion::Surprise, 0.2)])
            .unwrap()
    }

    pub fn calm_audio() -> SpeechDistribution {
        SpeechDistribution::from_pairs([(SpeechEmotion::Calm, 0.6), (SpeechEmotion::Happy, 0.4)])
            .unwrap()
    }

    pub fn pipeline(
        video: Option<EmotionDistribution>,
        audio: Option<SpeechDistribution>,
    ) -> FusionPipeline {
        FusionPipeline::new(Arc::new(FixedVideo(video)), Arc::new(FixedAudio(audio)))
    }
}
