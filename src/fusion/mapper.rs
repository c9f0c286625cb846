use crate::emotion::{Emotion, EmotionDistribution, SpeechDistribution, SpeechEmotion, EMOTION_COUNT};

/// Translate a speech-model distribution into the canonical vocabulary.
///
/// Labels map one-to-one except Neutral, which is the mean of the speech
/// model's `neutral` and `calm`. Missing speech labels read as 0, so an
/// empty input maps to the all-zero distribution.
pub fn map_speech_distribution(speech: &SpeechDistribution) -> EmotionDistribution {
    let mut scores = [0.0; EMOTION_COUNT];
    scores[Emotion::Angry.index()] = speech.get(SpeechEmotion::Angry);
    scores[Emotion::Disgust.index()] = speech.get(SpeechEmotion::Disgust);
    scores[Emotion::Fear.index()] = speech.get(SpeechEmotion::Fearful);
    scores[Emotion::Happy.index()] = speech.get(SpeechEmotion::Happy);
    scores[Emotion::Sad.index()] = speech.get(SpeechEmotion::Sad);
    scores[Emotion::Surprise.index()] = speech.get(SpeechEmotion::Surprised);
    scores[Emotion::Neutral.index()] =
        (speech.get(SpeechEmotion::Neutral) + speech.get(SpeechEmotion::Calm)) / 2.0;

    EmotionDistribution::from_trusted(scores)
}
