use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::emotion::Emotion;
use crate::pipeline::FusionRecord;

/// Aggregate statistics over a session's fusion records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub record_count: usize,
    /// How often each emotion was dominant, every label present
    pub dominant_counts: BTreeMap<Emotion, u32>,
    /// Most frequent dominant emotion; ties go to canonical order
    pub prevailing_emotion: Option<Emotion>,
    pub compound_count: u32,
    pub mean_confidence: f64,
    pub mean_valence: f64,
    pub mean_arousal: f64,
}

/// A complete analysis session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub records: Vec<FusionRecord>,

    // Stats
    pub total_duration_ms: u64,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            records: Vec::new(),
            total_duration_ms: 0,
        }
    }

    pub fn add_record(&mut self, record: FusionRecord) {
        self.total_duration_ms = self.total_duration_ms.max(record.offset_ms);
        self.records.push(record);
    }

    pub fn finalize(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    pub fn summary(&self) -> SessionSummary {
        let mut dominant_counts: BTreeMap<Emotion, u32> =
            Emotion::ALL.iter().map(|&e| (e, 0)).collect();
        let mut compound_count = 0;
        let mut confidence_sum = 0.0;
        let mut valence_sum = 0.0;
        let mut arousal_sum = 0.0;

        for record in &self.records {
            let result = &record.result;
            *dominant_counts.entry(result.dominant_emotion).or_insert(0) += 1;
            if result.compound_emotion.is_some() {
                compound_count += 1;
            }
            confidence_sum += result.confidence;
            valence_sum += result.valence;
            arousal_sum += result.arousal;
        }

        let mut prevailing_emotion = None;
        let mut best = 0;
        for emotion in Emotion::ALL {
            let count = dominant_counts[&emotion];
            if count > best {
                best = count;
                prevailing_emotion = Some(emotion);
            }
        }

        let n = self.records.len();
        let mean = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };

        SessionSummary {
            record_count: n,
            dominant_counts,
            prevailing_emotion,
            compound_count,
            mean_confidence: mean(confidence_sum),
            mean_valence: mean(valence_sum),
            mean_arousal: mean(arousal_sum),
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}
