//! Emotion timeline
//!
//! Buckets a session's fusion records into fixed time windows and averages
//! the fused scores in each, for timeline charts and heatmaps.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::emotion::{Emotion, EmotionDistribution, EMOTION_COUNT};
use crate::pipeline::FusionRecord;

/// Default bucket width
pub const DEFAULT_TIMELINE_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on windows in one timeline (about 14 hours at 5 s)
pub const MAX_TIMELINE_BUCKETS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("Timeline needs {required} windows, more than the limit of {max}; use a wider interval")]
    TooManyBuckets { required: u64, max: usize },
}

/// One time window of the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBucket {
    pub start_ms: u64,
    /// `MM:SS` of the window start
    pub label: String,
    pub sample_count: u32,
    /// Mean fused score per emotion (all zero for an empty window)
    pub scores: EmotionDistribution,
}

/// Score series for one emotion across all buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionSeries {
    pub name: Emotion,
    pub values: Vec<f64>,
}

/// Emotion x time matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub emotions: Vec<Emotion>,
    pub time_labels: Vec<String>,
    /// `values[emotion][bucket]`
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionTimeline {
    interval_ms: u64,
    buckets: Vec<TimelineBucket>,
}

fn format_offset(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl EmotionTimeline {
    /// Build a timeline from records in any order.
    ///
    /// Windows run from offset 0 to the last record; windows with no records
    /// between populated ones are kept with zero scores. Fails when that span
    /// needs more than `MAX_TIMELINE_BUCKETS` windows.
    pub fn build(records: &[FusionRecord], interval: Duration) -> Result<Self, TimelineError> {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut populated: BTreeMap<u64, ([f64; EMOTION_COUNT], u32)> = BTreeMap::new();
        for record in records {
            let (sum, count) = populated
                .entry(record.offset_ms / interval_ms)
                .or_insert(([0.0; EMOTION_COUNT], 0));
            for (slot, score) in sum.iter_mut().zip(record.result.emotion_distribution.scores()) {
                *slot += score;
            }
            *count += 1;
        }

        let bucket_count = match populated.keys().next_back() {
            Some(&last) => last.saturating_add(1),
            None => 0,
        };
        if bucket_count > MAX_TIMELINE_BUCKETS as u64 {
            return Err(TimelineError::TooManyBuckets {
                required: bucket_count,
                max: MAX_TIMELINE_BUCKETS,
            });
        }

        let buckets = (0..bucket_count)
            .map(|i| {
                let (sum, count) = populated
                    .get(&i)
                    .copied()
                    .unwrap_or(([0.0; EMOTION_COUNT], 0));
                let mut mean = [0.0; EMOTION_COUNT];
                if count > 0 {
                    for (slot, total) in mean.iter_mut().zip(sum) {
                        *slot = total / count as f64;
                    }
                }
                let start_ms = i * interval_ms;
                TimelineBucket {
                    start_ms,
                    label: format_offset(start_ms),
                    sample_count: count,
                    scores: EmotionDistribution::from_trusted(mean),
                }
            })
            .collect();

        Ok(Self {
            interval_ms,
            buckets,
        })
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn buckets(&self) -> &[TimelineBucket] {
        &self.buckets
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn time_labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    /// One series per canonical emotion
    pub fn series(&self) -> Vec<EmotionSeries> {
        Emotion::ALL
            .iter()
            .map(|&name| EmotionSeries {
                name,
                values: self.buckets.iter().map(|b| b.scores.get(name)).collect(),
            })
            .collect()
    }

    pub fn heatmap(&self) -> Heatmap {
        Heatmap {
            emotions: Emotion::ALL.to_vec(),
            time_labels: self.time_labels(),
            values: self.series().into_iter().map(|s| s.values).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::SpeechDistribution;
    use crate::pipeline::test_support::pipeline;
    use crate::producer::MediaInput;

    fn record(pairs: &[(Emotion, f64)], offset_ms: u64) -> FusionRecord {
        let video = EmotionDistribution::from_pairs(pairs.iter().copied()).unwrap();
        let input = MediaInput::Inline(Vec::new());
        pipeline(Some(video), Some(SpeechDistribution::zeros()))
            .analyze_realtime(&input, &input, offset_ms)
            .unwrap()
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = EmotionTimeline::build(&[], DEFAULT_TIMELINE_INTERVAL).unwrap();
        assert!(timeline.is_empty());
        assert!(timeline.heatmap().time_labels.is_empty());
    }

    #[test]
    fn test_buckets_average_scores() {
        let records = vec![
            record(&[(Emotion::Happy, 1.0)], 0),
            record(&[(Emotion::Happy, 0.5), (Emotion::Sad, 0.5)], 4_999),
            record(&[(Emotion::Angry, 1.0)], 5_000),
        ];
        let timeline = EmotionTimeline::build(&records, Duration::from_secs(5)).unwrap();

        let buckets = timeline.buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].sample_count, 2);
        assert_eq!(buckets[0].label, "00:00");
        assert_eq!(buckets[1].label, "00:05");
        // mean of 0.6 and 0.3
        assert!((buckets[0].scores.get(Emotion::Happy) - 0.45).abs() < 1e-12);
        assert!((buckets[1].scores.get(Emotion::Angry) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_gap_buckets_are_zero() {
        let records = vec![
            record(&[(Emotion::Fear, 1.0)], 65_000),
            record(&[(Emotion::Neutral, 1.0)], 0),
        ];
        let timeline = EmotionTimeline::build(&records, Duration::from_secs(30)).unwrap();

        assert_eq!(timeline.time_labels(), ["00:00", "00:30", "01:00"]);
        assert_eq!(timeline.buckets()[1].sample_count, 0);
        assert!(!timeline.buckets()[1].scores.has_mass());
    }

    #[test]
    fn test_heatmap_shape() {
        let records = vec![
            record(&[(Emotion::Surprise, 1.0)], 0),
            record(&[(Emotion::Disgust, 1.0)], 10_000),
        ];
        let heatmap = EmotionTimeline::build(&records, DEFAULT_TIMELINE_INTERVAL)
            .unwrap()
            .heatmap();

        assert_eq!(heatmap.emotions.len(), 7);
        assert_eq!(heatmap.values.len(), 7);
        assert!(heatmap.values.iter().all(|row| row.len() == 3));
        assert!((heatmap.values[Emotion::Surprise.index()][0] - 0.6).abs() < 1e-12);

        let json = serde_json::to_value(&heatmap).unwrap();
        assert_eq!(json["timeLabels"][2], "00:10");
    }

    #[test]
    fn test_huge_offset_is_rejected() {
        let records = vec![
            record(&[(Emotion::Happy, 1.0)], 0),
            record(&[(Emotion::Sad, 1.0)], u64::MAX / 2),
        ];
        let err = EmotionTimeline::build(&records, DEFAULT_TIMELINE_INTERVAL).unwrap_err();
        assert!(matches!(
            err,
            TimelineError::TooManyBuckets { max: MAX_TIMELINE_BUCKETS, .. }
        ));

        let err = EmotionTimeline::build(&records[1..], Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, TimelineError::TooManyBuckets { .. }));
    }

    #[test]
    fn test_bucket_limit_is_inclusive() {
        let last = (MAX_TIMELINE_BUCKETS as u64 - 1) * 1000;
        let records = vec![record(&[(Emotion::Fear, 1.0)], last)];

        let timeline = EmotionTimeline::build(&records, Duration::from_secs(1)).unwrap();
        assert_eq!(timeline.buckets().len(), MAX_TIMELINE_BUCKETS);
        assert_eq!(timeline.buckets()[MAX_TIMELINE_BUCKETS - 1].sample_count, 1);

        let records = vec![record(&[(Emotion::Fear, 1.0)], last + 1000)];
        assert!(EmotionTimeline::build(&records, Duration::from_secs(1)).is_err());
    }
}
