use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emotion::{LabelSet, Prediction};
use crate::vision::FaceBox;

/// One classified face in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceReading {
    pub frame_index: u64,
    pub face: FaceBox,
    pub prediction: Prediction,
    pub probabilities: Vec<f64>,
}

impl FaceReading {
    /// The distribution as printed per face, e.g. `[0.1, 0.9]`
    pub fn probabilities_text(&self) -> String {
        format!("{:?}", self.probabilities)
    }
}

/// A complete capture session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub camera_index: i32,
    pub labels: LabelSet,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub readings: Vec<FaceReading>,

    // Stats
    pub frames_seen: u64,
    /// Readings per label, indexed like `labels`
    pub label_counts: Vec<u64>,
}

impl SessionRecord {
    pub fn new(camera_index: i32, labels: LabelSet) -> Self {
        let label_counts = vec![0; labels.len()];
        Self {
            session_id: Uuid::new_v4(),
            camera_index,
            labels,
            started_at: Utc::now(),
            ended_at: None,
            readings: Vec::new(),
            frames_seen: 0,
            label_counts,
        }
    }

    pub fn add_reading(&mut self, reading: FaceReading) {
        if let Some(count) = self.label_counts.get_mut(reading.prediction.index) {
            *count += 1;
        }
        self.frames_seen = self.frames_seen.max(reading.frame_index + 1);
        self.readings.push(reading);
    }

    pub fn record_frames(&mut self, frames_seen: u64) {
        self.frames_seen = self.frames_seen.max(frames_seen);
    }

    pub fn finalize(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Most frequent label over the session; ties go to the lower index
    pub fn dominant(&self) -> Option<(&str, u64)> {
        let mut best: Option<(usize, u64)> = None;
        for (i, &count) in self.label_counts.iter().enumerate() {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((i, count));
            }
        }
        best.and_then(|(i, count)| self.labels.get(i).map(|label| (label, count)))
    }

    pub fn duration_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0)
    }

    /// Per-label breakdown, one line per label that was seen
    pub fn summary(&self) -> String {
        let total = self.readings.len() as f64;
        self.labels
            .iter()
            .zip(&self.label_counts)
            .filter(|(_, count)| **count > 0)
            .map(|(label, &count)| {
                format!(
                    "{:<10} {:>6} ({:.1}%)",
                    label,
                    count,
                    count as f64 * 100.0 / total
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(frame_index: u64, index: usize, label: &str) -> FaceReading {
        FaceReading {
            frame_index,
            face: FaceBox::new(0, 0, 48, 48),
            prediction: Prediction {
                index,
                label: label.to_string(),
                confidence: 0.9,
            },
            probabilities: vec![0.9, 0.1],
        }
    }

    #[test]
    fn test_counts_and_dominant() {
        let mut session = SessionRecord::new(0, LabelSet::default());
        session.add_reading(reading(0, 3, "Happy"));
        session.add_reading(reading(1, 3, "Happy"));
        session.add_reading(reading(1, 4, "Sad"));

        assert_eq!(session.label_counts[3], 2);
        assert_eq!(session.label_counts[4], 1);
        assert_eq!(session.frames_seen, 2);
        assert_eq!(session.dominant(), Some(("Happy", 2)));
    }

    #[test]
    fn test_dominant_tie_prefers_lower_index() {
        let mut session = SessionRecord::new(0, LabelSet::default());
        session.add_reading(reading(0, 5, "Surprise"));
        session.add_reading(reading(0, 1, "Disgust"));
        assert_eq!(session.dominant(), Some(("Disgust", 1)));
    }

    #[test]
    fn test_empty_session() {
        let mut session = SessionRecord::new(1, LabelSet::default());
        session.record_frames(30);
        session.finalize();
        assert_eq!(session.dominant(), None);
        assert_eq!(session.summary(), "");
        assert_eq!(session.frames_seen, 30);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn test_summary_lists_seen_labels() {
        let mut session = SessionRecord::new(0, LabelSet::default());
        session.add_reading(reading(0, 6, "Neutral"));
        session.add_reading(reading(1, 6, "Neutral"));
        session.add_reading(reading(2, 0, "Angry"));
        session.add_reading(reading(3, 6, "Neutral"));

        let summary = session.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Angry"));
        assert!(lines[0].ends_with("(25.0%)"));
        assert!(lines[1].starts_with("Neutral"));
        assert!(lines[1].ends_with("(75.0%)"));
    }

    #[test]
    fn test_session_serializes() {
        let mut session = SessionRecord::new(0, LabelSet::default());
        session.add_reading(reading(0, 3, "Happy"));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["labels"][3], "Happy");
        assert_eq!(json["readings"][0]["prediction"]["label"], "Happy");
    }

    #[test]
    fn test_probabilities_text() {
        assert_eq!(reading(0, 0, "Angry").probabilities_text(), "[0.9, 0.1]");
    }
}
