use serde::{Deserialize, Serialize};

use super::scorer::ScoreError;

/// Class order of the FER-style emotion model (index i = output i)
pub const DEFAULT_EMOTIONS: [&str; 7] = [
    "Angry", "Disgust", "Fear", "Happy", "Sad", "Surprise", "Neutral",
];

/// Ordered, immutable set of class labels.
///
/// Index `i` of the set names index `i` of every logit and probability
/// vector scored against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Create a label set, rejecting an empty list
    pub fn new<I, S>(labels: I) -> Result<Self, ScoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ScoreError::InvalidInput(
                "label set must not be empty".to_string(),
            ));
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_EMOTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for LabelSet {
    type Error = ScoreError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels_match_model_order() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 7);
        assert_eq!(labels.get(0), Some("Angry"));
        assert_eq!(labels.get(3), Some("Happy"));
        assert_eq!(labels.get(6), Some("Neutral"));
        assert_eq!(labels.get(7), None);
    }

    #[test]
    fn test_empty_label_set_rejected() {
        let result = LabelSet::new(Vec::<String>::new());
        assert!(matches!(result, Err(ScoreError::InvalidInput(_))));
    }

    #[test]
    fn test_label_set_serde_as_plain_list() {
        let labels = LabelSet::new(["Calm", "Excited"]).unwrap();
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"["Calm","Excited"]"#);

        let parsed: LabelSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, labels);
        assert!(serde_json::from_str::<LabelSet>("[]").is_err());
    }
}
