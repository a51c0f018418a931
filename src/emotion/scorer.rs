//! Logit normalization and label selection.
//!
//! Both operations are pure functions of their input. Errors are returned to
//! the caller as-is; the scorer never logs or falls back to a default
//! distribution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::labels::LabelSet;

/// Errors that can occur while scoring a classifier output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numeric overflow: softmax denominator is {0}")]
    NumericOverflow(f64),

    #[error("Index mismatch: {probabilities} probabilities for {labels} labels")]
    IndexMismatch { probabilities: usize, labels: usize },
}

/// The most probable class of a probability vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f64,
}

/// Numerically stable softmax.
///
/// Logits are shifted by their maximum before exponentiation, so large
/// positive scores cannot overflow. A denominator that is zero or not finite
/// (all-NaN input, infinities) is reported as `NumericOverflow`.
pub fn normalize(logits: &[f32]) -> Result<Vec<f64>, ScoreError> {
    if logits.is_empty() {
        return Err(ScoreError::InvalidInput(
            "logit vector is empty".to_string(),
        ));
    }

    let max = logits
        .iter()
        .map(|&l| f64::from(l))
        .fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = logits.iter().map(|&l| (f64::from(l) - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if !sum.is_finite() || sum <= 0.0 {
        return Err(ScoreError::NumericOverflow(sum));
    }

    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Pick the most probable class; the lowest index wins ties.
pub fn argmax(probabilities: &[f64], labels: &LabelSet) -> Result<Prediction, ScoreError> {
    if probabilities.len() != labels.len() {
        return Err(ScoreError::IndexMismatch {
            probabilities: probabilities.len(),
            labels: labels.len(),
        });
    }

    let mut best_index = 0;
    let mut best = probabilities[0];
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > best || (best.is_nan() && !p.is_nan()) {
            best = p;
            best_index = i;
        }
    }

    let label = labels
        .get(best_index)
        .ok_or(ScoreError::IndexMismatch {
            probabilities: probabilities.len(),
            labels: labels.len(),
        })?
        .to_string();

    Ok(Prediction {
        index: best_index,
        label,
        confidence: best,
    })
}

/// Scores classifier logits against a fixed label set
#[derive(Debug, Clone)]
pub struct EmotionScorer {
    labels: LabelSet,
}

impl EmotionScorer {
    pub fn new(labels: LabelSet) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn normalize(&self, logits: &[f32]) -> Result<Vec<f64>, ScoreError> {
        normalize(logits)
    }

    pub fn argmax(&self, probabilities: &[f64]) -> Result<Prediction, ScoreError> {
        argmax(probabilities, &self.labels)
    }

    /// Normalize and select in one step, returning the full distribution too.
    ///
    /// The logit count is checked against the label set before normalizing,
    /// so a model with the wrong output size fails with `IndexMismatch`.
    pub fn score(&self, logits: &[f32]) -> Result<(Prediction, Vec<f64>), ScoreError> {
        if !logits.is_empty() && logits.len() != self.labels.len() {
            return Err(ScoreError::IndexMismatch {
                probabilities: logits.len(),
                labels: self.labels.len(),
            });
        }
        let probabilities = self.normalize(logits)?;
        let prediction = self.argmax(&probabilities)?;
        Ok((prediction, probabilities))
    }
}

impl Default for EmotionScorer {
    fn default() -> Self {
        Self::new(LabelSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_uniform_logits() {
        let probs = normalize(&[0.0; 7]).unwrap();
        for p in &probs {
            assert!((p - 1.0 / 7.0).abs() < EPS);
        }

        let prediction = argmax(&probs, &LabelSet::default()).unwrap();
        assert_eq!(prediction.index, 0);
        assert_eq!(prediction.label, "Angry");
        assert!((prediction.confidence - 0.142857).abs() < EPS);
    }

    #[test]
    fn test_dominant_logit() {
        let probs = normalize(&[10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(probs[0] > 0.999);

        let prediction = argmax(&probs, &LabelSet::default()).unwrap();
        assert_eq!(prediction.label, "Angry");
    }

    #[test]
    fn test_tie_picks_first_index() {
        let scorer = EmotionScorer::default();
        let (prediction, _) = scorer.score(&[5.0, 5.0, 1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(prediction.index, 0);
        assert_eq!(prediction.label, "Angry");
    }

    #[test]
    fn test_large_logits_do_not_overflow() {
        let probs = normalize(&[1000.0, 999.0, -1000.0]).unwrap();
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_negative_infinity_entry_gets_zero() {
        let probs = normalize(&[0.0, f32::NEG_INFINITY]).unwrap();
        assert!((probs[0] - 1.0).abs() < EPS);
        assert_eq!(probs[1], 0.0);
    }

    #[test]
    fn test_empty_logits_invalid_input() {
        assert!(matches!(normalize(&[]), Err(ScoreError::InvalidInput(_))));
        assert!(matches!(
            EmotionScorer::default().score(&[]),
            Err(ScoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_all_nan_is_numeric_overflow() {
        let result = normalize(&[f32::NAN; 7]);
        assert!(matches!(result, Err(ScoreError::NumericOverflow(_))));
    }

    #[test]
    fn test_nan_among_finite_is_numeric_overflow() {
        let result = normalize(&[0.0, f32::NAN, 1.0]);
        assert!(matches!(result, Err(ScoreError::NumericOverflow(_))));
    }

    #[test]
    fn test_positive_infinity_is_numeric_overflow() {
        let result = normalize(&[0.0, f32::INFINITY]);
        assert!(matches!(result, Err(ScoreError::NumericOverflow(_))));
    }

    #[test]
    fn test_all_negative_infinity_is_numeric_overflow() {
        let result = normalize(&[f32::NEG_INFINITY; 3]);
        assert!(matches!(result, Err(ScoreError::NumericOverflow(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let result = argmax(&[1.0 / 6.0; 6], &LabelSet::default());
        assert_eq!(
            result,
            Err(ScoreError::IndexMismatch {
                probabilities: 6,
                labels: 7
            })
        );

        let result = EmotionScorer::default().score(&[0.0; 6]);
        assert!(matches!(result, Err(ScoreError::IndexMismatch { .. })));
    }

    #[test]
    fn test_alternate_label_set() {
        let scorer = EmotionScorer::new(LabelSet::new(["Calm", "Excited"]).unwrap());
        let (prediction, probs) = scorer.score(&[-1.0, 2.0]).unwrap();
        assert_eq!(prediction.label, "Excited");
        assert_eq!(prediction.index, 1);
        assert_eq!(probs.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_normalize_sums_to_one(
            logits in proptest::collection::vec(-50.0f32..50.0, 1..32)
        ) {
            let probs = normalize(&logits).unwrap();
            let sum: f64 = probs.iter().sum();
            prop_assert!((sum - 1.0).abs() < EPS);
        }

        #[test]
        fn prop_normalize_entries_in_unit_interval(
            logits in proptest::collection::vec(-50.0f32..50.0, 1..32)
        ) {
            let probs = normalize(&logits).unwrap();
            prop_assert_eq!(probs.len(), logits.len());
            for p in &probs {
                prop_assert!(*p >= 0.0 && *p <= 1.0);
            }
        }

        #[test]
        fn prop_normalize_shift_invariant(
            logits in proptest::collection::vec(-20.0f32..20.0, 1..16),
            shift in -20.0f32..20.0
        ) {
            let shifted: Vec<f32> = logits.iter().map(|l| l + shift).collect();
            let a = normalize(&logits).unwrap();
            let b = normalize(&shifted).unwrap();
            for (x, y) in a.iter().zip(&b) {
                prop_assert!((x - y).abs() < 1e-4);
            }
        }

        #[test]
        fn prop_argmax_matches_max_logit(
            logits in proptest::collection::vec(-50.0f32..50.0, 7)
        ) {
            let scorer = EmotionScorer::default();
            let (prediction, _) = scorer.score(&logits).unwrap();

            let mut expected = 0;
            for (i, &l) in logits.iter().enumerate() {
                if l > logits[expected] {
                    expected = i;
                }
            }
            prop_assert_eq!(prediction.index, expected);
        }
    }
}
