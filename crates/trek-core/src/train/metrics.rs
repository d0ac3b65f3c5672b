//! Hold-out evaluation: accuracy plus per-label precision / recall / F1.
//!
//! Scores come from aprender's classification metrics over class indices.
//! Per-label rows are read off the confusion matrix; a ratio with a zero
//! denominator is reported as 0. Macro averages span the class indices up
//! to the largest one seen in the truth or the predictions.

use std::fmt;

use aprender::metrics::classification::{accuracy, confusion_matrix, f1_score, precision, recall, Average};
use aprender::primitives::Matrix;
use serde::Serialize;

use crate::schema::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub label: RiskLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows with this label.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub per_label: Vec<LabelMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub n_train: usize,
    pub n_test: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Cells past the matrix edge belong to classes that never occurred.
fn cell(cm: &Matrix<usize>, truth: usize, predicted: usize) -> usize {
    if truth < cm.n_rows() && predicted < cm.n_cols() {
        cm.get(truth, predicted)
    } else {
        0
    }
}

/// Index of `label` within `labels`; labels outside the list map past its end.
fn index_of(labels: &[RiskLevel], label: RiskLevel) -> usize {
    labels.iter().position(|&l| l == label).unwrap_or(labels.len())
}

impl EvaluationReport {
    /// Score `y_pred` against `y_true` for each label in `labels`.
    pub fn evaluate(y_true: &[RiskLevel], y_pred: &[RiskLevel], labels: &[RiskLevel], n_train: usize) -> Self {
        debug_assert_eq!(y_true.len(), y_pred.len());
        let n_test = y_true.len().min(y_pred.len());
        if n_test == 0 {
            let per_label = labels
                .iter()
                .map(|&label| LabelMetrics { label, precision: 0.0, recall: 0.0, f1: 0.0, support: 0 })
                .collect();
            return Self {
                accuracy: 0.0,
                per_label,
                macro_precision: 0.0,
                macro_recall: 0.0,
                macro_f1: 0.0,
                n_train,
                n_test,
            };
        }

        let t: Vec<usize> = y_true[..n_test].iter().map(|&l| index_of(labels, l)).collect();
        let p: Vec<usize> = y_pred[..n_test].iter().map(|&l| index_of(labels, l)).collect();
        let cm = confusion_matrix(&p, &t);
        let width = cm.n_rows();

        let per_label: Vec<LabelMetrics> = labels
            .iter()
            .enumerate()
            .map(|(k, &label)| {
                let tp = cell(&cm, k, k);
                let predicted: usize = (0..width).map(|r| cell(&cm, r, k)).sum();
                let support: usize = (0..width).map(|c| cell(&cm, k, c)).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                LabelMetrics { label, precision, recall, f1: f1(precision, recall), support }
            })
            .collect();

        Self {
            accuracy: f64::from(accuracy(&p, &t)),
            per_label,
            macro_precision: f64::from(precision(&p, &t, Average::Macro)),
            macro_recall: f64::from(recall(&p, &t, Average::Macro)),
            macro_f1: f64::from(f1_score(&p, &t, Average::Macro)),
            n_train,
            n_test,
        }
    }

    pub fn label(&self, label: RiskLevel) -> Option<&LabelMetrics> {
        self.per_label.iter().find(|m| m.label == label)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<15} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for m in &self.per_label {
            writeln!(
                f,
                "{:<15} {:>9.3} {:>9.3} {:>9.3} {:>9}",
                m.label.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(
            f,
            "{:<15} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, self.n_test
        )?;
        write!(f, "accuracy {:.3} ({} train / {} test rows)", self.accuracy, self.n_train, self.n_test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::schema::RiskLevel::{HighRisk, ModerateRisk, Safe};

    #[test]
    fn perfect_predictions() {
        let y = [Safe, ModerateRisk, HighRisk, Safe];
        let r = EvaluationReport::evaluate(&y, &y, &RiskLevel::ALL, 10);
        assert_relative_eq!(r.accuracy, 1.0);
        assert_relative_eq!(r.macro_f1, 1.0);
        assert_eq!(r.label(Safe).unwrap().support, 2);
    }

    #[test]
    fn hand_checked_counts() {
        let t = [Safe, Safe, Safe, HighRisk, HighRisk, ModerateRisk];
        let p = [Safe, Safe, HighRisk, HighRisk, Safe, HighRisk];
        let r = EvaluationReport::evaluate(&t, &p, &RiskLevel::ALL, 0);
        assert_relative_eq!(r.accuracy, 3.0 / 6.0);

        let safe = r.label(Safe).unwrap();
        assert_relative_eq!(safe.precision, 2.0 / 3.0);
        assert_relative_eq!(safe.recall, 2.0 / 3.0);

        let high = r.label(HighRisk).unwrap();
        assert_relative_eq!(high.precision, 1.0 / 3.0);
        assert_relative_eq!(high.recall, 1.0 / 2.0);
        assert_relative_eq!(high.f1, 0.4, epsilon = 1e-12);

        // Never predicted: zero, not NaN.
        let moderate = r.label(ModerateRisk).unwrap();
        assert_eq!(moderate.precision, 0.0);
        assert_eq!(moderate.f1, 0.0);
    }

    #[test]
    fn macro_averages_match_per_label_means() {
        let t = [Safe, Safe, Safe, HighRisk, HighRisk, ModerateRisk];
        let p = [Safe, Safe, HighRisk, HighRisk, Safe, HighRisk];
        let r = EvaluationReport::evaluate(&t, &p, &RiskLevel::ALL, 0);
        let mean = |get: fn(&LabelMetrics) -> f64| r.per_label.iter().map(get).sum::<f64>() / 3.0;
        assert_relative_eq!(r.macro_precision, mean(|m: &LabelMetrics| m.precision), epsilon = 1e-6);
        assert_relative_eq!(r.macro_recall, mean(|m: &LabelMetrics| m.recall), epsilon = 1e-6);
        assert_relative_eq!(r.macro_f1, mean(|m: &LabelMetrics| m.f1), epsilon = 1e-6);
    }

    #[test]
    fn empty_hold_out_scores_zero() {
        let r = EvaluationReport::evaluate(&[], &[], &RiskLevel::ALL, 5);
        assert_eq!(r.n_test, 0);
        assert_eq!(r.accuracy, 0.0);
        assert_eq!(r.per_label.len(), 3);
        assert!(r.per_label.iter().all(|m| m.support == 0));
    }

    #[test]
    fn display_lists_every_label() {
        let y = [Safe, HighRisk];
        let text = EvaluationReport::evaluate(&y, &y, &RiskLevel::ALL, 8).to_string();
        for label in RiskLevel::ALL {
            assert!(text.contains(label.as_str()), "{text}");
        }
        assert!(text.contains("accuracy 1.000"));
    }

    #[test]
    fn serializes_label_spellings() {
        let y = [Safe, ModerateRisk];
        let json = serde_json::to_value(EvaluationReport::evaluate(&y, &y, &RiskLevel::ALL, 1)).unwrap();
        assert_eq!(json["per_label"][1]["label"], "Moderate_Risk");
        assert_eq!(json["n_test"], 2);
    }
}
