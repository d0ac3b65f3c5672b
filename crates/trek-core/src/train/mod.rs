//! Classifier training on a stratified hold-out split.
//!
//! The trainer never touches storage: it returns a `ModelBundle` and an
//! `EvaluationReport`, and callers decide where the bundle goes.

pub mod metrics;
pub mod split;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::{Result, TrekError};
use crate::model::{ClassifierKind, FitParams, Model};
use crate::schema::{Feature, RiskLevel, TARGET_COLUMN};
use crate::store::ModelBundle;

pub use metrics::{EvaluationReport, LabelMetrics};
pub use split::{stratified_split, Split};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub classifier: ClassifierKind,
    pub max_depth: usize,
    /// Ignored by the single decision tree.
    pub n_estimators: usize,
    /// Held-out fraction, strictly between 0 and 1.
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::RandomForest,
            max_depth: 10,
            n_estimators: 50,
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl TrainParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TrekError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.max_depth == 0 {
            return Err(TrekError::InvalidConfig("max_depth must be at least 1".into()));
        }
        if self.classifier == ClassifierKind::RandomForest && self.n_estimators == 0 {
            return Err(TrekError::InvalidConfig("n_estimators must be at least 1".into()));
        }
        Ok(())
    }

    pub fn fit_params(&self) -> FitParams {
        FitParams {
            classifier: self.classifier,
            max_depth: self.max_depth,
            n_estimators: self.n_estimators,
            random_state: self.random_state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: EvaluationReport,
}

pub struct Trainer {
    params: TrainParams,
    features: Vec<Feature>,
}

impl Trainer {
    /// Trainer over the schema feature order.
    pub fn new(params: TrainParams) -> Self {
        Self { params, features: Feature::ALL.to_vec() }
    }

    /// Build the training matrix in `order` instead. It must name every
    /// schema feature exactly once; the order is recorded in the bundle.
    pub fn with_feature_order(mut self, order: Vec<Feature>) -> Result<Self> {
        let complete = order.len() == Feature::ALL.len() && Feature::ALL.iter().all(|f| order.contains(f));
        if !complete {
            return Err(TrekError::InvalidConfig(format!(
                "feature order {:?} must list every schema feature once",
                order.iter().map(|f| f.name()).collect::<Vec<_>>()
            )));
        }
        self.features = order;
        Ok(self)
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        self.params.validate()?;
        if dataset.is_empty() {
            return Err(TrekError::EmptyDataset { source_name: "training input".into() });
        }

        // Class indices follow label order over the labels actually present,
        // so every row's label has a slot in `class_index`.
        let classes: Vec<RiskLevel> = dataset.label_counts().into_keys().collect();
        let mut class_index = [usize::MAX; RiskLevel::ALL.len()];
        for (i, &label) in classes.iter().enumerate() {
            class_index[label as usize] = i;
        }
        let x: Vec<Vec<f64>> = dataset.rows.iter().map(|r| r.segment.project(&self.features)).collect();
        let y: Vec<usize> = dataset.rows.iter().map(|r| class_index[r.label as usize]).collect();

        let Split { train, test } =
            stratified_split(&y, classes.len(), self.params.test_size, self.params.random_state);
        debug!(train = train.len(), test = test.len(), "stratified split");

        let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
        let model = Model::fit(&x_train, &y_train, classes.clone(), self.params.fit_params())?;

        let x_test: Vec<Vec<f64>> = test.iter().map(|&i| x[i].clone()).collect();
        let y_true: Vec<RiskLevel> = test.iter().map(|&i| dataset.rows[i].label).collect();
        let y_pred = model.predict_rows(&x_test)?;
        let report = EvaluationReport::evaluate(&y_true, &y_pred, &classes, train.len());

        info!(
            classifier = %self.params.classifier,
            accuracy = report.accuracy,
            macro_f1 = report.macro_f1,
            n_train = report.n_train,
            n_test = report.n_test,
            "model trained"
        );

        let bundle = ModelBundle {
            model,
            features: self.features.iter().map(|f| f.name().to_string()).collect(),
            target: TARGET_COLUMN.to_string(),
        };
        Ok(TrainingOutcome { bundle, report })
    }
}

/// Train over the schema feature order.
pub fn train(dataset: &Dataset, params: TrainParams) -> Result<TrainingOutcome> {
    Trainer::new(params).train(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generate;
    use crate::schema::feature_names;

    #[test]
    fn forest_on_balanced_dataset() {
        let ds = generate(200, 42);
        let outcome = train(&ds, TrainParams::default()).unwrap();
        let report = &outcome.report;

        assert_eq!(report.n_test, 120);
        assert_eq!(report.n_train, 480);
        assert!(report.accuracy > 0.8, "{report}");
        assert!(report.label(RiskLevel::Safe).unwrap().recall > 0.9, "{report}");
        assert!(report.label(RiskLevel::HighRisk).unwrap().recall > 0.9, "{report}");

        let bundle = &outcome.bundle;
        assert_eq!(bundle.features, feature_names());
        assert_eq!(bundle.target, "risk_level");
        assert_eq!(bundle.model.classes, RiskLevel::ALL.to_vec());
        assert_eq!(bundle.model.kind(), ClassifierKind::RandomForest);
    }

    #[test]
    fn decision_tree_variant() {
        let ds = generate(60, 3);
        let params = TrainParams { classifier: ClassifierKind::DecisionTree, ..Default::default() };
        let outcome = train(&ds, params).unwrap();
        assert_eq!(outcome.bundle.model.kind(), ClassifierKind::DecisionTree);
        assert!(!outcome.bundle.model.supports_proba());
    }

    #[test]
    fn training_is_reproducible() {
        let ds = generate(40, 8);
        let params = TrainParams { n_estimators: 10, ..Default::default() };
        let a = train(&ds, params).unwrap();
        let b = train(&ds, params).unwrap();
        assert_eq!(a.bundle.to_json().unwrap(), b.bundle.to_json().unwrap());
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn absent_label_is_skipped_in_class_indices() {
        let mut ds = generate(40, 5);
        ds.rows.retain(|r| r.label != RiskLevel::ModerateRisk);
        let params = TrainParams { n_estimators: 10, ..Default::default() };
        let outcome = train(&ds, params).unwrap();
        assert_eq!(outcome.bundle.model.classes, vec![RiskLevel::Safe, RiskLevel::HighRisk]);
        assert_eq!(outcome.report.per_label.len(), 2);
        let proba = outcome.bundle.model.predict_proba(&ds.rows[0].segment.project(&Feature::ALL)).unwrap().unwrap();
        assert_eq!(proba.len(), 2);
    }

    #[test]
    fn custom_feature_order_is_recorded() {
        let mut order = Feature::ALL.to_vec();
        order.reverse();
        let trainer = Trainer::new(TrainParams { n_estimators: 5, ..Default::default() })
            .with_feature_order(order)
            .unwrap();
        let outcome = trainer.train(&generate(20, 1)).unwrap();
        assert_eq!(outcome.bundle.features[0], "visibility_km");
        assert_eq!(outcome.bundle.features[5], "slope_angle");
    }

    #[test]
    fn incomplete_feature_order_rejected() {
        let order = vec![Feature::SlopeAngle, Feature::SlopeAngle];
        let err = Trainer::new(TrainParams::default()).with_feature_order(order).err().unwrap();
        assert!(matches!(err, TrekError::InvalidConfig(_)));
    }

    #[test]
    fn empty_dataset_is_fatal() {
        let err = train(&Dataset::default(), TrainParams::default()).unwrap_err();
        assert!(matches!(err, TrekError::EmptyDataset { .. }));
    }

    #[test]
    fn bad_test_size_rejected() {
        let ds = generate(10, 1);
        for test_size in [0.0, 1.0, -0.1, f64::NAN] {
            let err = train(&ds, TrainParams { test_size, ..Default::default() }).unwrap_err();
            assert!(matches!(err, TrekError::InvalidConfig(_)), "{test_size}");
        }
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: TrainParams = serde_json::from_str(r#"{"classifier":"decision_tree","max_depth":4}"#).unwrap();
        assert_eq!(params.classifier, ClassifierKind::DecisionTree);
        assert_eq!(params.max_depth, 4);
        assert_eq!(params.n_estimators, 50);
    }
}
