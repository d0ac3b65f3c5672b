//! Single-vector inference against a stored model bundle.
//!
//! Input is keyed by feature name. Values are reordered into the bundle's
//! recorded column order before they reach the classifier; a missing key is
//! rejected rather than substituted. Extra keys are ignored and values
//! outside the schema ranges are passed through unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{Result, TrekError};
use crate::explain::explain;
use crate::schema::{FeatureMap, RiskLevel, TrailSegment};
use crate::store::ModelStore;

/// Per-label probability estimate, or an explicit marker that the classifier
/// offers none. Serializes as a JSON object or `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    Distribution(BTreeMap<RiskLevel, f64>),
    Unavailable,
}

impl Confidence {
    pub fn get(&self, label: RiskLevel) -> Option<f64> {
        match self {
            Confidence::Distribution(p) => p.get(&label).copied(),
            Confidence::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Confidence::Distribution(_))
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Confidence::Distribution(p) => p.serialize(serializer),
            Confidence::Unavailable => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<BTreeMap<RiskLevel, f64>>::deserialize(deserializer)? {
            Some(p) => Confidence::Distribution(p),
            None => Confidence::Unavailable,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
}

/// Prediction plus rule-based reasons; the payload returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
    pub reasons: Vec<String>,
}

/// Values of `features` laid out in `order`.
pub fn project_features(features: &FeatureMap, order: &[String]) -> Result<Vec<f64>> {
    order
        .iter()
        .map(|name| {
            let value = *features.get(name).ok_or_else(|| TrekError::MissingFeature(name.clone()))?;
            if !value.is_finite() {
                return Err(TrekError::InvalidFeature { name: name.clone(), value });
            }
            Ok(value)
        })
        .collect()
}

pub struct Predictor<S> {
    store: S,
}

impl<S: ModelStore> Predictor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reloads the bundle on every call. An inconsistent bundle fails with
    /// `CorruptBundle` before any input is read.
    pub fn predict(&self, features: &FeatureMap) -> Result<Prediction> {
        let bundle = self.store.load()?;
        bundle.validate()?;
        let row = project_features(features, &bundle.features)?;

        let risk_level = bundle.model.predict(&row)?;
        let confidence = match bundle.model.predict_proba(&row)? {
            Some(p) => Confidence::Distribution(p.into_iter().collect()),
            None => Confidence::Unavailable,
        };
        debug!(%risk_level, confidence = confidence.is_available(), "prediction");
        Ok(Prediction { risk_level, confidence })
    }

    pub fn assess(&self, features: &FeatureMap) -> Result<RiskAssessment> {
        let Prediction { risk_level, confidence } = self.predict(features)?;
        Ok(RiskAssessment { risk_level, confidence, reasons: explain(features) })
    }

    pub fn assess_segment(&self, segment: &TrailSegment) -> Result<RiskAssessment> {
        self.assess(&segment.to_feature_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::dataset::generate;
    use crate::error::ErrorKind;
    use crate::model::ClassifierKind;
    use crate::schema::Feature;
    use crate::simulate::{sample_segment, RiskBias};
    use crate::store::{FileModelStore, MemoryModelStore};
    use crate::train::{train, TrainParams, Trainer};

    fn forest_store() -> MemoryModelStore {
        let outcome = train(&generate(60, 11), TrainParams { n_estimators: 20, ..Default::default() }).unwrap();
        MemoryModelStore::with_bundle(outcome.bundle)
    }

    fn high_risk_features() -> FeatureMap {
        [
            ("slope_angle", 38.0),
            ("altitude_change", 420.0),
            ("weather_severity", 5.0),
            ("trail_difficulty", 5.0),
            ("path_width_m", 0.8),
            ("visibility_km", 0.5),
        ]
        .iter()
        .map(|&(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn forest_reports_distribution() {
        let predictor = Predictor::new(forest_store());
        let p = predictor.predict(&high_risk_features()).unwrap();
        assert_eq!(p.risk_level, RiskLevel::HighRisk);
        let Confidence::Distribution(dist) = &p.confidence else {
            panic!("forest should expose probabilities");
        };
        assert_eq!(dist.len(), 3);
        assert_relative_eq!(dist.values().sum::<f64>(), 1.0, epsilon = 1e-6);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["risk_level"], "High_Risk");
        assert!(json["confidence"].is_object());
        assert!(json["confidence"]["High_Risk"].is_number());
    }

    #[test]
    fn tree_reports_unavailable_not_empty() {
        let outcome = train(
            &generate(60, 11),
            TrainParams { classifier: ClassifierKind::DecisionTree, ..Default::default() },
        )
        .unwrap();
        let predictor = Predictor::new(MemoryModelStore::with_bundle(outcome.bundle));
        let p = predictor.predict(&high_risk_features()).unwrap();
        assert_eq!(p.confidence, Confidence::Unavailable);
        assert_eq!(p.confidence.get(p.risk_level), None);
        assert!(serde_json::to_value(&p).unwrap()["confidence"].is_null());
    }

    #[test]
    fn name_keyed_input_follows_bundle_order() {
        let mut order = Feature::ALL.to_vec();
        order.reverse();
        let outcome = Trainer::new(TrainParams { n_estimators: 15, ..Default::default() })
            .with_feature_order(order.clone())
            .unwrap()
            .train(&generate(60, 4))
            .unwrap();
        let model = outcome.bundle.model.clone();
        let predictor = Predictor::new(MemoryModelStore::with_bundle(outcome.bundle));

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let bias = RiskBias::ALL[rng.gen_range(0..3)];
            let seg = sample_segment(&mut rng, bias);

            // Keys inserted in two different orders.
            let forward: FeatureMap = Feature::ALL.iter().map(|&f| (f.name().to_string(), seg.get(f))).collect();
            let backward: FeatureMap = order.iter().map(|&f| (f.name().to_string(), seg.get(f))).collect();

            let a = predictor.predict(&forward).unwrap();
            let b = predictor.predict(&backward).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.risk_level, model.predict(&seg.project(&order)).unwrap());
        }
    }

    #[test]
    fn untrained_store_is_not_ready() {
        let err = Predictor::new(MemoryModelStore::new()).predict(&high_risk_features()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);

        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("risk_model.json"));
        let err = Predictor::new(&store).assess(&high_risk_features()).unwrap_err();
        assert!(matches!(err, TrekError::ModelNotFound { .. }));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let predictor = Predictor::new(forest_store());

        let mut missing = high_risk_features();
        missing.remove("visibility_km");
        let err = predictor.predict(&missing).unwrap_err();
        assert!(matches!(&err, TrekError::MissingFeature(name) if name == "visibility_km"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut nan = high_risk_features();
        nan.insert("slope_angle".into(), f64::NAN);
        assert!(matches!(predictor.predict(&nan), Err(TrekError::InvalidFeature { .. })));
    }

    #[test]
    fn inconsistent_bundle_is_internal_not_a_panic() {
        let outcome = train(&generate(30, 6), TrainParams { n_estimators: 5, ..Default::default() }).unwrap();

        let mut short = outcome.bundle.clone();
        short.features.pop();
        let err = Predictor::new(MemoryModelStore::with_bundle(short)).predict(&high_risk_features()).unwrap_err();
        assert!(matches!(err, TrekError::CorruptBundle(_)), "{err}");
        assert_eq!(err.kind(), ErrorKind::Internal);

        // An unknown name is the bundle's fault, not the caller's.
        let mut renamed = outcome.bundle.clone();
        renamed.features[0] = "slope_deg".into();
        let mut features = high_risk_features();
        features.insert("slope_deg".into(), 38.0);
        let err = Predictor::new(MemoryModelStore::with_bundle(renamed)).predict(&features).unwrap_err();
        assert!(matches!(err, TrekError::CorruptBundle(_)), "{err}");
        assert_eq!(err.kind(), ErrorKind::Internal);

        let mut retargeted = outcome.bundle;
        retargeted.target = "danger".into();
        let err = Predictor::new(MemoryModelStore::with_bundle(retargeted)).predict(&high_risk_features()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn extra_keys_and_out_of_range_values_pass() {
        let predictor = Predictor::new(forest_store());
        let mut f = high_risk_features();
        f.insert("trail_name".into(), 1.0);
        f.insert("weather_severity".into(), 9.0);
        let assessment = predictor.assess(&f).unwrap();
        assert!(assessment.reasons.contains(&"Severe weather increases danger".to_string()));
        assert_eq!(assessment.reasons.len(), 5);
    }

    #[test]
    fn confidence_json_round_trip() {
        let dist: BTreeMap<RiskLevel, f64> = [(RiskLevel::Safe, 0.25), (RiskLevel::HighRisk, 0.75)].into_iter().collect();
        for c in [Confidence::Distribution(dist), Confidence::Unavailable] {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(serde_json::from_str::<Confidence>(&json).unwrap(), c);
        }
    }

    #[test]
    fn high_risk_draws_lean_high_risk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("model").join("risk_model.json"));
        let outcome = train(&generate(200, 42), TrainParams::default()).unwrap();
        store.save(&outcome.bundle).unwrap();

        let predictor = Predictor::new(store);
        let mut rng = StdRng::seed_from_u64(2024);
        let (mut high, mut safe) = (0, 0);
        for _ in 0..200 {
            let seg = sample_segment(&mut rng, RiskBias::HighRisk);
            match predictor.assess_segment(&seg).unwrap().risk_level {
                RiskLevel::HighRisk => high += 1,
                RiskLevel::Safe => safe += 1,
                RiskLevel::ModerateRisk => {}
            }
        }
        assert!(high > safe, "high={high} safe={safe}");
        assert!(high > 150, "high={high}");
    }
}
