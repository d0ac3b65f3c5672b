//! Browser bindings. All inputs and outputs are JSON strings; the model
//! bundle is handed in by the caller rather than read from disk.

use serde::Serialize;
use trek_core::explain::explain;
use trek_core::location::segment_from_location;
use trek_core::predict::{Predictor, RiskAssessment};
use trek_core::store::{MemoryModelStore, ModelBundle};
use trek_core::{FeatureMap, TrailSegment, TrekError};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct LocationAssessment<'a> {
    location: &'a str,
    features: TrailSegment,
    #[serde(flatten)]
    assessment: RiskAssessment,
}

fn to_js(err: TrekError) -> JsValue {
    JsValue::from_str(&format!("{:?}: {err}", err.kind()))
}

/// The caller's feature object must map names to numbers.
fn parse_features(features_json: &str) -> Result<FeatureMap, TrekError> {
    serde_json::from_str(features_json)
        .map_err(|e| TrekError::InvalidRequest(format!("features must be a JSON object of numbers: {e}")))
}

fn assess_json(features_json: &str, bundle_json: &str) -> Result<String, TrekError> {
    let features = parse_features(features_json)?;
    let predictor = Predictor::new(MemoryModelStore::with_bundle(ModelBundle::from_json(bundle_json)?));
    Ok(serde_json::to_string(&predictor.assess(&features)?)?)
}

fn assess_location_json(location: &str, bundle_json: &str) -> Result<String, TrekError> {
    let features = segment_from_location(location);
    let predictor = Predictor::new(MemoryModelStore::with_bundle(ModelBundle::from_json(bundle_json)?));
    let assessment = predictor.assess_segment(&features)?;
    Ok(serde_json::to_string(&LocationAssessment { location, features, assessment })?)
}

fn explain_json(features_json: &str) -> Result<String, TrekError> {
    Ok(serde_json::to_string(&explain(&parse_features(features_json)?))?)
}

/// `{"risk_level", "confidence", "reasons"}` for a feature object.
#[wasm_bindgen]
pub fn assess(features_json: &str, bundle_json: &str) -> Result<String, JsValue> {
    assess_json(features_json, bundle_json).map_err(to_js)
}

/// Assessment of the features derived from a location name.
#[wasm_bindgen(js_name = assessLocation)]
pub fn assess_location(location: &str, bundle_json: &str) -> Result<String, JsValue> {
    assess_location_json(location, bundle_json).map_err(to_js)
}

/// Rule-based reasons only; needs no model.
#[wasm_bindgen(js_name = explain)]
pub fn explain_features(features_json: &str) -> Result<String, JsValue> {
    explain_json(features_json).map_err(to_js)
}
