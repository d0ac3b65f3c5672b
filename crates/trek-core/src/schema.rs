//! Feature schema: names, valid ranges, and risk labels.
//! Every other module reads ranges and spellings from here.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the label column in datasets and model bundles.
pub const TARGET_COLUMN: &str = "risk_level";

/// Name-keyed feature values as supplied at inference time.
pub type FeatureMap = HashMap<String, f64>;

// ── Features ──────────────────────────────────────────────────────────────────

/// Inclusive valid interval of a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureRange {
    Real { lo: f64, hi: f64 },
    Integer { lo: i32, hi: i32 },
}

impl FeatureRange {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            FeatureRange::Real { lo, hi } => (lo, hi),
            FeatureRange::Integer { lo, hi } => (f64::from(lo), f64::from(hi)),
        }
    }

    pub fn contains(self, value: f64) -> bool {
        let (lo, hi) = self.bounds();
        match self {
            FeatureRange::Real { .. } => value >= lo && value <= hi,
            FeatureRange::Integer { .. } => value.fract() == 0.0 && value >= lo && value <= hi,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FeatureRange::Integer { .. })
    }
}

/// Inclusive scale shared by the ordinal features (weather severity, trail
/// difficulty).
pub const LEVEL_SCALE: (i32, i32) = (1, 5);

/// One of the six trail-segment features, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// Degrees of incline.
    SlopeAngle,
    /// Net elevation delta in metres.
    AltitudeChange,
    /// 1 = clear … 5 = storm.
    WeatherSeverity,
    /// 1 = easy … 5 = expert.
    TrailDifficulty,
    /// Narrowest point in metres.
    PathWidth,
    /// Sight distance in kilometres.
    Visibility,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::SlopeAngle,
        Feature::AltitudeChange,
        Feature::WeatherSeverity,
        Feature::TrailDifficulty,
        Feature::PathWidth,
        Feature::Visibility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::SlopeAngle      => "slope_angle",
            Feature::AltitudeChange  => "altitude_change",
            Feature::WeatherSeverity => "weather_severity",
            Feature::TrailDifficulty => "trail_difficulty",
            Feature::PathWidth       => "path_width_m",
            Feature::Visibility      => "visibility_km",
        }
    }

    pub fn range(self) -> FeatureRange {
        match self {
            Feature::SlopeAngle      => FeatureRange::Real { lo: 0.0, hi: 45.0 },
            Feature::AltitudeChange  => FeatureRange::Real { lo: -500.0, hi: 500.0 },
            Feature::WeatherSeverity => FeatureRange::Integer { lo: LEVEL_SCALE.0, hi: LEVEL_SCALE.1 },
            Feature::TrailDifficulty => FeatureRange::Integer { lo: LEVEL_SCALE.0, hi: LEVEL_SCALE.1 },
            Feature::PathWidth       => FeatureRange::Real { lo: 0.5, hi: 5.0 },
            Feature::Visibility      => FeatureRange::Real { lo: 0.1, hi: 20.0 },
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered feature names, as written to dataset headers and model bundles.
pub fn feature_names() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

// ── Risk labels ───────────────────────────────────────────────────────────────

/// Discrete risk estimate. Declaration order is low → high risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    #[serde(rename = "Moderate_Risk")]
    ModerateRisk,
    #[serde(rename = "High_Risk")]
    HighRisk,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Safe, RiskLevel::ModerateRisk, RiskLevel::HighRisk];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe         => "Safe",
            RiskLevel::ModerateRisk => "Moderate_Risk",
            RiskLevel::HighRisk     => "High_Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level `{0}` (expected Safe, Moderate_Risk or High_Risk)")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownRiskLevel(s.to_string()))
    }
}

// ── Feature vector ────────────────────────────────────────────────────────────

/// One trail segment's feature values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub slope_angle: f64,
    pub altitude_change: f64,
    pub weather_severity: i32,
    pub trail_difficulty: i32,
    pub path_width_m: f64,
    pub visibility_km: f64,
}

impl TrailSegment {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::SlopeAngle      => self.slope_angle,
            Feature::AltitudeChange  => self.altitude_change,
            Feature::WeatherSeverity => f64::from(self.weather_severity),
            Feature::TrailDifficulty => f64::from(self.trail_difficulty),
            Feature::PathWidth       => self.path_width_m,
            Feature::Visibility      => self.visibility_km,
        }
    }

    /// Values laid out in the given column order.
    pub fn project(&self, order: &[Feature]) -> Vec<f64> {
        order.iter().map(|&f| self.get(f)).collect()
    }

    pub fn to_feature_map(&self) -> FeatureMap {
        Feature::ALL
            .iter()
            .map(|&f| (f.name().to_string(), self.get(f)))
            .collect()
    }

    /// True when every value lies inside its schema range.
    pub fn within_schema(&self) -> bool {
        Feature::ALL.iter().all(|&f| f.range().contains(self.get(f)))
    }
}
