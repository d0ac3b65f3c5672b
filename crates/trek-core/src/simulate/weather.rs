//! Weather simulator: severity and visibility.
//! Bad weather and low visibility align with higher risk.

use rand::Rng;

use super::{full_range_int, full_range_real, RiskBias};
use crate::schema::{Feature, LEVEL_SCALE};

/// Weather-owned half of a trail segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherFragment {
    pub weather_severity: i32,
    pub visibility_km: f64,
}

/// Severity 1 (clear) to 5 (storm / heavy fog).
pub fn weather_severity<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> i32 {
    match bias {
        RiskBias::Safe     => rng.gen_range(1..=2),
        RiskBias::HighRisk => rng.gen_range(4..=5),
        RiskBias::Neutral  => full_range_int(rng, LEVEL_SCALE),
    }
}

/// Visibility in kilometres.
pub fn visibility<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> f64 {
    match bias {
        RiskBias::Safe     => rng.gen_range(5.0..=20.0),
        RiskBias::HighRisk => rng.gen_range(0.1..=2.0),
        RiskBias::Neutral  => full_range_real(rng, Feature::Visibility),
    }
}

pub fn generate_weather<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> WeatherFragment {
    let weather_severity = weather_severity(rng, bias);
    let visibility_km = visibility(rng, bias);
    WeatherFragment { weather_severity, visibility_km }
}
