//! Terrain simulator: slope, altitude change, trail difficulty, path width.

use rand::Rng;

use super::{full_range_int, full_range_real, RiskBias};
use crate::schema::{Feature, TrailSegment, LEVEL_SCALE};
use crate::simulate::weather::WeatherFragment;

/// Terrain-owned half of a trail segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainFragment {
    pub slope_angle: f64,
    pub altitude_change: f64,
    pub trail_difficulty: i32,
    pub path_width_m: f64,
}

impl TerrainFragment {
    pub fn merge(self, weather: WeatherFragment) -> TrailSegment {
        TrailSegment {
            slope_angle: self.slope_angle,
            altitude_change: self.altitude_change,
            weather_severity: weather.weather_severity,
            trail_difficulty: self.trail_difficulty,
            path_width_m: self.path_width_m,
            visibility_km: weather.visibility_km,
        }
    }
}

/// Slope in degrees. Safe routes stay gentle, high-risk routes are steep.
pub fn slope_angle<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> f64 {
    match bias {
        RiskBias::Safe     => rng.gen_range(0.0..=15.0),
        RiskBias::HighRisk => rng.gen_range(25.0..=45.0),
        RiskBias::Neutral  => full_range_real(rng, Feature::SlopeAngle),
    }
}

/// Net elevation change in metres. High risk is a large gain or a large
/// drop, chosen 50/50 before the magnitude is drawn.
pub fn altitude_change<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> f64 {
    match bias {
        RiskBias::Safe => rng.gen_range(-200.0..=200.0),
        RiskBias::HighRisk => {
            if rng.gen::<f64>() > 0.5 {
                rng.gen_range(300.0..=500.0)
            } else {
                rng.gen_range(-500.0..=-300.0)
            }
        }
        RiskBias::Neutral => full_range_real(rng, Feature::AltitudeChange),
    }
}

/// Difficulty rating 1-5.
pub fn trail_difficulty<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> i32 {
    match bias {
        RiskBias::Safe     => rng.gen_range(1..=2),
        RiskBias::HighRisk => rng.gen_range(4..=5),
        RiskBias::Neutral  => full_range_int(rng, LEVEL_SCALE),
    }
}

/// Narrowest path width in metres.
pub fn path_width<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> f64 {
    match bias {
        RiskBias::Safe     => rng.gen_range(2.0..=5.0),
        RiskBias::HighRisk => rng.gen_range(0.5..=1.5),
        RiskBias::Neutral  => full_range_real(rng, Feature::PathWidth),
    }
}

/// Draw all terrain features in a fixed order.
pub fn generate_terrain<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> TerrainFragment {
    let slope_angle = slope_angle(rng, bias);
    let altitude_change = altitude_change(rng, bias);
    let trail_difficulty = trail_difficulty(rng, bias);
    let path_width_m = path_width(rng, bias);
    TerrainFragment { slope_angle, altitude_change, trail_difficulty, path_width_m }
}
