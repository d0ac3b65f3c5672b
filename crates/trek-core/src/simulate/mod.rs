//! Biased synthetic feature generation.
//!
//! Terrain and weather generators each own a subset of the schema features.
//! A `RiskBias` skews every draw toward values typical of one risk label;
//! `Neutral` samples the full schema range uniformly.

pub mod terrain;
pub mod weather;

use rand::Rng;

use crate::schema::{Feature, RiskLevel, TrailSegment};

pub use terrain::{generate_terrain, TerrainFragment};
pub use weather::{generate_weather, WeatherFragment};

/// Sampling skew applied by the simulators. Never seen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskBias {
    Safe,
    Neutral,
    HighRisk,
}

impl RiskBias {
    pub const ALL: [RiskBias; 3] = [RiskBias::Safe, RiskBias::Neutral, RiskBias::HighRisk];

    /// Parse the external tag form (`safe`, `neutral`, `high_risk`).
    /// Unrecognised tags fall back to `Neutral` so generation never halts.
    pub fn from_tag(tag: &str) -> RiskBias {
        match tag.trim().to_ascii_lowercase().as_str() {
            "safe" => RiskBias::Safe,
            "high_risk" => RiskBias::HighRisk,
            _ => RiskBias::Neutral,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            RiskBias::Safe     => "safe",
            RiskBias::Neutral  => "neutral",
            RiskBias::HighRisk => "high_risk",
        }
    }
}

/// Moderate risk is generated unbiased: it is the uniform middle case.
impl From<RiskLevel> for RiskBias {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Safe         => RiskBias::Safe,
            RiskLevel::ModerateRisk => RiskBias::Neutral,
            RiskLevel::HighRisk     => RiskBias::HighRisk,
        }
    }
}

/// Draw one full segment: terrain fragment first, then weather.
pub fn sample_segment<R: Rng + ?Sized>(rng: &mut R, bias: RiskBias) -> TrailSegment {
    let terrain = generate_terrain(rng, bias);
    let weather = generate_weather(rng, bias);
    terrain.merge(weather)
}

// ── Full-range helpers ────────────────────────────────────────────────────────

/// Uniform draw over the whole schema range of a real-valued feature.
fn full_range_real<R: Rng + ?Sized>(rng: &mut R, feature: Feature) -> f64 {
    let (lo, hi) = feature.range().bounds();
    rng.gen_range(lo..=hi)
}

/// Uniform draw over an inclusive integer scale.
fn full_range_int<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (i32, i32)) -> i32 {
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn label_to_bias_mapping() {
        assert_eq!(RiskBias::from(RiskLevel::Safe), RiskBias::Safe);
        assert_eq!(RiskBias::from(RiskLevel::ModerateRisk), RiskBias::Neutral);
        assert_eq!(RiskBias::from(RiskLevel::HighRisk), RiskBias::HighRisk);
    }

    #[test]
    fn unknown_tags_fall_back_to_neutral() {
        assert_eq!(RiskBias::from_tag("safe"), RiskBias::Safe);
        assert_eq!(RiskBias::from_tag("HIGH_RISK"), RiskBias::HighRisk);
        assert_eq!(RiskBias::from_tag("extreme"), RiskBias::Neutral);
        assert_eq!(RiskBias::from_tag(""), RiskBias::Neutral);
        for bias in RiskBias::ALL {
            assert_eq!(RiskBias::from_tag(bias.tag()), bias);
        }
    }

    /// 10,000 segments per bias, every value inside its schema range.
    #[test]
    fn every_draw_stays_in_schema_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for bias in RiskBias::ALL {
            for _ in 0..10_000 {
                let seg = sample_segment(&mut rng, bias);
                for f in Feature::ALL {
                    assert!(
                        f.range().contains(seg.get(f)),
                        "{f} = {} out of range under {bias:?}",
                        seg.get(f)
                    );
                }
            }
        }
    }

    #[test]
    fn neutral_levels_cover_the_whole_scale() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 5];
        for _ in 0..1_000 {
            let v = full_range_int(&mut rng, crate::schema::LEVEL_SCALE);
            assert!((1..=5).contains(&v), "{v}");
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn same_seed_same_segment() {
        let a = sample_segment(&mut StdRng::seed_from_u64(99), RiskBias::HighRisk);
        let b = sample_segment(&mut StdRng::seed_from_u64(99), RiskBias::HighRisk);
        assert_eq!(a, b);
    }
}
