//! Rule-based risk reasons.
//!
//! Rules look only at raw feature values, never at the model, and every
//! matching rule contributes its reason in table order. Thresholds apply to
//! the raw value whether or not it lies inside the schema range.

use crate::schema::{Feature, FeatureMap, TrailSegment};

/// Rendered in place of an empty reason list.
pub const NO_MAJOR_RISKS: &str = "Route conditions are generally safe.";

struct Rule {
    feature: Feature,
    /// Used when the feature is absent; never triggers the rule.
    default: f64,
    triggers: fn(f64) -> bool,
    reason: &'static str,
}

const RULES: [Rule; 5] = [
    Rule {
        feature: Feature::SlopeAngle,
        default: 0.0,
        triggers: |v| v > 25.0,
        reason: "Steep slope increases fall risk",
    },
    Rule {
        feature: Feature::WeatherSeverity,
        default: 0.0,
        triggers: |v| v >= 4.0,
        reason: "Severe weather increases danger",
    },
    Rule {
        feature: Feature::Visibility,
        default: 20.0,
        triggers: |v| v < 4.0,
        reason: "Low visibility reduces path safety",
    },
    Rule {
        feature: Feature::PathWidth,
        default: 5.0,
        triggers: |v| v < 1.5,
        reason: "Narrow trail increases risk",
    },
    Rule {
        feature: Feature::TrailDifficulty,
        default: 0.0,
        triggers: |v| v >= 4.0,
        reason: "Difficult trail requires higher skill level",
    },
];

/// Reasons for every rule triggered by `features`. Missing keys fall back to
/// benign defaults, so this never fails.
pub fn explain(features: &FeatureMap) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| {
            let value = features.get(rule.feature.name()).copied().unwrap_or(rule.default);
            (rule.triggers)(value)
        })
        .map(|rule| rule.reason.to_string())
        .collect()
}

pub fn explain_segment(segment: &TrailSegment) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| (rule.triggers)(segment.get(rule.feature)))
        .map(|rule| rule.reason.to_string())
        .collect()
}

/// Lines to show a user: the reasons, or `NO_MAJOR_RISKS` when there are none.
pub fn display_reasons(reasons: &[String]) -> Vec<String> {
    if reasons.is_empty() {
        vec![NO_MAJOR_RISKS.to_string()]
    } else {
        reasons.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn all_rules_fire() {
        let f = map(&[
            ("slope_angle", 30.0),
            ("weather_severity", 5.0),
            ("visibility_km", 2.0),
            ("path_width_m", 1.0),
            ("trail_difficulty", 5.0),
        ]);
        let reasons = explain(&f);
        assert_eq!(
            reasons,
            vec![
                "Steep slope increases fall risk",
                "Severe weather increases danger",
                "Low visibility reduces path safety",
                "Narrow trail increases risk",
                "Difficult trail requires higher skill level",
            ]
        );
    }

    #[test]
    fn benign_values_give_no_reasons() {
        let f = map(&[
            ("slope_angle", 5.0),
            ("weather_severity", 1.0),
            ("visibility_km", 15.0),
            ("path_width_m", 3.0),
            ("trail_difficulty", 1.0),
        ]);
        assert!(explain(&f).is_empty());
        assert_eq!(display_reasons(&explain(&f)), vec![NO_MAJOR_RISKS.to_string()]);
    }

    #[test]
    fn thresholds_are_strict_where_stated() {
        let at_edge = map(&[
            ("slope_angle", 25.0),
            ("weather_severity", 4.0),
            ("visibility_km", 4.0),
            ("path_width_m", 1.5),
            ("trail_difficulty", 4.0),
        ]);
        assert_eq!(
            explain(&at_edge),
            vec!["Severe weather increases danger", "Difficult trail requires higher skill level"]
        );
    }

    #[test]
    fn out_of_range_weather_still_fires() {
        let reasons = explain(&map(&[("weather_severity", 6.0)]));
        assert_eq!(reasons, vec!["Severe weather increases danger"]);
    }

    #[test]
    fn missing_fields_never_trigger() {
        assert!(explain(&FeatureMap::new()).is_empty());
    }

    #[test]
    fn segment_matches_map() {
        let segment = TrailSegment {
            slope_angle: 40.0,
            altitude_change: -450.0,
            weather_severity: 2,
            trail_difficulty: 4,
            path_width_m: 3.0,
            visibility_km: 1.0,
        };
        assert_eq!(explain_segment(&segment), explain(&segment.to_feature_map()));
        assert_eq!(explain_segment(&segment).len(), 3);
    }
}
