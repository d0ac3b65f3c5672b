//! Deterministic location-to-features derivation.
//!
//! A free-text location is hashed into a seed, and a neutral-bias segment is
//! drawn from it. This is not geography: the same name always maps to the
//! same plausible segment, nothing more.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::schema::TrailSegment;
use crate::simulate::{sample_segment, RiskBias};

/// Name used for blank input.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Seed from the first 12 hex digits (48 bits) of the SHA-256 of the trimmed
/// location name.
pub fn location_seed(location: &str) -> u64 {
    let name = normalize(location);
    let digest = Sha256::digest(name.as_bytes());
    digest[..6].iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

pub fn segment_from_location(location: &str) -> TrailSegment {
    let mut rng = StdRng::seed_from_u64(location_seed(location));
    sample_segment(&mut rng, RiskBias::Neutral)
}

fn normalize(location: &str) -> &str {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        UNKNOWN_LOCATION
    } else {
        trimmed
    }
}
