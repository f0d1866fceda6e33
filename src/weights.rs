//! Link weight normalization.
//!
//! Raw CPPN outputs are clamped to `[-1, 1]` first, so every weight produced here
//! satisfies `|weight| <= range` whatever the CPPN's output activation.

use crate::options::HyperNeatOptions;

/// How CPPN outputs become link weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkScheme {
    /// Links exist where `|o| >= threshold`; the super-threshold part is rescaled onto `[0, range]`.
    Threshold {
        /// Minimum magnitude for a link.
        threshold: f64,
        /// Maximum weight magnitude.
        range: f64,
    },
    /// Links exist where the second CPPN output is positive; the weight is `o * range`.
    Leo {
        /// Maximum weight magnitude.
        range: f64,
    },
}

impl LinkScheme {
    /// Select the scheme for a build.
    #[must_use]
    pub const fn from_options(options: &HyperNeatOptions, use_leo: bool) -> Self {
        if use_leo {
            Self::Leo {
                range: options.weight_range,
            }
        } else {
            Self::Threshold {
                threshold: options.link_threshold,
                range: options.weight_range,
            }
        }
    }

    /// Weight of the link described by `cppn_out`, or `None` if no link is expressed.
    #[must_use]
    pub fn weight(&self, cppn_out: &[f64]) -> Option<f64> {
        let raw = cppn_out.first().copied()?;
        match *self {
            Self::Threshold { threshold, range } => {
                threshold_normalized_weight(raw, threshold, range)
            }
            Self::Leo { range } => leo_weight(raw, cppn_out.get(1).copied()?, range),
        }
    }

    /// Whether this is the LEO scheme.
    #[must_use]
    pub const fn is_leo(&self) -> bool {
        matches!(self, Self::Leo { .. })
    }
}

/// Threshold-normalized weight: `None` below `threshold`, otherwise
/// `sign(o) * (|o| - threshold) / (1 - threshold) * range`.
#[must_use]
pub fn threshold_normalized_weight(raw: f64, threshold: f64, range: f64) -> Option<f64> {
    if raw.is_nan() {
        return None;
    }
    let clamped = raw.clamp(-1.0, 1.0);
    let magnitude = clamped.abs();
    if magnitude < threshold {
        return None;
    }
    let scaled = (magnitude - threshold) / (1.0 - threshold) * range;
    Some(scaled.copysign(clamped))
}

/// LEO-gated weight: `None` unless `leo > 0`, otherwise `o * range`.
#[must_use]
pub fn leo_weight(raw: f64, leo: f64, range: f64) -> Option<f64> {
    if raw.is_nan() || leo.is_nan() || leo <= 0.0 {
        return None;
    }
    Some(raw.clamp(-1.0, 1.0) * range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_threshold_normalization() {
        assert_eq!(threshold_normalized_weight(0.1, 0.2, 3.0), None);
        assert_eq!(threshold_normalized_weight(-0.19, 0.2, 3.0), None);
        assert_eq!(threshold_normalized_weight(0.2, 0.2, 3.0), Some(0.0));
        assert_eq!(threshold_normalized_weight(1.0, 0.2, 3.0), Some(3.0));
        assert_eq!(threshold_normalized_weight(-1.0, 0.2, 3.0), Some(-3.0));

        let w = threshold_normalized_weight(-0.6, 0.2, 3.0).unwrap();
        assert!((w - -1.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_raw_is_clamped() {
        assert_eq!(threshold_normalized_weight(5.0, 0.2, 3.0), Some(3.0));
        assert_eq!(leo_weight(-2.0, 1.0, 3.0), Some(-3.0));
        assert_eq!(threshold_normalized_weight(f64::NAN, 0.2, 3.0), None);
    }

    #[test]
    fn test_leo_gating() {
        assert_eq!(leo_weight(0.5, 0.0, 3.0), None);
        assert_eq!(leo_weight(0.5, -0.1, 3.0), None);
        assert_eq!(leo_weight(0.5, 1.0, 3.0), Some(1.5));
        // no threshold rescaling under LEO
        assert_eq!(leo_weight(0.05, 1.0, 2.0), Some(0.1));
    }

    #[test]
    fn test_scheme_selection() {
        let options = HyperNeatOptions::default();
        let plain = LinkScheme::from_options(&options, false);
        let leo = LinkScheme::from_options(&options, true);
        assert!(!plain.is_leo());
        assert!(leo.is_leo());

        assert_eq!(plain.weight(&[1.0]), Some(3.0));
        assert_eq!(plain.weight(&[]), None);
        assert_eq!(leo.weight(&[1.0, 1.0]), Some(3.0));
        // LEO requires the second channel
        assert_eq!(leo.weight(&[1.0]), None);
    }

    #[test]
    fn test_weights_within_range() {
        let mut rng = test_rng();
        for _ in 0..1000 {
            let raw = rng.random_range(-4.0..4.0);
            let leo = rng.random_range(-1.0..1.0);
            let threshold = rng.random_range(0.0..0.9);
            let range = rng.random_range(0.1..10.0);

            if let Some(w) = threshold_normalized_weight(raw, threshold, range) {
                assert!(w.abs() <= range + 1e-12);
                assert!(w == 0.0 || w.signum() == raw.signum());
            }
            if let Some(w) = leo_weight(raw, leo, range) {
                assert!(w.abs() <= range + 1e-12);
            }
        }
    }
}
