//! Activation functions for substrate neurons and CPPNs.
//!
//! Substrate networks use a single configured activation for hidden neurons and
//! another for output neurons, while bias and input neurons carry [`Activation::Null`]
//! since they only pass their loaded signal through. CPPNs additionally rely on
//! periodic and symmetric functions to produce geometric weight patterns.

use serde::{Deserialize, Serialize};

/// Slope used by [`Activation::SigmoidSteepened`].
pub const SIGMOID_STEEPNESS: f64 = 4.924_273;

/// Activation function types supported by network neurons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// No function at all. Used for bias and input neurons, which are never activated.
    #[default]
    Null,
    /// Identity function: f(x) = x
    Identity,
    /// Sigmoid: f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// Steepened sigmoid: f(x) = 1 / (1 + e^(-4.924273 x)), the classic NEAT substrate activation
    SigmoidSteepened,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Rectified Linear Unit: f(x) = max(0, x)
    ReLU,
    /// Sine function: f(x) = sin(x) - useful for periodic/wave patterns in CPPNs
    Sine,
    /// Cosine function: f(x) = cos(x) - useful for periodic/wave patterns in CPPNs
    Cosine,
    /// Gaussian: f(x) = e^(-x^2) - useful for radial patterns in CPPNs
    Gaussian,
    /// Absolute value: f(x) = |x| - useful for symmetric patterns in CPPNs
    Abs,
    /// Step function: f(x) = 1 if x > 0 else 0. Handy as a LEO gate.
    Step,
    /// Leaky ReLU: `f(x) = x` if `x > 0` else `0.01x`
    LeakyReLU,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 12] = [
        Self::Null,
        Self::Identity,
        Self::Sigmoid,
        Self::SigmoidSteepened,
        Self::Tanh,
        Self::ReLU,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
        Self::Step,
        Self::LeakyReLU,
    ];

    /// CPPN-oriented activation functions (periodic and symmetric).
    pub const CPPN: [Self; 6] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
    ];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates through every function. Infinite inputs map to the
    /// function's limit where one exists and to 0 for the periodic functions.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Null | Self::Identity => x,
            Self::Sigmoid => logistic(x),
            Self::SigmoidSteepened => logistic(SIGMOID_STEEPNESS * x),
            Self::Tanh => x.tanh(),
            Self::ReLU => {
                if x == f64::NEG_INFINITY {
                    return 0.0;
                }
                x.max(0.0)
            }
            Self::Sine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::Cosine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.cos()
            }
            Self::Gaussian => {
                // exp(-26^2) underflows anyway
                if x.is_infinite() || x.abs() > 26.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Abs => x.abs(),
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::LeakyReLU => {
                if x > 0.0 {
                    x
                } else {
                    0.01 * x
                }
            }
        }
    }

    /// Whether this is the pass-through activation of bias and input neurons.
    #[must_use]
    pub const fn is_null(self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Logistic function with the infinities pinned to their limits.
#[inline]
fn logistic(x: f64) -> f64 {
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }
    // exp(745) overflows f64
    let clamped = x.clamp(-700.0, 700.0);
    1.0 / (1.0 + (-clamped).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_and_identity_pass_through() {
        assert_eq!(Activation::Null.apply(0.9), 0.9);
        assert_eq!(Activation::Identity.apply(-2.0), -2.0);
        assert!(Activation::Null.is_null());
        assert!(!Activation::Identity.is_null());
    }

    #[test]
    fn test_sigmoid_variants() {
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-12);
        assert!((Activation::SigmoidSteepened.apply(0.0) - 0.5).abs() < 1e-12);

        // the steepened curve saturates much faster
        let plain = Activation::Sigmoid.apply(1.0);
        let steep = Activation::SigmoidSteepened.apply(1.0);
        assert!(steep > plain);
        assert!((steep - 1.0 / (1.0 + (-SIGMOID_STEEPNESS).exp())).abs() < 1e-15);

        assert_eq!(Activation::SigmoidSteepened.apply(f64::INFINITY), 1.0);
        assert_eq!(Activation::Sigmoid.apply(f64::NEG_INFINITY), 0.0);
        assert!(Activation::Sigmoid.apply(-1000.0) >= 0.0);
    }

    #[test]
    fn test_tanh() {
        assert!(Activation::Tanh.apply(0.0).abs() < 1e-12);
        assert!(Activation::Tanh.apply(10.0) > 0.99);
        assert!(Activation::Tanh.apply(-10.0) < -0.99);
    }

    #[test]
    fn test_relu() {
        assert!((Activation::ReLU.apply(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(Activation::ReLU.apply(-0.5), 0.0);
        assert_eq!(Activation::ReLU.apply(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_sine_cosine() {
        use std::f64::consts::PI;
        assert!(Activation::Sine.apply(0.0).abs() < 1e-12);
        assert!((Activation::Sine.apply(PI / 2.0) - 1.0).abs() < 1e-12);
        assert!((Activation::Cosine.apply(0.0) - 1.0).abs() < 1e-12);
        assert_eq!(Activation::Cosine.apply(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_gaussian() {
        assert_eq!(Activation::Gaussian.apply(0.0), 1.0);
        assert!((Activation::Gaussian.apply(1.0) - (-1.0f64).exp()).abs() < 1e-15);
        assert_eq!(Activation::Gaussian.apply(30.0), 0.0);
    }

    #[test]
    fn test_abs_step_leaky() {
        assert_eq!(Activation::Abs.apply(-0.5), 0.5);
        assert_eq!(Activation::Step.apply(0.1), 1.0);
        assert_eq!(Activation::Step.apply(0.0), 0.0);
        assert!((Activation::LeakyReLU.apply(-1.0) - -0.01).abs() < 1e-12);
    }

    #[test]
    fn test_nan_propagates() {
        for activation in Activation::ALL {
            assert!(activation.apply(f64::NAN).is_nan(), "{activation:?}");
        }
    }
}
