//! Substrate construction options.
//!
//! Plain serde structs with sensible defaults. Loading them from a file is left
//! to the caller; [`HyperNeatOptions::validate`] and
//! [`EsHyperNeatOptions::validate`] are run by every `create_network` call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activation::Activation;

/// Dimensionality of the coordinates fed to the CPPN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// `[x1, y1, x2, y2]`: the 4D hypercube.
    #[default]
    Planar,
    /// `[x1, y1, z1, x2, y2, z2]`: the 6D hypercube.
    Volumetric,
}

impl CoordinateSpace {
    /// Number of coordinates per point.
    #[must_use]
    pub const fn dimensions(self) -> usize {
        match self {
            Self::Planar => 2,
            Self::Volumetric => 3,
        }
    }
}

/// Errors raised for inconsistent options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Weight range must be positive and finite.
    #[error("weight range must be positive and finite, got {0}")]
    InvalidWeightRange(f64),
    /// Link threshold must lie in `[0, 1)`.
    #[error("link threshold must lie in [0, 1), got {0}")]
    InvalidLinkThreshold(f64),
    /// A subdivision threshold is negative or NaN.
    #[error("{name} must be a non-negative number, got {value}")]
    InvalidThreshold {
        /// Option name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Initial subdivision depth must be at least 1.
    #[error("initial depth must be at least 1")]
    InvalidDepth,
    /// Root extents must be positive and finite.
    #[error("root extents must be positive and finite, got {width} x {height}")]
    InvalidExtent {
        /// Root half-width.
        width: f64,
        /// Root half-height.
        height: f64,
    },
    /// The CPPN bias prefix is not finite.
    #[error("cppn bias must be finite, got {0}")]
    InvalidCppnBias(f64),
}

/// Options shared by grid and evolvable substrates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperNeatOptions {
    /// Minimum CPPN output magnitude for a link to exist when LEO is off.
    pub link_threshold: f64,
    /// Links weights are scaled into `[-weight_range, weight_range]`.
    pub weight_range: f64,
    /// Activation of hidden substrate neurons.
    pub hidden_activation: Activation,
    /// Activation of output substrate neurons.
    pub output_activation: Activation,
    /// Constant prepended to every CPPN query, if any.
    pub cppn_bias: Option<f64>,
    /// Use the second CPPN output as link expression output.
    pub leo_enabled: bool,
    /// Coordinates per point in CPPN queries.
    pub coordinate_space: CoordinateSpace,
}

impl Default for HyperNeatOptions {
    fn default() -> Self {
        Self {
            link_threshold: 0.2,
            weight_range: 3.0,
            hidden_activation: Activation::SigmoidSteepened,
            output_activation: Activation::SigmoidSteepened,
            cppn_bias: None,
            leo_enabled: false,
            coordinate_space: CoordinateSpace::Planar,
        }
    }
}

impl HyperNeatOptions {
    /// Options for LEO-gated substrates.
    #[must_use]
    pub fn leo() -> Self {
        Self {
            leo_enabled: true,
            ..Default::default()
        }
    }

    /// Number of CPPN outputs these options read.
    #[must_use]
    pub const fn required_cppn_outputs(&self) -> usize {
        if self.leo_enabled {
            2
        } else {
            1
        }
    }

    /// Number of CPPN inputs these options write.
    #[must_use]
    pub const fn cppn_input_count(&self) -> usize {
        let prefix = if self.cppn_bias.is_some() { 1 } else { 0 };
        prefix + 2 * self.coordinate_space.dimensions()
    }

    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.weight_range.is_finite() && self.weight_range > 0.0) {
            return Err(ConfigError::InvalidWeightRange(self.weight_range));
        }
        if !(0.0..1.0).contains(&self.link_threshold) {
            return Err(ConfigError::InvalidLinkThreshold(self.link_threshold));
        }
        if let Some(bias) = self.cppn_bias {
            if !bias.is_finite() {
                return Err(ConfigError::InvalidCppnBias(bias));
            }
        }
        Ok(())
    }
}

/// Options for evolvable-substrate construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsHyperNeatOptions {
    /// Shared link options.
    pub hyperneat: HyperNeatOptions,
    /// Quadtree levels subdivided unconditionally.
    pub initial_depth: u32,
    /// Deepest level variance-driven subdivision may reach.
    pub maximal_depth: u32,
    /// Child weight variance above which subdivision continues.
    pub division_threshold: f64,
    /// Child weight variance at or above which pruning descends instead of connecting.
    pub variance_threshold: f64,
    /// Minimum band strength for a point to become a link.
    pub banding_threshold: f64,
    /// Hidden-to-hidden discovery passes after the input pass.
    pub es_iterations: u32,
    /// Half-width of the quadtree root.
    pub initial_width: f64,
    /// Half-height of the quadtree root.
    pub initial_height: f64,
}

impl Default for EsHyperNeatOptions {
    fn default() -> Self {
        Self {
            hyperneat: HyperNeatOptions::default(),
            initial_depth: 3,
            maximal_depth: 5,
            division_threshold: 0.01,
            variance_threshold: 0.03,
            banding_threshold: 0.3,
            es_iterations: 1,
            initial_width: 1.0,
            initial_height: 1.0,
        }
    }
}

impl EsHyperNeatOptions {
    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hyperneat.validate()?;
        if self.initial_depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }
        let extents_ok = |v: f64| v.is_finite() && v > 0.0;
        if !(extents_ok(self.initial_width) && extents_ok(self.initial_height)) {
            return Err(ConfigError::InvalidExtent {
                width: self.initial_width,
                height: self.initial_height,
            });
        }
        for (name, value) in [
            ("division threshold", self.division_threshold),
            ("variance threshold", self.variance_threshold),
            ("banding threshold", self.banding_threshold),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}
