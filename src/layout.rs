//! Substrate layouts: where each neuron sits in the hypercube cross-section.
//!
//! Two layouts implement [`SubstrateLayout`]:
//!
//! - [`GridLayout`]: every position computed from evenly spaced rows, with at
//!   most one bias neuron at the origin.
//! - [`EvolvableLayout`]: input and output rows as in the grid, hidden neurons
//!   discovered during construction and deduplicated by exact coordinate.
//!
//! Rows span `[-1, 1]` on x with cells of width `2 / count`; each neuron sits at
//! the middle of its cell. Inputs lie on y = -1, hidden on y = 0, outputs on y = 1.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quadtree::Point;

/// Role of a substrate neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronType {
    /// Constant 1.0 source.
    Bias,
    /// Sensor.
    Input,
    /// Discovered or fixed interior neuron.
    Hidden,
    /// Actuator.
    Output,
}

impl std::fmt::Display for NeuronType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bias => "bias",
            Self::Input => "input",
            Self::Hidden => "hidden",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// Errors raised by substrate layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The neuron index exceeds the number of neurons of that role.
    #[error("{role} index {index} out of range for {count} neurons")]
    IndexOutOfRange {
        /// Neuron role.
        role: NeuronType,
        /// Requested index.
        index: usize,
        /// Neurons of that role.
        count: usize,
    },
    /// The only bias neuron has index 0.
    #[error("bias index {index} out of range, only index 0 is supported")]
    BiasOutOfRange {
        /// Requested index.
        index: usize,
    },
    /// The layout has no bias neurons.
    #[error("layout does not support bias neurons")]
    BiasUnsupported,
    /// A hidden neuron already exists at this coordinate.
    #[error("hidden neuron already exists at {position}")]
    DuplicateHidden {
        /// The duplicated coordinate.
        position: Point,
    },
    /// Hidden neuron coordinates must be finite.
    #[error("hidden neuron coordinates must be finite")]
    NonFinitePosition,
    /// A layer that must be populated is empty.
    #[error("{role} layer must not be empty")]
    EmptyLayer {
        /// The empty role.
        role: NeuronType,
    },
}

/// Neuron positions and per-role counts of a substrate.
pub trait SubstrateLayout {
    /// Position of the `index`-th neuron of role `role`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the index is out of range for the role.
    fn node_position(&self, index: usize, role: NeuronType) -> Result<Point, LayoutError>;

    /// Number of bias neurons.
    fn bias_count(&self) -> usize;

    /// Number of input neurons.
    fn input_count(&self) -> usize;

    /// Number of output neurons.
    fn output_count(&self) -> usize;

    /// Number of hidden neurons.
    fn hidden_count(&self) -> usize;

    /// Total number of neurons.
    fn total_count(&self) -> usize {
        self.bias_count() + self.input_count() + self.output_count() + self.hidden_count()
    }
}

/// Position of the `index`-th of `count` cells evenly spread over `[-1, 1]`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn row_position(index: usize, count: usize) -> f64 {
    let delta = 2.0 / count as f64;
    -1.0 + delta / 2.0 + index as f64 * delta
}

fn row_point(role: NeuronType, index: usize, count: usize, y: f64) -> Result<Point, LayoutError> {
    if index >= count {
        return Err(LayoutError::IndexOutOfRange { role, index, count });
    }
    Ok(Point::new(row_position(index, count), y))
}

/// Fixed grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    bias: usize,
    input: usize,
    output: usize,
    hidden: usize,
}

impl GridLayout {
    /// Create a grid with the given neuron counts.
    #[must_use]
    pub const fn new(bias: usize, input: usize, output: usize, hidden: usize) -> Self {
        Self {
            bias,
            input,
            output,
            hidden,
        }
    }
}

impl SubstrateLayout for GridLayout {
    fn node_position(&self, index: usize, role: NeuronType) -> Result<Point, LayoutError> {
        match role {
            NeuronType::Bias => {
                if index > 0 {
                    Err(LayoutError::BiasOutOfRange { index })
                } else if self.bias == 0 {
                    Err(LayoutError::IndexOutOfRange {
                        role,
                        index,
                        count: 0,
                    })
                } else {
                    Ok(Point::default())
                }
            }
            NeuronType::Input => row_point(role, index, self.input, -1.0),
            NeuronType::Hidden => row_point(role, index, self.hidden, 0.0),
            NeuronType::Output => row_point(role, index, self.output, 1.0),
        }
    }

    fn bias_count(&self) -> usize {
        self.bias
    }

    fn input_count(&self) -> usize {
        self.input
    }

    fn output_count(&self) -> usize {
        self.output
    }

    fn hidden_count(&self) -> usize {
        self.hidden
    }
}

/// Layout whose hidden neurons are discovered during substrate construction.
///
/// Hidden neurons are append-only; their index is their discovery order.
/// Deserialization re-inserts every hidden neuron, so the coordinate index is
/// always in sync and duplicate coordinates are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EvolvableLayoutRepr")]
pub struct EvolvableLayout {
    input: usize,
    output: usize,
    hidden: Vec<Point>,
    #[serde(skip)]
    hidden_index: HashMap<Point, usize>,
}

impl EvolvableLayout {
    /// Create a layout with fixed input and output rows and no hidden neurons.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::EmptyLayer`] if either row is empty.
    pub fn new(input: usize, output: usize) -> Result<Self, LayoutError> {
        if input == 0 {
            return Err(LayoutError::EmptyLayer {
                role: NeuronType::Input,
            });
        }
        if output == 0 {
            return Err(LayoutError::EmptyLayer {
                role: NeuronType::Output,
            });
        }
        Ok(Self {
            input,
            output,
            hidden: Vec::new(),
            hidden_index: HashMap::new(),
        })
    }

    /// Append a hidden neuron and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateHidden`] if a neuron already sits at
    /// `position`, or [`LayoutError::NonFinitePosition`] for non-finite coordinates.
    pub fn add_hidden_node(&mut self, position: Point) -> Result<usize, LayoutError> {
        if !position.is_finite() {
            return Err(LayoutError::NonFinitePosition);
        }
        if self.hidden_index.contains_key(&position) {
            return Err(LayoutError::DuplicateHidden { position });
        }
        let index = self.hidden.len();
        self.hidden.push(position);
        self.hidden_index.insert(position, index);
        Ok(index)
    }

    /// Index of the hidden neuron at exactly `position`, if any.
    #[must_use]
    pub fn index_of_hidden(&self, position: Point) -> Option<usize> {
        self.hidden_index.get(&position).copied()
    }

    /// Index of the hidden neuron at `position`, appending one if missing.
    /// The flag is `true` if the neuron was created.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NonFinitePosition`] for non-finite coordinates.
    pub fn hidden_index_or_insert(&mut self, position: Point) -> Result<(usize, bool), LayoutError> {
        match self.index_of_hidden(position) {
            Some(index) => Ok((index, false)),
            None => self.add_hidden_node(position).map(|index| (index, true)),
        }
    }

    /// Hidden neuron positions in discovery order.
    #[must_use]
    pub fn hidden_positions(&self) -> &[Point] {
        &self.hidden
    }
}

/// Serialized form of an [`EvolvableLayout`].
#[derive(Deserialize)]
struct EvolvableLayoutRepr {
    input: usize,
    output: usize,
    hidden: Vec<Point>,
}

impl TryFrom<EvolvableLayoutRepr> for EvolvableLayout {
    type Error = LayoutError;

    fn try_from(repr: EvolvableLayoutRepr) -> Result<Self, Self::Error> {
        let mut layout = Self::new(repr.input, repr.output)?;
        for position in repr.hidden {
            layout.add_hidden_node(position)?;
        }
        Ok(layout)
    }
}

impl SubstrateLayout for EvolvableLayout {
    fn node_position(&self, index: usize, role: NeuronType) -> Result<Point, LayoutError> {
        match role {
            NeuronType::Bias => Err(LayoutError::BiasUnsupported),
            NeuronType::Input => row_point(role, index, self.input, -1.0),
            NeuronType::Output => row_point(role, index, self.output, 1.0),
            NeuronType::Hidden => self.hidden.get(index).copied().ok_or(LayoutError::IndexOutOfRange {
                role,
                index,
                count: self.hidden.len(),
            }),
        }
    }

    fn bias_count(&self) -> usize {
        0
    }

    fn input_count(&self) -> usize {
        self.input
    }

    fn output_count(&self) -> usize {
        self.output
    }

    fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}
