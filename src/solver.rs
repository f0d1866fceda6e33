//! The network solver contract.
//!
//! Both the CPPN queried during substrate construction and the substrate network
//! handed back to the caller are driven through [`NetworkSolver`]: flush the
//! activation state, load sensor values, relax, read outputs.

use thiserror::Error;

/// Errors raised by a network solver while loading or propagating signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The number of sensor values differs from the number of input neurons.
    #[error("sensor count mismatch: expected {expected}, got {found}")]
    SensorCountMismatch {
        /// Number of input neurons.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// A neuron could not be activated during relaxation.
    #[error("failed to activate neuron {neuron}")]
    ActivationFailed {
        /// Global index of the neuron.
        neuron: usize,
    },
}

/// A network that can be loaded with sensor values and relaxed to produce outputs.
///
/// Implementations keep their activation state between calls, so a single
/// instance can serve thousands of queries without reallocation.
pub trait NetworkSolver {
    /// Reset all activation state. Returns `false` if the state could not be cleared.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn flush(&mut self) -> Result<bool, SolverError>;

    /// Load the sensor (input neuron) values, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::SensorCountMismatch`] if `inputs` does not match the
    /// number of input neurons.
    fn load_sensors(&mut self, inputs: &[f64]) -> Result<(), SolverError>;

    /// Propagate signals until the network settles. Returns `true` once settled,
    /// `false` if the solver gave up within its own step bound.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn relax(&mut self) -> Result<bool, SolverError>;

    /// Current output neuron signals, in output order.
    fn read_outputs(&self) -> Vec<f64>;

    /// Total number of neurons.
    fn node_count(&self) -> usize;

    /// Total number of links.
    fn link_count(&self) -> usize;

    /// Number of output neurons.
    fn output_count(&self) -> usize;
}
