//! CPPN query adapter.
//!
//! Substrate construction samples the CPPN thousands of times per build. The
//! adapter keeps one exclusive borrow of the solver for the whole build and
//! rewrites a single coordinate buffer in place for every query, in the order
//! `[bias?, x1, y1, (z1,) x2, y2, (z2)]`, source first.

use thiserror::Error;

use crate::options::{CoordinateSpace, HyperNeatOptions};
use crate::quadtree::Point;
use crate::solver::{NetworkSolver, SolverError};

/// Errors raised while querying a CPPN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The CPPN refused to reset its activation state.
    #[error("failed to flush CPPN activation state")]
    FlushFailed,
    /// The CPPN did not settle within its own step bound.
    #[error("CPPN failed to relax")]
    RelaxationFailed,
    /// The CPPN produced fewer outputs than the substrate needs.
    #[error("CPPN produced {found} outputs, {required} required")]
    MissingOutputs {
        /// Outputs read by the substrate.
        required: usize,
        /// Outputs produced.
        found: usize,
    },
    /// The underlying solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Query a CPPN once with a full coordinate vector.
///
/// # Errors
///
/// Returns [`QueryError::FlushFailed`] or [`QueryError::RelaxationFailed`] if the
/// solver reports failure, or wraps any [`SolverError`].
pub fn query_cppn<S: NetworkSolver + ?Sized>(
    cppn: &mut S,
    coords: &[f64],
) -> Result<Vec<f64>, QueryError> {
    if !cppn.flush()? {
        return Err(QueryError::FlushFailed);
    }
    cppn.load_sensors(coords)?;
    if !cppn.relax()? {
        return Err(QueryError::RelaxationFailed);
    }
    Ok(cppn.read_outputs())
}

/// Reusable query handle bound to one CPPN for the duration of a build.
pub struct CppnQuery<'a, S: NetworkSolver + ?Sized> {
    cppn: &'a mut S,
    coords: Vec<f64>,
    offset: usize,
    space: CoordinateSpace,
    required_outputs: usize,
    queries: u64,
}

impl<'a, S: NetworkSolver + ?Sized> CppnQuery<'a, S> {
    /// Bind a CPPN using the bias prefix, coordinate space and LEO setting of `options`.
    pub fn new(cppn: &'a mut S, options: &HyperNeatOptions) -> Self {
        let mut coords = vec![0.0; options.cppn_input_count()];
        let offset = match options.cppn_bias {
            Some(bias) => {
                coords[0] = bias;
                1
            }
            None => 0,
        };
        Self {
            cppn,
            coords,
            offset,
            space: options.coordinate_space,
            required_outputs: options.required_cppn_outputs(),
            queries: 0,
        }
    }

    /// Query the CPPN for the link `source -> target`.
    ///
    /// # Errors
    ///
    /// See [`query_cppn`]. Additionally returns [`QueryError::MissingOutputs`] if
    /// the CPPN has fewer outputs than required.
    pub fn query(&mut self, source: Point, target: Point) -> Result<Vec<f64>, QueryError> {
        let dims = self.space.dimensions();
        write_point(&mut self.coords[self.offset..self.offset + dims], source);
        write_point(&mut self.coords[self.offset + dims..], target);

        self.queries += 1;
        let outputs = query_cppn(&mut *self.cppn, &self.coords)?;
        if outputs.len() < self.required_outputs {
            return Err(QueryError::MissingOutputs {
                required: self.required_outputs,
                found: outputs.len(),
            });
        }
        Ok(outputs)
    }

    /// Number of queries issued so far.
    #[must_use]
    pub const fn query_count(&self) -> u64 {
        self.queries
    }

    /// The coordinate vector of the last query.
    #[must_use]
    pub fn coordinates(&self) -> &[f64] {
        &self.coords
    }
}

fn write_point(slot: &mut [f64], point: Point) {
    slot[0] = point.x;
    slot[1] = point.y;
    if let Some(z) = slot.get_mut(2) {
        *z = point.z;
    }
}
