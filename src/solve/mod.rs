//! Solver seam and solution interpretation
//!
//! The crate builds the binary program but ships no solver: any integer or
//! network-flow solver can be plugged in through [`BinarySolver`].

mod interpret;

pub use interpret::*;

use crate::model::LinearProgram;
use crate::Result;

/// A binary linear program solver.
///
/// Implemented for any `Fn(&LinearProgram) -> Result<Vec<bool>>`, so a closure
/// wrapping an external solver is enough.
pub trait BinarySolver {
    /// Selects the columns of a minimum-cost feasible solution.
    ///
    /// # Arguments
    ///
    /// * `program` - Constraint matrix, flow requirements, row senses and costs
    ///
    /// # Returns
    ///
    /// One flag per column of `program`, or
    /// [`TrackingError::NoSolution`](crate::TrackingError::NoSolution) if the
    /// program is infeasible or the solver fails.
    fn solve(&self, program: &LinearProgram) -> Result<Vec<bool>>;
}

impl<F> BinarySolver for F
where
    F: Fn(&LinearProgram) -> Result<Vec<bool>>,
{
    fn solve(&self, program: &LinearProgram) -> Result<Vec<bool>> {
        self(program)
    }
}
