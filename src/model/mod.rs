//! Linear-algebraic form of a cost graph
//!
//! [`couple`] eliminates split/merge vertices into atomic multi-endpoint
//! columns; [`LinearProgram::assemble`] adds the flow requirements, row senses
//! and column costs a binary solver needs.

mod costs;
mod coupling;
mod program;

pub use costs::*;
pub use coupling::*;
pub use program::*;
