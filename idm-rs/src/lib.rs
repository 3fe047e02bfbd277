//! Stage costs and transition probabilities for an epidemic control MDP.
//!
//! The state is the number of individuals not yet infected, `0..=N`, and an
//! action picks a hygiene measure level and a social distancing level. Both
//! matrices are assembled by cooperating workers over a contiguous partition
//! of the state space and committed collectively before they are handed to a
//! policy iteration solver.
//!
//! - [`stage_cost`]: dense (state x action) stage cost matrix
//! - [`transition`]: sparse (state-action x next state) transition tensor,
//!   using a truncated and renormalized binomial
//! - [`generator`]: repeated generation passes and their reports

pub mod actions;
pub mod binomial;
pub mod collective;
pub mod dynamics;
pub mod error;
pub mod generator;
pub mod output;
pub mod parameters;
pub mod partition;
pub mod stage_cost;
pub mod storage;
pub mod transition;

pub use error::{ModelError, Result};
pub use generator::{GeneratedModel, ModelGenerator};
pub use parameters::{Mode, Parameters};
