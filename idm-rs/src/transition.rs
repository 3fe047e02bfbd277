//! Transition probability tensor.
//!
//! Row `state * num_actions + action` holds the distribution of the next
//! state. From a non-terminal state the number of new infections `i` is
//! Binomial(state, q) and the next state is `population_size - i`. Only a
//! window of `window_width + 1` values of `i` around `floor(state * q)` is
//! kept, renormalized to sum to one, so every row has a bounded number of
//! nonzeros independent of the population size.

use std::ops::{Range, RangeInclusive};

use serde::Serialize;

use crate::binomial;
use crate::collective::Collective;
use crate::dynamics::EpidemicDynamics;
use crate::error::{ModelError, Result};
use crate::storage::{self, DistributedMatrix, RowBlock, SparseBlock};

/// Infection counts kept for a row: `floor(state * p) ± window_width / 2`,
/// clipped to `[0, state]`.
pub fn truncation_window(state: usize, p: f64, window_width: usize) -> RangeInclusive<usize> {
    let ev = (state as f64 * p).floor() as i64;
    let half = (window_width / 2) as i64;
    let start = (ev - half).max(0);
    let end = (ev + half).min(state as i64);
    if end < start {
        // Empty; only reachable when p is not a probability.
        return 1..=0;
    }
    start as usize..=end as usize
}

/// Truncation accuracy of an assembled tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KernelDiagnostics {
    /// Smallest pmf mass inside a window before renormalization.
    pub min_retained_mass: f64,
    pub min_retained_row: Option<usize>,
    pub max_row_nnz: usize,
}

impl Default for KernelDiagnostics {
    fn default() -> Self {
        Self {
            min_retained_mass: 1.0,
            min_retained_row: None,
            max_row_nnz: 0,
        }
    }
}

impl KernelDiagnostics {
    fn record(&mut self, row: usize, mass: f64, nnz: usize) {
        if mass < self.min_retained_mass {
            self.min_retained_mass = mass;
            self.min_retained_row = Some(row);
        }
        self.max_row_nnz = self.max_row_nnz.max(nnz);
    }

    pub fn merge(self, other: Self) -> Self {
        let mut merged = Self {
            max_row_nnz: self.max_row_nnz.max(other.max_row_nnz),
            ..self
        };
        if other.min_retained_mass < merged.min_retained_mass {
            merged.min_retained_mass = other.min_retained_mass;
            merged.min_retained_row = other.min_retained_row;
        }
        merged
    }
}

pub struct TransitionKernelAssembler<'a> {
    dynamics: EpidemicDynamics<'a>,
    window_width: usize,
}

impl<'a> TransitionKernelAssembler<'a> {
    pub fn new(dynamics: EpidemicDynamics<'a>) -> Self {
        let window_width = dynamics.parameters().window_width;
        Self {
            dynamics,
            window_width,
        }
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    /// Writes one row and returns the pmf mass retained by its window.
    fn assemble_row(
        &self,
        block: &mut SparseBlock,
        state: usize,
        action: usize,
        pmf_values: &mut Vec<f64>,
    ) -> Result<f64> {
        let population_size = self.dynamics.parameters().population_size;
        let row = state * self.dynamics.actions().num_actions() + action;

        if state == population_size {
            block.set_value(row, population_size, 1.0)?;
            return Ok(1.0);
        }

        let p = self.dynamics.infection_probability(state, action);
        let window = truncation_window(state, p, self.window_width);

        pmf_values.clear();
        let mut mass = 0.0;
        for infections in window.clone() {
            let value = binomial::pmf(state as u64, p, infections as u64);
            if !value.is_finite() {
                log::error!("Overflow in binomial calculation at {infections}");
                return Err(ModelError::NumericalOverflow {
                    state,
                    action,
                    row,
                    infections,
                    value,
                });
            }
            pmf_values.push(value);
            mass += value;
        }
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ModelError::DegenerateRow {
                state,
                action,
                row,
                mass,
            });
        }

        // Descending infections give ascending columns, so each insert appends.
        for (infections, value) in window.rev().zip(pmf_values.iter().rev()) {
            block.set_value(row, population_size - infections, value / mass)?;
        }
        Ok(mass)
    }

    /// Rows `states.start * num_actions .. states.end * num_actions`.
    pub fn assemble_block(&self, states: Range<usize>) -> Result<(SparseBlock, KernelDiagnostics)> {
        let params = self.dynamics.parameters();
        let actions = self.dynamics.actions();
        let num_actions = actions.num_actions();
        let per_row = (self.window_width + 1).min(params.num_states());
        let mut block = SparseBlock::with_capacity(
            states.start * num_actions..states.end * num_actions,
            params.num_states(),
            per_row,
        );
        let mut diagnostics = KernelDiagnostics::default();
        let mut pmf_values = Vec::with_capacity(self.window_width + 1);

        for state in states {
            for action in actions.actions() {
                let mass = self.assemble_row(&mut block, state, action, &mut pmf_values)?;
                let row = state * num_actions + action;
                let nnz = block.row(row).map_or(0, <[_]>::len);
                diagnostics.record(row, mass, nnz);
            }
        }
        Ok((block, diagnostics))
    }

    pub fn assemble(
        &self,
        collective: &Collective,
    ) -> Result<(DistributedMatrix<SparseBlock>, KernelDiagnostics)> {
        let results = collective.run(|_, states| self.assemble_block(states))?;
        let (blocks, diagnostics): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let diagnostics = diagnostics
            .into_iter()
            .fold(KernelDiagnostics::default(), KernelDiagnostics::merge);
        let params = self.dynamics.parameters();
        let matrix = storage::commit(
            params.num_states() * params.num_actions(),
            params.num_states(),
            blocks,
        )?;
        Ok((matrix, diagnostics))
    }
}
