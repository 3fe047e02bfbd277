use serde::Serialize;

use crate::storage::{DenseBlock, DistributedMatrix, RowBlock, SparseBlock};
use crate::transition::KernelDiagnostics;

/// Timings and sizes of one generation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub run: usize,
    pub stage_cost_seconds: f64,
    pub transition_seconds: f64,
    pub stage_cost_nnz: usize,
    pub transition_nnz: usize,
    /// Owned state range `[start, end)` of each worker.
    pub ownership: Vec<(usize, usize)>,
    pub diagnostics: KernelDiagnostics,
}

/// Contents of the statistics file.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    /// Every resolved option, defaults included.
    pub configuration: serde_json::Map<String, serde_json::Value>,
    /// SHA-256 of `configuration`.
    pub fingerprint: String,
    pub num_states: usize,
    pub num_actions: usize,
    pub runs: Vec<GenerationReport>,
}

impl RunStatistics {
    pub fn new(
        configuration: serde_json::Map<String, serde_json::Value>,
        fingerprint: String,
        num_states: usize,
        num_actions: usize,
    ) -> RunStatistics {
        RunStatistics {
            configuration,
            fingerprint,
            num_states,
            num_actions,
            runs: Vec::new(),
        }
    }
}

pub const STAGE_COST_HEADERS: [&str; 3] = ["state", "action", "cost"];

pub const TRANSITION_HEADERS: [&str; 5] = ["row", "state", "action", "next_state", "probability"];

pub fn stage_cost_rows(
    matrix: &DistributedMatrix<DenseBlock>,
) -> impl Iterator<Item = [String; 3]> + '_ {
    matrix.blocks().iter().flat_map(|block| {
        let start = block.owned_row_range().start;
        let values = block.values();
        (0..values.nrows()).flat_map(move |i| {
            (0..values.ncols()).map(move |action| {
                [
                    (start + i).to_string(),
                    action.to_string(),
                    values[(i, action)].to_string(),
                ]
            })
        })
    })
}

pub fn transition_rows(
    matrix: &DistributedMatrix<SparseBlock>,
    num_actions: usize,
) -> impl Iterator<Item = [String; 5]> + '_ {
    matrix.rows().flat_map(move |(row, entries)| {
        entries.iter().map(move |&(next_state, probability)| {
            [
                row.to_string(),
                (row / num_actions).to_string(),
                (row % num_actions).to_string(),
                next_state.to_string(),
                probability.to_string(),
            ]
        })
    })
}
