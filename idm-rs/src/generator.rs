use std::time::Instant;

use crate::collective::Collective;
use crate::dynamics::EpidemicDynamics;
use crate::error::Result;
use crate::output::GenerationReport;
use crate::parameters::{Mode, OutputFiles, Parameters, SolverSettings};
use crate::partition::Partition;
use crate::stage_cost::StageCostAssembler;
use crate::storage::{DenseBlock, DistributedMatrix, SparseBlock};
use crate::transition::{KernelDiagnostics, TransitionKernelAssembler};

/// Everything a policy iteration solver needs from one generation pass.
#[derive(Debug, Clone)]
pub struct GeneratedModel {
    pub stage_costs: DistributedMatrix<DenseBlock>,
    pub transitions: DistributedMatrix<SparseBlock>,
    pub diagnostics: KernelDiagnostics,
    pub discount_factor: f64,
    pub mode: Mode,
    pub solver: SolverSettings,
    /// Where the solver persists its policy and cost.
    pub files: OutputFiles,
}

pub struct ModelGenerator<'a> {
    params: &'a Parameters,
    collective: Collective,
}

impl<'a> ModelGenerator<'a> {
    pub fn new(params: &'a Parameters) -> Result<Self> {
        params.check()?;
        let partition = Partition::new(params.num_states(), params.num_workers)?;
        for (rank, states) in partition.ranges().enumerate() {
            log::debug!("rank {rank} owns {} states.", states.len());
        }
        Ok(Self {
            params,
            collective: Collective::new(partition),
        })
    }

    pub fn partition(&self) -> &Partition {
        self.collective.partition()
    }

    pub fn generate(&self, run: usize) -> Result<(GeneratedModel, GenerationReport)> {
        let dynamics = || EpidemicDynamics::new(self.params);

        let started = Instant::now();
        let stage_costs = StageCostAssembler::new(dynamics()).assemble(&self.collective)?;
        let stage_cost_seconds = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let (transitions, diagnostics) =
            TransitionKernelAssembler::new(dynamics()).assemble(&self.collective)?;
        let transition_seconds = started.elapsed().as_secs_f64();

        let report = GenerationReport {
            run,
            stage_cost_seconds,
            transition_seconds,
            stage_cost_nnz: stage_costs.nnz(),
            transition_nnz: transitions.nnz(),
            ownership: self
                .partition()
                .ranges()
                .map(|states| (states.start, states.end))
                .collect(),
            diagnostics,
        };
        let model = GeneratedModel {
            stage_costs,
            transitions,
            diagnostics,
            discount_factor: self.params.discount_factor,
            mode: self.params.mode,
            solver: self.params.solver.clone(),
            files: self.params.files.clone(),
        };
        Ok((model, report))
    }

    /// Runs `numPIRuns` independent passes, handing each fresh model to
    /// `consume` before the next pass starts.
    pub fn generate_runs<F>(&self, mut consume: F) -> Result<Vec<GenerationReport>>
    where
        F: FnMut(GeneratedModel, &GenerationReport) -> Result<()>,
    {
        let mut reports = Vec::with_capacity(self.params.num_runs);
        for run in 0..self.params.num_runs {
            let (model, report) = self.generate(run)?;
            log::info!(
                "run {run}: stage costs in {:.3}s, transitions in {:.3}s \
                 ({} nonzeros, min retained mass {:.3e})",
                report.stage_cost_seconds,
                report.transition_seconds,
                report.transition_nnz,
                report.diagnostics.min_retained_mass,
            );
            consume(model, &report)?;
            reports.push(report);
        }
        Ok(reports)
    }
}
