use std::ops::Range;

use crate::collective::Collective;
use crate::dynamics::EpidemicDynamics;
use crate::error::Result;
use crate::storage::{self, DenseBlock, DistributedMatrix, RowBlock};

/// Builds the (state x action) stage cost matrix.
pub struct StageCostAssembler<'a> {
    dynamics: EpidemicDynamics<'a>,
}

impl<'a> StageCostAssembler<'a> {
    pub fn new(dynamics: EpidemicDynamics<'a>) -> Self {
        Self { dynamics }
    }

    /// Exact dense fill of the rows owned by one worker.
    pub fn assemble_block(&self, states: Range<usize>) -> Result<DenseBlock> {
        let actions = self.dynamics.actions();
        let mut block = DenseBlock::new(states.clone(), actions.num_actions());
        for state in states {
            for action in actions.actions() {
                block.set_value(state, action, self.dynamics.stage_cost(state, action))?;
            }
        }
        Ok(block)
    }

    pub fn assemble(&self, collective: &Collective) -> Result<DistributedMatrix<DenseBlock>> {
        let blocks = collective.run(|_, states| self.assemble_block(states))?;
        let params = self.dynamics.parameters();
        let matrix = storage::commit(params.num_states(), params.num_actions(), blocks)?;
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::test_support::five_by_four;
    use crate::partition::Partition;

    #[test]
    fn test_block_matches_stage_cost() {
        let params = five_by_four(30);
        let assembler = StageCostAssembler::new(EpidemicDynamics::new(&params));
        let block = assembler.assemble_block(10..20).unwrap();
        assert_eq!(block.values().shape(), (10, 20));
        let dynamics = EpidemicDynamics::new(&params);
        for state in 10..20 {
            for action in 0..20 {
                assert_eq!(
                    block.get(state, action),
                    Some(dynamics.stage_cost(state, action))
                );
            }
        }
    }

    #[test]
    fn test_distributed_matches_single_worker() {
        let params = five_by_four(57);
        let assembler = StageCostAssembler::new(EpidemicDynamics::new(&params));
        let single = assembler
            .assemble(&Collective::new(Partition::new(58, 1).unwrap()))
            .unwrap();
        let split = assembler
            .assemble(&Collective::new(Partition::new(58, 5).unwrap()))
            .unwrap();
        assert_eq!(split.blocks().len(), 5);
        assert_eq!(split.ownership_range(0), Some(0..12));
        for state in 0..58 {
            for action in 0..20 {
                assert_eq!(single.get(state, action), split.get(state, action));
            }
        }
    }
}
