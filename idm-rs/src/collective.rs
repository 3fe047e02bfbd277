//! Cooperating workers over a [`Partition`].
//!
//! Every rank runs the same assembly closure on its own state range. The
//! collective either returns one result per rank, in rank order, or the
//! first failure; a failure on any rank never yields partial output.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::Result;
use crate::partition::Partition;

#[derive(Debug, Clone, Copy)]
pub struct Collective {
    partition: Partition,
}

impl Collective {
    pub fn new(partition: Partition) -> Self {
        Self { partition }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn size(&self) -> usize {
        self.partition.num_workers()
    }

    pub fn run<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, Range<usize>) -> Result<T> + Sync,
    {
        (0..self.size())
            .into_par_iter()
            .map(|rank| {
                let states = self.partition.range(rank);
                log::debug!("rank {rank} owns states {}..{}", states.start, states.end);
                f(rank, states)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn test_results_in_rank_order() {
        let collective = Collective::new(Partition::new(10, 3).unwrap());
        let ranges = collective.run(|rank, states| Ok((rank, states))).unwrap();
        assert_eq!(ranges, vec![(0, 0..4), (1, 4..7), (2, 7..10)]);
    }

    #[test]
    fn test_failure_on_one_rank_fails_all() {
        let collective = Collective::new(Partition::new(10, 4).unwrap());
        let result = collective.run(|rank, _| {
            if rank == 2 {
                Err(ModelError::Parameters("rank 2 failed".to_string()))
            } else {
                Ok(rank)
            }
        });
        match result {
            Err(ModelError::Parameters(msg)) => assert_eq!(msg, "rank 2 failed"),
            _ => panic!("expected the rank 2 failure"),
        }
    }
}
