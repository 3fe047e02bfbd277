//! Contiguous row partitioning of the state space across workers.
//!
//! The first `num_states % num_workers` ranks own one extra state. Both the
//! stage cost matrix and the transition tensor derive their ownership from
//! the same partition, so state-indexed data lives on the same worker.

use std::ops::Range;

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    num_states: usize,
    num_workers: usize,
}

impl Partition {
    pub fn new(num_states: usize, num_workers: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(ModelError::Parameters(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(Self {
            num_states,
            num_workers,
        })
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn local_len(&self, rank: usize) -> usize {
        let base = self.num_states / self.num_workers;
        if rank < self.num_states % self.num_workers {
            base + 1
        } else {
            base
        }
    }

    pub fn range(&self, rank: usize) -> Range<usize> {
        let base = self.num_states / self.num_workers;
        let extra = self.num_states % self.num_workers;
        let start = rank * base + rank.min(extra);
        start..start + self.local_len(rank)
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.num_workers).map(|rank| self.range(rank))
    }

    pub fn owner_of(&self, state: usize) -> Option<usize> {
        if state >= self.num_states {
            return None;
        }
        let base = self.num_states / self.num_workers;
        let extra = self.num_states % self.num_workers;
        let boundary = extra * (base + 1);
        if state < boundary {
            Some(state / (base + 1))
        } else {
            Some(extra + (state - boundary) / base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_goes_to_lowest_ranks() {
        let partition = Partition::new(11, 4).unwrap();
        let lens: Vec<_> = (0..4).map(|r| partition.local_len(r)).collect();
        assert_eq!(lens, vec![3, 3, 3, 2]);
        let ranges: Vec<_> = partition.ranges().collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..11]);
    }

    #[test]
    fn test_more_workers_than_states() {
        let partition = Partition::new(2, 5).unwrap();
        let ranges: Vec<_> = partition.ranges().collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2, 2..2]);
        assert_eq!(partition.owner_of(1), Some(1));
        assert_eq!(partition.owner_of(2), None);
    }

    #[test]
    fn test_owner_matches_range() {
        for num_workers in 1..9 {
            let partition = Partition::new(101, num_workers).unwrap();
            for (rank, range) in partition.ranges().enumerate() {
                for state in range {
                    assert_eq!(partition.owner_of(state), Some(rank));
                }
            }
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Partition::new(10, 0).is_err());
    }
}
