//! Flat action index <-> (hygiene level, social distancing level).
//!
//! The hygiene level varies fastest: `action = a2 * num_a1 + a1`. Matrix
//! columns of the stage costs and row offsets of the transition tensor both
//! use this encoding.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionIndexer {
    num_a1: usize,
    num_a2: usize,
}

impl ActionIndexer {
    pub fn new(num_a1: usize, num_a2: usize) -> Self {
        Self { num_a1, num_a2 }
    }

    pub fn num_a1(&self) -> usize {
        self.num_a1
    }

    pub fn num_a2(&self) -> usize {
        self.num_a2
    }

    pub fn num_actions(&self) -> usize {
        self.num_a1 * self.num_a2
    }

    pub fn actions(&self) -> Range<usize> {
        0..self.num_actions()
    }

    pub fn pair_of(&self, action: usize) -> (usize, usize) {
        (action % self.num_a1, action / self.num_a1)
    }

    pub fn index_of(&self, a1: usize, a2: usize) -> usize {
        a2 * self.num_a1 + a1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hygiene_level_varies_fastest() {
        let indexer = ActionIndexer::new(5, 4);
        assert_eq!(indexer.num_actions(), 20);
        assert_eq!(indexer.pair_of(0), (0, 0));
        assert_eq!(indexer.pair_of(4), (4, 0));
        assert_eq!(indexer.pair_of(5), (0, 1));
        assert_eq!(indexer.pair_of(19), (4, 3));
        assert_eq!(indexer.index_of(2, 3), 17);
    }

    #[test]
    fn test_round_trip() {
        let indexer = ActionIndexer::new(3, 7);
        for action in indexer.actions() {
            let (a1, a2) = indexer.pair_of(action);
            assert!(a1 < 3 && a2 < 7);
            assert_eq!(indexer.index_of(a1, a2), action);
        }
    }
}
