//! Cartesian products over index pools
//!
//! [`IterProducts`] enumerates every way to pick one index from each pool, in
//! mixed-radix counting order with the first position changing fastest. It
//! is finite, lazy and restartable with [`IterProducts::reset`].

use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Done,
}

/// Iterator over index tuples `[i_0, .., i_n]` with `i_k < pool_sizes[k]`
///
/// A pool of size zero yields no tuples at all. An empty list of pools
/// yields the empty tuple once.
#[derive(Debug, Clone)]
pub struct IterProducts {
    pool_sizes: Vec<usize>,
    current: Vec<usize>,
    state: State,
}

impl IterProducts {
    /// Enumerate products over pools of the given sizes
    pub fn new(pool_sizes: Vec<usize>) -> Self {
        IterProducts {
            current: Vec::with_capacity(pool_sizes.len()),
            pool_sizes,
            state: State::Fresh,
        }
    }

    /// Restart from the first tuple
    pub fn reset(&mut self) {
        self.current.clear();
        self.state = State::Fresh;
    }

    /// Sizes this iterator was built over
    pub fn pool_sizes(&self) -> &[usize] {
        &self.pool_sizes
    }

    /// Total number of tuples a fresh iterator yields (saturating)
    pub fn total(&self) -> usize {
        self.pool_sizes
            .iter()
            .fold(1usize, |acc, &n| acc.saturating_mul(n))
    }
}

impl Iterator for IterProducts {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        match self.state {
            State::Done => None,
            State::Fresh => {
                if self.pool_sizes.contains(&0) {
                    self.state = State::Done;
                    return None;
                }
                self.current = vec![0; self.pool_sizes.len()];
                self.state = State::Running;
                Some(self.current.clone())
            }
            State::Running => {
                for (digit, &size) in self.current.iter_mut().zip(&self.pool_sizes) {
                    *digit += 1;
                    if *digit < size {
                        return Some(self.current.clone());
                    }
                    *digit = 0;
                }
                self.state = State::Done;
                None
            }
        }
    }
}

impl FusedIterator for IterProducts {}
