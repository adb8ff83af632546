//! Active-set bookkeeping for the coordinate-descent solvers
//!
//! Variables that look optimal at a bound are moved behind the active
//! prefix and skipped until the solver reactivates everything. The stopping
//! test is only trusted once it holds on the full set, so each solver
//! reactivates once before it returns.

use rand::rngs::StdRng;
use rand::Rng;

/// Permutation of the optimized variables with a movable active prefix
#[derive(Debug, Clone)]
pub struct ActiveSet {
    index: Vec<usize>,
    active_size: usize,
}

impl ActiveSet {
    /// Active set holding exactly `members`
    pub fn new(members: Vec<usize>) -> Self {
        let active_size = members.len();
        Self {
            index: members,
            active_size,
        }
    }

    /// Number of variables still being optimized
    pub fn len(&self) -> usize {
        self.active_size
    }

    pub fn is_empty(&self) -> bool {
        self.active_size == 0
    }

    /// Variable at position `s` of the active prefix
    pub fn get(&self, s: usize) -> usize {
        self.index[s]
    }

    /// Fisher–Yates shuffle of the active prefix
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        for i in 0..self.active_size {
            let k = rng.gen_range(i..self.active_size);
            self.index.swap(i, k);
        }
    }

    /// Drop the variable at position `s` from the active prefix.
    ///
    /// The last active variable moves into slot `s`, so the caller must
    /// revisit `s` without advancing.
    pub fn shrink(&mut self, s: usize) {
        self.active_size -= 1;
        self.index.swap(s, self.active_size);
    }

    /// True when no variable is currently shrunk
    pub fn is_full(&self) -> bool {
        self.active_size == self.index.len()
    }

    /// Bring every shrunk variable back
    pub fn reactivate(&mut self) {
        self.active_size = self.index.len();
    }
}
