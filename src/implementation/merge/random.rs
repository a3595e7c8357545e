// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides the random merge strategy: a seeded, uniformly
//! random choice among the live factor pairs. Like its shrink counterpart it
//! exists as a baseline.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::{FactoredTransitionSystem, MergeStrategy};

use super::candidate_indices;

/// The random merge strategy. See the module documentation.
#[derive(Debug, Clone)]
pub struct MergeRandom {
    rng: StdRng,
}

impl MergeRandom {
    pub fn new(seed: u64) -> Self {
        MergeRandom { rng: StdRng::seed_from_u64(seed) }
    }
}

impl MergeStrategy for MergeRandom {
    fn name(&self) -> &str {
        "random"
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        let candidates = candidate_indices(fts, allowed);
        assert!(candidates.len() >= 2, "not enough live factors to merge");
        let a = self.rng.random_range(0..candidates.len());
        let mut b = self.rng.random_range(0..candidates.len() - 1);
        if b >= a {
            b += 1;
        }
        (candidates[a], candidates[b])
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_random_merge {
    use crate::*;

    fn fts_with_vars(n: usize) -> FactoredTransitionSystem {
        let task = ExplicitTask::new(
            vec![2; n],
            vec![],
            vec![0; n],
            vec![Fact { variable: Variable(0), value: 1 }],
        );
        FactoredTransitionSystem::new(&task)
    }

    #[test]
    fn the_pair_is_always_made_of_two_distinct_live_indices() {
        let mut fts = fts_with_vars(5);
        let mut strategy = MergeRandom::new(17);
        for _ in 0..50 {
            let (a, b) = strategy.next_pair(&mut fts, &[]);
            assert_ne!(a, b);
            assert!(fts.is_active(a) && fts.is_active(b));
        }
    }

    #[test]
    fn a_restricted_subset_of_two_leaves_no_choice() {
        let mut fts = fts_with_vars(4);
        let mut strategy = MergeRandom::new(0);
        for _ in 0..10 {
            let (a, b) = strategy.next_pair(&mut fts, &[1, 3]);
            assert_eq!([1, 3], { let mut p = [a, b]; p.sort_unstable(); p });
        }
    }
}
