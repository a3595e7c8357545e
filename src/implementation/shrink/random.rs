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

//! This module provides the random shrink strategy: a seeded, uniformly
//! random partition of the states into blocks of (roughly) equal size. It is
//! only ever useful as a baseline to compare smarter strategies against.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{FactoredTransitionSystem, ShrinkStrategy, StateEquivalenceRelation};

/// The random shrink strategy. See the module documentation.
#[derive(Debug, Clone)]
pub struct ShrinkRandom {
    rng: StdRng,
}

impl ShrinkRandom {
    pub fn new(seed: u64) -> Self {
        ShrinkRandom { rng: StdRng::seed_from_u64(seed) }
    }
}

impl ShrinkStrategy for ShrinkRandom {
    fn name(&self) -> &str {
        "random"
    }

    fn compute_equivalence_relation(
        &mut self,
        fts: &FactoredTransitionSystem,
        index: usize,
        target_size: usize,
    ) -> StateEquivalenceRelation {
        let n = fts.get_transition_system(index).num_states();
        let target = target_size.clamp(1, n);
        let block_size = n.div_ceil(target);

        let mut states: Vec<usize> = (0..n).collect();
        states.shuffle(&mut self.rng);
        states.chunks(block_size).map(|chunk| chunk.to_vec()).collect()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_random_shrink {
    use crate::*;

    fn fts_with_domain(domain: usize) -> FactoredTransitionSystem {
        let task = ExplicitTask::new(
            vec![domain],
            vec![],
            vec![0],
            vec![Fact { variable: Variable(0), value: 0 }],
        );
        FactoredTransitionSystem::new(&task)
    }

    #[test]
    fn the_partition_covers_every_state_once() {
        let fts = fts_with_domain(10);
        let mut strategy = ShrinkRandom::new(42);
        let relation = strategy.compute_equivalence_relation(&fts, 0, 3);
        assert!(relation.len() <= 3);
        let mut seen: Vec<usize> = relation.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!((0..10).collect::<Vec<_>>(), seen);
    }

    #[test]
    fn the_same_seed_yields_the_same_partition() {
        let fts = fts_with_domain(8);
        let a = ShrinkRandom::new(7).compute_equivalence_relation(&fts, 0, 4);
        let b = ShrinkRandom::new(7).compute_equivalence_relation(&fts, 0, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn a_target_of_one_collapses_everything() {
        let fts = fts_with_domain(5);
        let mut strategy = ShrinkRandom::new(0);
        let relation = strategy.compute_equivalence_relation(&fts, 0, 1);
        assert_eq!(1, relation.len());
        assert_eq!(5, relation[0].len());
    }
}
