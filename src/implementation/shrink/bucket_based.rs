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

//! This module provides the f-preserving shrink strategy: states are grouped
//! into buckets of equal `(init distance, goal distance)`, and buckets are
//! collapsed -- largest first -- until the factor fits the size limit.
//! Collapsing within a bucket preserves both distances of every state, hence
//! the name.

use fxhash::FxHashMap;

use crate::{FactoredTransitionSystem, ShrinkStrategy, StateEquivalenceRelation};

/// The f-preserving shrink strategy. See the module documentation.
#[derive(Debug, Clone, Default)]
pub struct ShrinkFPreserving {
    /// with the greedy variant, the buckets with the highest f value
    /// (`init + goal` distance) are collapsed first regardless of their size;
    /// otherwise size is the primary criterion and f only breaks ties.
    pub greedy: bool,
}

impl ShrinkStrategy for ShrinkFPreserving {
    fn name(&self) -> &str {
        "f-preserving"
    }

    fn compute_equivalence_relation(
        &mut self,
        fts: &FactoredTransitionSystem,
        index: usize,
        target_size: usize,
    ) -> StateEquivalenceRelation {
        let ts = fts.get_transition_system(index);
        let distances = fts.get_distances(index);
        let n = ts.num_states();

        // Bucket states by (g, h, goal flag). The goal flag is normally
        // implied by h = 0, but zero cost labels can give non goal states a
        // zero goal distance; a goal state must never be lumped with a non
        // goal state.
        let mut bucket_of: FxHashMap<(isize, isize, bool), usize> = FxHashMap::default();
        let mut buckets: Vec<Vec<usize>> = vec![];
        for state in 0..n {
            let key = (
                distances.init_distance(state),
                distances.goal_distance(state),
                ts.is_goal_state(state),
            );
            let bucket = *bucket_of.entry(key).or_insert_with(|| {
                buckets.push(vec![]);
                buckets.len() - 1
            });
            buckets[bucket].push(state);
        }

        // Each state starts out as its own block; collapsing a bucket spares
        // `len - 1` blocks. Collapse one bucket per step until the count
        // fits.
        let mut collapsed = vec![false; buckets.len()];
        let mut num_blocks = n;
        while num_blocks > target_size.max(buckets.len()) {
            let f = |b: usize| {
                let state = buckets[b][0];
                distances
                    .init_distance(state)
                    .saturating_add(distances.goal_distance(state))
            };
            let candidate = (0..buckets.len())
                .filter(|&b| !collapsed[b] && buckets[b].len() > 1)
                .max_by_key(|&b| {
                    if self.greedy {
                        (f(b), buckets[b].len() as isize)
                    } else {
                        (buckets[b].len() as isize, f(b))
                    }
                });
            match candidate {
                None => break,
                Some(bucket) => {
                    num_blocks -= buckets[bucket].len() - 1;
                    collapsed[bucket] = true;
                }
            }
        }

        let mut relation: StateEquivalenceRelation = Vec::with_capacity(num_blocks);
        for (bucket, states) in buckets.iter().enumerate() {
            if collapsed[bucket] {
                relation.push(states.clone());
            } else {
                relation.extend(states.iter().map(|&s| vec![s]));
            }
        }
        relation
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
