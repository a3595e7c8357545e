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

//! This module provides the heuristic extracted from a (possibly partially)
//! merged factored transition system: a set of distance-ified
//! representations, evaluated per search state with the maximum over the
//! factors as the estimate. The heuristic owns everything it needs; the
//! factored system can be dropped right after extraction.

use log::info;

use crate::{FactoredTransitionSystem, PlanningTask, Representation, DEAD_END};

/// The merge-and-shrink heuristic. See the module documentation.
pub struct MergeAndShrinkHeuristic {
    representations: Vec<Representation>,
}

impl MergeAndShrinkHeuristic {
    /// Extracts the heuristic from a factored transition system. When some
    /// factor was found unsolvable, it alone is extracted (any state mapping
    /// into its dead part makes the whole task unsolvable and the others add
    /// nothing). Otherwise every live factor contributes: a single one after
    /// a complete construction, several after an interrupted one.
    pub fn new(mut fts: FactoredTransitionSystem) -> Self {
        let extract = match fts.unsolvable_index() {
            Some(unsolvable) => vec![unsolvable],
            None => fts.live_indices(),
        };
        let mut representations = Vec::with_capacity(extract.len());
        for index in extract {
            let (mut representation, distances) = fts.extract_factor(index);
            representation.set_distances(&distances);
            representations.push(representation);
        }
        info!(
            "merge-and-shrink heuristic over {} factor(s)",
            representations.len(),
        );
        MergeAndShrinkHeuristic { representations }
    }

    /// Convenience constructor: runs the given algorithm on the task and
    /// extracts the heuristic from whatever it built.
    pub fn from_algorithm(
        task: &dyn PlanningTask,
        algorithm: &mut crate::MergeAndShrinkAlgorithm<'_>,
    ) -> Self {
        let (fts, _) = algorithm.build_factored_transition_system(task);
        Self::new(fts)
    }

    /// The heuristic estimate for the given full task state: the maximum
    /// goal distance over the extracted factors, or `None` when some factor
    /// proves the state a dead end. The estimate is admissible: it never
    /// exceeds the true cost of reaching the goal from `state`.
    pub fn value(&self, state: &[usize]) -> Option<isize> {
        let mut best = 0;
        for representation in &self.representations {
            match representation.get_value(state) {
                DEAD_END => return None,
                estimate => best = best.max(estimate),
            }
        }
        Some(best)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
