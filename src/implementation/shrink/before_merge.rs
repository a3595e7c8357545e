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

//! This module provides the combined "shrink before merge" step: given the
//! two factors about to be merged, it computes balanced target sizes so that
//! their product respects the global size limit, and shrinks each factor that
//! exceeds its target (or the shrink threshold).

use log::debug;

use crate::{FactoredTransitionSystem, ShrinkStrategy};

/// Computes the target sizes for the two factors about to be merged. Both
/// sizes are first capped by `max_before_merge`; if their product still
/// exceeds `max_states`, balanced sizes are derived from `√max_states`: a
/// side already small enough keeps its size and the other gets whatever
/// budget remains, otherwise both are capped at the balanced size.
pub fn compute_shrink_sizes(
    size1: usize,
    size2: usize,
    max_states: usize,
    max_before_merge: usize,
) -> (usize, usize) {
    let mut new_size1 = size1.min(max_before_merge);
    let mut new_size2 = size2.min(max_before_merge);

    if new_size1.saturating_mul(new_size2) > max_states {
        let balanced = (max_states as f64).sqrt() as usize;
        if new_size1 <= balanced {
            // the first factor is small enough: use whatever is left for the
            // second one
            new_size2 = max_states / new_size1;
        } else if new_size2 <= balanced {
            new_size1 = max_states / new_size2;
        } else {
            // both are too big; treating them symmetrically wastes a little
            // of the allowance but keeps the computation fair to both sides
            new_size1 = balanced;
            new_size2 = balanced;
        }
    }
    debug_assert!(new_size1 <= size1 && new_size2 <= size2);
    debug_assert!(new_size1.saturating_mul(new_size2) <= max_states);
    (new_size1, new_size2)
}

/// Shrinks factor `index` towards `target_size` if it exceeds either the
/// target or the shrink threshold. Returns true iff the factor actually got
/// smaller.
pub fn shrink_factor(
    fts: &mut FactoredTransitionSystem,
    strategy: &mut dyn ShrinkStrategy,
    index: usize,
    target_size: usize,
    threshold: usize,
) -> bool {
    let size = fts.get_transition_system(index).num_states();
    if size > target_size.min(threshold) {
        let relation = strategy.compute_equivalence_relation(fts, index, target_size);
        if relation.len() < size {
            debug!(
                "shrinking factor {index} from {size} to {} states ({})",
                relation.len(),
                strategy.name(),
            );
            return fts.apply_abstraction(index, &relation);
        }
    }
    false
}

/// The combined shrink-before-merge step of one main loop iteration: both
/// factors of the upcoming merge are shrunk (if needed) so that their product
/// stays within `max_states`. Returns true iff at least one of them got
/// smaller.
pub fn shrink_before_merge_step(
    fts: &mut FactoredTransitionSystem,
    strategy: &mut dyn ShrinkStrategy,
    index1: usize,
    index2: usize,
    max_states: usize,
    max_states_before_merge: usize,
    threshold_before_merge: usize,
) -> bool {
    let size1 = fts.get_transition_system(index1).num_states();
    let size2 = fts.get_transition_system(index2).num_states();
    let (target1, target2) =
        compute_shrink_sizes(size1, size2, max_states, max_states_before_merge);

    let shrunk1 = shrink_factor(fts, strategy, index1, target1, threshold_before_merge);
    let shrunk2 = shrink_factor(fts, strategy, index2, target2, threshold_before_merge);
    shrunk1 || shrunk2
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_before_merge {
    use crate::*;

    #[test]
    fn sizes_within_the_limits_are_kept() {
        assert_eq!((10, 20), compute_shrink_sizes(10, 20, 1000, 100));
    }

    #[test]
    fn sizes_are_first_capped_by_the_before_merge_limit() {
        assert_eq!((50, 20), compute_shrink_sizes(80, 20, 10_000, 50));
    }

    #[test]
    fn a_small_side_keeps_its_size_and_the_other_gets_the_rest() {
        // 4 * 1000 > 100, balanced = 10, size1 = 4 <= 10 -> size2 = 100 / 4
        assert_eq!((4, 25), compute_shrink_sizes(4, 1000, 100, 1000));
        assert_eq!((25, 4), compute_shrink_sizes(1000, 4, 100, 1000));
    }

    #[test]
    fn two_large_sides_are_balanced_symmetrically() {
        assert_eq!((10, 10), compute_shrink_sizes(50, 60, 100, 1000));
    }

    #[test]
    fn the_product_never_exceeds_the_limit() {
        for (s1, s2, max) in [(7, 13, 29), (100, 100, 1), (3, 3, 10), (50, 2, 60)] {
            let (n1, n2) = compute_shrink_sizes(s1, s2, max, max);
            assert!(n1 * n2 <= max, "{n1} * {n2} > {max}");
        }
    }

    #[test]
    fn a_threshold_equal_to_the_size_disables_shrinking() {
        let task = ExplicitTask::new(
            vec![4],
            vec![],
            vec![0],
            vec![Fact { variable: Variable(0), value: 0 }],
        );
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = ShrinkFPreserving::default();
        // target >= size and threshold >= size: nothing happens
        let shrunk = shrink_factor(&mut fts, &mut strategy, 0, 4, 4);
        assert!(!shrunk);
        assert_eq!(4, fts.get_transition_system(0).num_states());
    }
}
