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

//! This module defines the `ShrinkStrategy` trait: the contract of the
//! component which decides *how* a factor is abstracted when it grows beyond
//! the configured size limits.

use crate::FactoredTransitionSystem;

/// An equivalence relation over the states `{0..n-1}` of one factor: each
/// entry is one equivalence class, listing the states it contains. Classes
/// are non-empty and pairwise disjoint; states missing from every class are
/// pruned by the abstraction.
pub type StateEquivalenceRelation = Vec<Vec<usize>>;

/// A shrink strategy computes an equivalence relation over the states of one
/// factor, trying to stay within a given size limit. The relation is then
/// applied by the factored transition system which owns the factor; the
/// strategy itself never mutates anything.
///
/// The strategy may rely on the factor's distances being computed (they
/// always are when the main loop calls it).
pub trait ShrinkStrategy {
    /// A short name used in log output.
    fn name(&self) -> &str;

    /// Computes an equivalence relation over the states of factor `index`
    /// with at most `target_size` classes whenever possible. Strategies that
    /// refuse to coarsen beyond some point (e.g. bisimulation with the
    /// `Return` at-limit policy) may return more classes; the caller must
    /// cope with that.
    fn compute_equivalence_relation(
        &mut self,
        fts: &FactoredTransitionSystem,
        index: usize,
        target_size: usize,
    ) -> StateEquivalenceRelation;
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_shrink {
    use crate::{FactoredTransitionSystem, ShrinkStrategy, StateEquivalenceRelation};

    /// A dummy strategy which lumps every state into a single class; only
    /// meant to show the trait is object safe.
    struct CollapseEverything;
    impl ShrinkStrategy for CollapseEverything {
        fn name(&self) -> &str {
            "collapse"
        }
        fn compute_equivalence_relation(
            &mut self,
            fts: &FactoredTransitionSystem,
            index: usize,
            _target_size: usize,
        ) -> StateEquivalenceRelation {
            vec![(0..fts.get_transition_system(index).num_states()).collect()]
        }
    }

    #[test]
    fn the_trait_is_object_safe() {
        let strategy: Box<dyn ShrinkStrategy> = Box::new(CollapseEverything);
        assert_eq!("collapse", strategy.name());
    }
}
