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

//! This module defines the contracts of the components which decide *what* to
//! merge next: the `MergeStrategy` trait implemented by all stock strategies,
//! the `MergeScoringFunction` trait used by the score-based filtering
//! selector, and the `SymmetryOracle` interface to an external
//! graph-canonicalization engine.

use crate::{FactoredTransitionSystem, PlanningTask};

/// A merge strategy picks, at every iteration of the main loop, the pair of
/// live factor indices which are to be merged next.
///
/// Strategies receive the factored transition system mutably because some of
/// them (those probing hypothetical merges, like the MIASM scoring function)
/// materialize transient copies of factors. Such copies must be released
/// before `next_pair` returns, so that from the caller's perspective the
/// factored transition system is never modified by a strategy.
pub trait MergeStrategy {
    /// A short name used in log output.
    fn name(&self) -> &str;

    /// Called once before the first iteration, with the freshly built atomic
    /// factored transition system. Strategies precomputing an order (linear
    /// variable orders, SCCs, MIASM trees, predefined orders) do their work
    /// here.
    fn initialize(&mut self, _task: &dyn PlanningTask, _fts: &FactoredTransitionSystem) {}

    /// Returns the next pair of factor indices to merge. Both indices must be
    /// live and distinct; violating this contract is a bug in the strategy
    /// and makes the main loop panic.
    ///
    /// When `allowed` is non-empty, the choice must be made among these
    /// indices only (the main loop restricts the candidates when factors are
    /// excluded for having too many transitions). An empty slice means no
    /// restriction.
    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize);

    /// Statistics about tie-breaking: the number of iterations where a
    /// tie-breaking scoring function had to discriminate between candidates,
    /// and the total number of candidates it saw. Only meaningful for
    /// score-based strategies; everything else reports zeroes.
    fn tiebreaking_statistics(&self) -> (usize, usize) {
        (0, 0)
    }
}

/// A scoring function assigns to every merge candidate a score, where *lower
/// is better*. The score-based filtering selector evaluates its scoring
/// functions in sequence, each time keeping only the candidates with minimal
/// score, until a single candidate remains.
pub trait MergeScoringFunction {
    /// A short name used in log output and by the selector to recognize the
    /// tie-breaking and short-circuit special cases.
    fn name(&self) -> &str;

    /// Called once before the first iteration; scoring functions that need
    /// task-level information (causal graph, mutexes) snapshot it here.
    fn initialize(&mut self, _task: &dyn PlanningTask) {}

    /// Computes one score per candidate, in order. The factored transition
    /// system is handed out mutably for the benefit of probing functions;
    /// see [`MergeStrategy::next_pair`] for the restore obligation.
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64>;
}

/// The interface to an external graph-canonicalization oracle, as consumed by
/// symmetry-based merging. Finding factored symmetries requires building a
/// symmetry graph of the factored transition system and running a
/// canonicalization engine over it; that engine is deliberately *not* part of
/// this crate. Clients owning one can plug it in through this trait and the
/// `MergeSymmetries` strategy.
pub trait SymmetryOracle {
    /// Returns clusters of live factor indices that the detected atomic
    /// symmetries map onto each other. Factors within one cluster are
    /// profitable to merge with each other before anything else. An empty
    /// result means no symmetry was found in the current factored system.
    fn symmetry_clusters(&self, fts: &FactoredTransitionSystem) -> Vec<Vec<usize>>;
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_merge {
    use crate::{FactoredTransitionSystem, MergeScoringFunction, MergeStrategy};

    struct FirstTwo;
    impl MergeStrategy for FirstTwo {
        fn name(&self) -> &str {
            "first two"
        }
        fn next_pair(
            &mut self,
            fts: &mut FactoredTransitionSystem,
            allowed: &[usize],
        ) -> (usize, usize) {
            let mut live = fts.live_indices();
            if !allowed.is_empty() {
                live.retain(|i| allowed.contains(i));
            }
            (live[0], live[1])
        }
    }

    struct Flat;
    impl MergeScoringFunction for Flat {
        fn name(&self) -> &str {
            "flat"
        }
        fn compute_scores(
            &mut self,
            _fts: &mut FactoredTransitionSystem,
            candidates: &[(usize, usize)],
        ) -> Vec<f64> {
            vec![0.0; candidates.len()]
        }
    }

    #[test]
    fn strategies_and_scoring_functions_are_object_safe() {
        let strategy: Box<dyn MergeStrategy> = Box::new(FirstTwo);
        let scoring: Box<dyn MergeScoringFunction> = Box::new(Flat);
        assert_eq!("first two", strategy.name());
        assert_eq!("flat", scoring.name());
    }

    #[test]
    fn by_default_strategies_report_no_tiebreaking() {
        assert_eq!((0, 0), FirstTwo.tiebreaking_statistics());
    }
}
