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

//! This module provides the score-based filtering merge selector: it holds
//! an ordered list of scoring functions and, at every iteration, narrows the
//! set of merge candidates down to the arg-mins of each function in turn,
//! until a single candidate remains. The last function of the list should be
//! a unique tie breaker (total order or single random), otherwise ending up
//! with several equally scored candidates is a configuration bug and panics.

use crate::{
    FactoredTransitionSystem, MergeScoringFunction, MergeStrategy, PlanningTask,
};

use super::candidate_indices;

/// The score-based filtering selector. It doubles as a [`MergeStrategy`]
/// (selecting among all live factors) and as the internal selector of
/// composite strategies such as SCC merging.
pub struct ScoreBasedFiltering {
    scoring_functions: Vec<Box<dyn MergeScoringFunction>>,
    iterations_with_tiebreaking: usize,
    total_tiebreaking_candidates: usize,
}

impl ScoreBasedFiltering {
    pub fn new(scoring_functions: Vec<Box<dyn MergeScoringFunction>>) -> Self {
        assert!(!scoring_functions.is_empty(), "at least one scoring function is required");
        ScoreBasedFiltering {
            scoring_functions,
            iterations_with_tiebreaking: 0,
            total_tiebreaking_candidates: 0,
        }
    }

    /// The classic DFP configuration: goal relevance, then the DFP weight,
    /// then the deterministic total order tie breaker.
    pub fn dfp() -> Self {
        Self::new(vec![
            Box::new(super::ScoringGoalRelevance),
            Box::new(super::ScoringDfp),
            Box::new(super::ScoringTotalOrder::default()),
        ])
    }

    /// Selects the best merge among the (unordered) pairs of the given
    /// indices.
    pub fn select_merge(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        indices: &[usize],
    ) -> (usize, usize) {
        let mut candidates: Vec<(usize, usize)> = vec![];
        for (a, &i) in indices.iter().enumerate() {
            for &j in &indices[a + 1..] {
                candidates.push((i, j));
            }
        }
        assert!(!candidates.is_empty(), "no merge candidate among {indices:?}");

        let mut function = 0;
        while function < self.scoring_functions.len() && candidates.len() > 1 {
            let scores = self.scoring_functions[function].compute_scores(fts, &candidates);
            let name = self.scoring_functions[function].name();
            if name == "total order" || name == "single random" {
                self.iterations_with_tiebreaking += 1;
                self.total_tiebreaking_candidates += candidates.len();
            }

            let before = candidates.len();
            let best = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let remaining: Vec<(usize, usize)> = candidates
                .iter()
                .zip(scores.iter())
                .filter(|(_, &score)| score == best)
                .map(|(&candidate, _)| candidate)
                .collect();

            // mimic the plain DFP strategy: when goal relevance filtered
            // nothing because *no* pair was relevant, the dfp weights are all
            // meaningless and their computation can be skipped
            let skip_next = remaining.len() == before
                && best == f64::INFINITY
                && name == "goal relevance"
                && self
                    .scoring_functions
                    .get(function + 1)
                    .is_some_and(|next| next.name() == "dfp");

            candidates = remaining;
            function += if skip_next { 2 } else { 1 };
        }

        assert!(
            candidates.len() == 1,
            "more than one merge candidate remained after all scoring functions; \
             did you forget a uniquely tie-breaking function (total order or \
             single random)?"
        );
        candidates[0]
    }
}

impl MergeStrategy for ScoreBasedFiltering {
    fn name(&self) -> &str {
        "score based filtering"
    }

    fn initialize(&mut self, task: &dyn PlanningTask, _fts: &FactoredTransitionSystem) {
        for scoring in self.scoring_functions.iter_mut() {
            scoring.initialize(task);
        }
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        let indices = candidate_indices(fts, allowed);
        self.select_merge(fts, &indices)
    }

    fn tiebreaking_statistics(&self) -> (usize, usize) {
        (self.iterations_with_tiebreaking, self.total_tiebreaking_candidates)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_score_based {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    fn chain3_task() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(1, 1)],
                    effects: vec![Effect { fact: fact(2, 1), conditions: vec![] }],
                },
            ],
            vec![0, 0, 0],
            vec![fact(2, 1)],
        )
    }

    #[test]
    fn filtering_narrows_down_to_a_single_pair() {
        let task = chain3_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut selector = ScoreBasedFiltering::dfp();
        selector.initialize(&task, &fts);
        let (a, b) = selector.next_pair(&mut fts, &[]);
        assert_ne!(a, b);
        assert!(fts.is_active(a) && fts.is_active(b));
        // the goal variable factor takes part in the chosen merge
        assert!(a == 2 || b == 2);
    }

    #[test]
    fn a_subset_of_two_indices_leaves_exactly_that_pair() {
        let task = chain3_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut selector = ScoreBasedFiltering::dfp();
        selector.initialize(&task, &fts);
        assert_eq!((0, 1), selector.select_merge(&mut fts, &[0, 1]));
    }

    #[test]
    fn tiebreaking_statistics_accumulate() {
        let task = chain3_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut selector = ScoreBasedFiltering::new(vec![
            Box::new(ScoringTotalOrder::default()),
        ]);
        selector.initialize(&task, &fts);
        selector.next_pair(&mut fts, &[]);
        let (iterations, candidates) = selector.tiebreaking_statistics();
        assert_eq!(1, iterations);
        assert_eq!(3, candidates);
    }

    #[test]
    #[should_panic(expected = "more than one merge candidate")]
    fn missing_tie_breaker_panics() {
        let task = ExplicitTask::new(
            vec![2, 2, 2],
            vec![],
            vec![0, 0, 0],
            vec![fact(0, 1)],
        );
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut selector =
            ScoreBasedFiltering::new(vec![Box::new(ScoringNumVariables)]);
        selector.initialize(&task, &fts);
        selector.next_pair(&mut fts, &[]);
    }
}
