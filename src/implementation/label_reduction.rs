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

//! This module provides exact label reduction. Two labels can be combined
//! relative to some factor iff they have the same cost and belong to the same
//! local group in *every other* live factor: replacing them by a single fresh
//! label then provably preserves the induced heuristic. The strategy
//! enumerates maximal such sets, emits a reduction plan, and lets the
//! factored transition system apply it atomically.

use fxhash::FxHashMap;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::FactoredTransitionSystem;

/// The order in which the live factors get a chance to serve as the "exempt"
/// factor of a reduction, after the two factors of the upcoming merge (which
/// always go first).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SystemOrder {
    /// increasing factor index
    #[default]
    Regular,
    /// decreasing factor index
    Reverse,
    /// a seeded random permutation, reshuffled on every call
    Random,
}

/// The exact label reduction strategy. See the module documentation.
#[derive(Debug, Clone)]
pub struct ExactLabelReduction {
    /// apply label reduction right before the shrink step of an iteration
    pub before_shrinking: bool,
    /// apply label reduction right before the merge step of an iteration
    pub before_merging: bool,
    /// the order in which factors are considered within one call
    pub system_order: SystemOrder,
    rng: StdRng,
}

impl ExactLabelReduction {
    pub fn new(before_shrinking: bool, before_merging: bool) -> Self {
        Self::with_order(before_shrinking, before_merging, SystemOrder::Regular, 0)
    }

    pub fn with_order(
        before_shrinking: bool,
        before_merging: bool,
        system_order: SystemOrder,
        seed: u64,
    ) -> Self {
        ExactLabelReduction {
            before_shrinking,
            before_merging,
            system_order,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Runs label reduction to a fixpoint: every live factor, starting with
    /// the two factors of the upcoming merge and continuing in the configured
    /// system order, gets a chance to act as the exempt factor until a full
    /// round combines nothing anymore. Returns true iff any labels were
    /// combined.
    pub fn reduce(
        &mut self,
        merge_pair: (usize, usize),
        fts: &mut FactoredTransitionSystem,
    ) -> bool {
        let order = self.factor_order(merge_pair, fts);
        if order.len() <= 1 {
            return false;
        }

        let mut reduced_any = false;
        let mut unsuccessful = 0;
        let mut position = 0;
        while unsuccessful < order.len() {
            let exempt = order[position % order.len()];
            position += 1;
            if !fts.is_active(exempt) {
                unsuccessful += 1;
                continue;
            }

            let mapping = compute_label_mapping(fts, exempt);
            if mapping.is_empty() {
                unsuccessful += 1;
            } else {
                debug!(
                    "label reduction relative to factor {exempt}: {} fewer labels",
                    mapping.iter().map(|(_, olds)| olds.len() - 1).sum::<usize>(),
                );
                fts.apply_label_reduction(&mapping, exempt);
                reduced_any = true;
                unsuccessful = 0;
            }
        }
        reduced_any
    }

    /// The factor order of one call: the merge pair first, then every other
    /// live factor per the configured system order.
    fn factor_order(
        &mut self,
        merge_pair: (usize, usize),
        fts: &FactoredTransitionSystem,
    ) -> Vec<usize> {
        let mut rest: Vec<usize> = fts
            .live_indices()
            .into_iter()
            .filter(|&i| i != merge_pair.0 && i != merge_pair.1)
            .collect();
        match self.system_order {
            SystemOrder::Regular => {}
            SystemOrder::Reverse => rest.reverse(),
            SystemOrder::Random => rest.shuffle(&mut self.rng),
        }
        let mut order = vec![merge_pair.0, merge_pair.1];
        order.extend(rest);
        order
    }
}

/// Computes the reduction plan relative to the given exempt factor: active
/// labels are grouped by `(cost, local group in every other live factor)`,
/// and every bucket of two or more labels becomes one plan entry. The fresh
/// label identifiers are assigned in the order the buckets first appear.
fn compute_label_mapping(
    fts: &FactoredTransitionSystem,
    exempt: usize,
) -> Vec<(usize, Vec<usize>)> {
    let others: Vec<usize> =
        fts.live_indices().into_iter().filter(|&i| i != exempt).collect();

    let mut bucket_of: FxHashMap<(isize, Vec<usize>), usize> = FxHashMap::default();
    let mut buckets: Vec<Vec<usize>> = vec![];
    for label in fts.labels().active_labels() {
        let key = (
            fts.labels().cost(label),
            others
                .iter()
                .map(|&i| {
                    fts.get_transition_system(i)
                        .group_of_label(label)
                        .expect("active label outside any group")
                })
                .collect::<Vec<usize>>(),
        );
        let bucket = *bucket_of.entry(key).or_insert_with(|| {
            buckets.push(vec![]);
            buckets.len() - 1
        });
        buckets[bucket].push(label);
    }

    let mut next_label = fts.labels().len();
    buckets
        .into_iter()
        .filter(|labels| labels.len() >= 2)
        .map(|labels| {
            let entry = (next_label, labels);
            next_label += 1;
            entry
        })
        .collect()
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_label_reduction {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// Two operators acting identically on v1 but differently on v0, plus an
    /// unrelated third variable where both self loop. Relative to factor 0,
    /// the two labels are combinable.
    fn task() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![
                        Effect { fact: fact(0, 1), conditions: vec![] },
                        Effect { fact: fact(1, 1), conditions: vec![] },
                    ],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 1)],
                    effects: vec![
                        Effect { fact: fact(0, 0), conditions: vec![] },
                        Effect { fact: fact(1, 1), conditions: vec![] },
                    ],
                },
            ],
            vec![0, 0, 0],
            vec![fact(1, 1)],
        )
    }

    #[test]
    fn combinable_labels_get_reduced() {
        let task = task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut reduction = ExactLabelReduction::new(true, false);
        let reduced = reduction.reduce((0, 1), &mut fts);
        assert!(reduced);
        assert_eq!(1, fts.labels().num_active());
    }

    #[test]
    fn reduction_preserves_every_factor_heuristic() {
        let task = task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let before: Vec<isize> =
            fts.live_indices().iter().map(|&i| fts.get_init_goal_distance(i)).collect();
        ExactLabelReduction::new(true, false).reduce((0, 1), &mut fts);
        let after: Vec<isize> =
            fts.live_indices().iter().map(|&i| fts.get_init_goal_distance(i)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn labels_of_distinct_costs_are_never_combined() {
        let mut raw = task();
        // same behavior but different costs
        let ops = vec![
            ExplicitOperator { cost: 1, ..raw_operator(&raw, 0) },
            ExplicitOperator { cost: 2, ..raw_operator(&raw, 1) },
        ];
        raw = ExplicitTask::new(vec![2, 2, 2], ops, vec![0, 0, 0], vec![fact(1, 1)]);
        let mut fts = FactoredTransitionSystem::new(&raw);
        let reduced = ExactLabelReduction::new(true, false).reduce((0, 1), &mut fts);
        assert!(!reduced);
        assert_eq!(2, fts.labels().num_active());
    }

    #[test]
    fn reducing_twice_in_a_row_is_idempotent() {
        let task = task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut reduction = ExactLabelReduction::new(true, false);
        assert!(reduction.reduce((0, 1), &mut fts));
        // nothing changed in between: the second call is a zero effect pass
        assert!(!reduction.reduce((0, 1), &mut fts));
    }

    fn raw_operator(task: &ExplicitTask, op: usize) -> ExplicitOperator {
        ExplicitOperator {
            cost: task.operator_cost(op),
            preconditions: task.operator_preconditions(op).to_vec(),
            effects: task.operator_effects(op).to_vec(),
        }
    }
}
