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

//! This module provides the bisimulation shrink strategy: it computes the
//! coarsest partition of the states of a factor such that two states of one
//! block have identical group-indexed transition signatures into the blocks.
//! Shrinking with a (non-greedy) bisimulation is exact: it never loses
//! heuristic value.

use fxhash::FxHashMap;

use crate::{
    FactoredTransitionSystem, ShrinkStrategy, StateEquivalenceRelation, INFINITY,
};

/// What to do when the coarsest bisimulation is finer than the allowed size.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum AtLimit {
    /// stop refining and return the (too coarse to be a bisimulation, but
    /// admissible) partition reached so far
    #[default]
    Return,
    /// keep splitting blocks while the budget lasts, lumping whatever is left
    UseUp,
}

/// The bisimulation shrink strategy. See the module documentation.
#[derive(Debug, Clone, Default)]
pub struct ShrinkBisimulation {
    /// with the greedy variant, transitions leading to a state farther from
    /// the goal than their source are ignored when building signatures. This
    /// accelerates convergence, but the resulting abstraction is only
    /// guaranteed admissible for unit-cost labels.
    pub greedy: bool,
    /// the policy applied when the size limit is hit
    pub at_limit: AtLimit,
}

/// One state's view of the outgoing transitions: the set of
/// `(label group, target block)` pairs, sorted and duplicate free.
type Signature = Vec<(usize, usize)>;

impl ShrinkStrategy for ShrinkBisimulation {
    fn name(&self) -> &str {
        if self.greedy {
            "greedy bisimulation"
        } else {
            "bisimulation"
        }
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
        let h = |state: usize| distances.goal_distance(state);

        // Initial partition: {goal, non goal} x goal distance, in increasing
        // distance order with all dead states lumped at the very end. Keeping
        // the blocks ordered by distance matters: when the budget runs out,
        // the states farthest from the goal are the ones left unsplit.
        let mut keys: Vec<(isize, bool)> =
            (0..n).map(|s| (h(s), !ts.is_goal_state(s))).collect();
        let mut order: Vec<(isize, bool)> = keys.clone();
        order.sort_unstable();
        order.dedup();
        let block_of_key: FxHashMap<(isize, bool), usize> =
            order.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let mut state_to_block: Vec<usize> =
            keys.drain(..).map(|k| block_of_key[&k]).collect();
        let mut num_blocks = order.len();

        let mut finished = false;
        while !finished {
            finished = true;

            let mut signatures: Vec<Signature> = vec![vec![]; n];
            for (group_id, group) in ts.label_groups() {
                for t in group.transitions() {
                    if h(t.from) == INFINITY || h(t.to) == INFINITY {
                        continue;
                    }
                    if self.greedy && h(t.to) > h(t.from) {
                        continue;
                    }
                    signatures[t.from].push((group_id, state_to_block[t.to]));
                }
            }
            for signature in signatures.iter_mut() {
                signature.sort_unstable();
                signature.dedup();
            }

            let mut members: Vec<Vec<usize>> = vec![vec![]; num_blocks];
            for state in 0..n {
                members[state_to_block[state]].push(state);
            }

            // One refinement pass: split every block by signature, as long as
            // the size budget allows.
            let mut new_num_blocks = 0;
            let mut new_state_to_block = vec![usize::MAX; n];
            for (block, block_members) in members.iter().enumerate() {
                let mut sub_blocks: Vec<(&Signature, Vec<usize>)> = vec![];
                for &state in block_members {
                    match sub_blocks
                        .iter_mut()
                        .find(|(sig, _)| **sig == signatures[state])
                    {
                        Some((_, states)) => states.push(state),
                        None => sub_blocks.push((&signatures[state], vec![state])),
                    }
                }

                let unprocessed = num_blocks - block - 1;
                let budget = target_size.saturating_sub(new_num_blocks + unprocessed);
                let mut split_count = sub_blocks.len();
                if split_count > budget.max(1) {
                    match self.at_limit {
                        AtLimit::Return => {
                            // refuse the crossing split and stop refining
                            split_count = 1;
                            finished = true;
                        }
                        AtLimit::UseUp => split_count = budget.max(1),
                    }
                } else if split_count > 1 {
                    finished = false;
                }
                for (sub, (_, states)) in sub_blocks.iter().enumerate() {
                    let target_block = new_num_blocks + sub.min(split_count - 1);
                    for &state in states {
                        new_state_to_block[state] = target_block;
                    }
                }
                new_num_blocks += split_count;
            }
            state_to_block = new_state_to_block;
            num_blocks = new_num_blocks;
        }

        // The initial distance partition may already be finer than the
        // target; with UseUp we owe the caller a partition within the limit
        // and lump the blocks farthest from the goal.
        if self.at_limit == AtLimit::UseUp && num_blocks > target_size {
            let limit = target_size.max(1);
            for block in state_to_block.iter_mut() {
                *block = (*block).min(limit - 1);
            }
            num_blocks = limit;
        }

        let mut relation: StateEquivalenceRelation = vec![vec![]; num_blocks];
        for state in 0..n {
            relation[state_to_block[state]].push(state);
        }
        relation
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_bisimulation {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// A diamond over one variable: 0 -> {1, 2} -> 3 where both middle
    /// values behave identically; goal is value 3.
    fn diamond_task() -> ExplicitTask {
        let step = |pre: usize, post: usize| ExplicitOperator {
            cost: 1,
            preconditions: vec![fact(0, pre)],
            effects: vec![Effect { fact: fact(0, post), conditions: vec![] }],
        };
        ExplicitTask::new(
            vec![4],
            vec![step(0, 1), step(0, 2), step(1, 3), step(2, 3)],
            vec![0],
            vec![fact(0, 3)],
        )
    }

    #[test]
    fn bisimilar_states_fall_into_one_class() {
        let task = diamond_task();
        let fts = FactoredTransitionSystem::new(&task);
        let mut strategy = ShrinkBisimulation::default();
        let relation = strategy.compute_equivalence_relation(&fts, 0, usize::MAX);

        // states 1 and 2 carry different labels towards the goal, hence they
        // are only bisimilar if those labels share a group; here they do not,
        // so the relation keeps them apart but still has one class per state
        assert_eq!(4, relation.len());
    }

    #[test]
    fn states_with_grouped_labels_and_equal_behavior_are_lumped() {
        // both middle states use the *same* operator to reach the goal
        let task = ExplicitTask::new(
            vec![2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
            ],
            vec![0, 0],
            vec![fact(1, 1)],
        );
        let fts = FactoredTransitionSystem::new(&task);
        // factor 0 is goal irrelevant: both of its states are goal states
        // with identical signatures modulo blocks
        let mut strategy = ShrinkBisimulation::default();
        let relation = strategy.compute_equivalence_relation(&fts, 0, usize::MAX);
        assert_eq!(1, relation.len());
        assert_eq!(vec![0, 1], relation[0]);
    }

    #[test]
    fn a_minimal_factor_is_left_unchanged_for_large_targets() {
        let task = diamond_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = ShrinkBisimulation::default();
        let relation = strategy.compute_equivalence_relation(&fts, 0, 1000);
        assert!(!fts.apply_abstraction(0, &relation));
        assert_eq!(4, fts.get_transition_system(0).num_states());
    }

    #[test]
    fn use_up_respects_the_size_limit() {
        let task = diamond_task();
        let fts = FactoredTransitionSystem::new(&task);
        let mut strategy =
            ShrinkBisimulation { greedy: false, at_limit: AtLimit::UseUp };
        let relation = strategy.compute_equivalence_relation(&fts, 0, 2);
        assert!(relation.len() <= 2);
        // every state belongs to exactly one class
        let mut seen: Vec<usize> = relation.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(vec![0, 1, 2, 3], seen);
    }

    #[test]
    fn shrinking_preserves_the_initial_goal_distance() {
        let task = diamond_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let before = fts.get_init_goal_distance(0);
        let mut strategy = ShrinkBisimulation::default();
        let relation = strategy.compute_equivalence_relation(&fts, 0, usize::MAX);
        fts.apply_abstraction(0, &relation);
        assert_eq!(before, fts.get_init_goal_distance(0));
    }

    #[test]
    fn greedy_bisimulation_collapses_harder() {
        let task = diamond_task();
        let fts = FactoredTransitionSystem::new(&task);
        let mut exact = ShrinkBisimulation::default();
        let mut greedy = ShrinkBisimulation { greedy: true, at_limit: AtLimit::Return };
        let exact_len = exact.compute_equivalence_relation(&fts, 0, usize::MAX).len();
        let greedy_len = greedy.compute_equivalence_relation(&fts, 0, usize::MAX).len();
        assert!(greedy_len <= exact_len);
    }
}
