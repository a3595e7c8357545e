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

//! This module provides the MIASM merge strategy ("maximum intermediate
//! abstraction size minimizing"). Ahead of the main loop, it searches the
//! space of variable subsets for those whose merged projection sheds many
//! unreachable or irrelevant states, packs the best disjoint subsets into a
//! variable partition, and precomputes a merge order which first builds each
//! subset's product and then combines the products linearly.

use std::collections::VecDeque;

use log::warn;

use crate::{FactoredTransitionSystem, MergeStrategy, PlanningTask, Variable};

use super::candidate_indices;
use super::scoring::shrink_and_merge_temporarily;

/// The MIASM merge strategy. See the module documentation.
///
/// The subset search is bounded: candidate subsets never exceed
/// `max_subset_size` variables and at most `max_evaluations` subsets are
/// probed. Probing a subset actually merges (transient copies of) its atomic
/// factors, shrinking with a bisimulation under `max_states` beforehand,
/// exactly as the main loop would.
pub struct MergeMiasm {
    pub max_states: usize,
    pub max_subset_size: usize,
    pub max_evaluations: usize,
    merge_order: VecDeque<(usize, usize)>,
}

impl Default for MergeMiasm {
    fn default() -> Self {
        MergeMiasm {
            max_states: 50_000,
            max_subset_size: 3,
            max_evaluations: 64,
            merge_order: VecDeque::new(),
        }
    }
}

/// One evaluated variable subset: the ratio is `pruned product size / full
/// product size`, in `[0, 1]`; lower means more pruning.
#[derive(Debug, Clone)]
struct EvaluatedSubset {
    variables: Vec<usize>,
    ratio: f64,
}

impl MergeMiasm {
    /// Probes the merged projection onto `variables` and returns the size
    /// ratio. The scratch factored system is restored before returning.
    fn evaluate(
        &self,
        scratch: &mut FactoredTransitionSystem,
        variables: &[usize],
    ) -> f64 {
        let full_product: f64 = variables
            .iter()
            .map(|&v| scratch.get_transition_system(v).num_states() as f64)
            .product();

        let mut current = shrink_and_merge_temporarily(
            scratch,
            variables[0],
            variables[1],
            self.max_states,
        );
        for &variable in &variables[2..] {
            if !scratch.is_factor_solvable(current) {
                break;
            }
            current = shrink_and_merge_temporarily(
                scratch,
                current,
                variable,
                self.max_states,
            );
        }
        let ratio = if scratch.is_factor_solvable(current) {
            scratch.get_transition_system(current).num_states() as f64 / full_product
        } else {
            0.0
        };
        scratch.release_copies();
        ratio
    }

    /// The bounded best-first search over variable subsets: singleton seeds
    /// are extended one causally connected variable at a time, best ratio
    /// first, until the evaluation budget is spent.
    fn search_subsets(
        &self,
        task: &dyn PlanningTask,
        scratch: &mut FactoredTransitionSystem,
    ) -> Vec<EvaluatedSubset> {
        let n = task.num_variables();
        let mut evaluated: Vec<EvaluatedSubset> = vec![];
        let mut open: Vec<EvaluatedSubset> = (0..n)
            .map(|v| EvaluatedSubset { variables: vec![v], ratio: 1.0 })
            .collect();
        let mut seen: Vec<Vec<usize>> = open.iter().map(|s| s.variables.clone()).collect();
        let mut budget = self.max_evaluations;

        while budget > 0 {
            // best first: lowest ratio, then smallest subset
            open.sort_by(|a, b| {
                a.ratio
                    .total_cmp(&b.ratio)
                    .then_with(|| a.variables.len().cmp(&b.variables.len()))
            });
            let Some(subset) = open.first().cloned() else { break };
            open.remove(0);
            if subset.variables.len() >= self.max_subset_size {
                continue;
            }

            let mut extensions: Vec<usize> = subset
                .variables
                .iter()
                .flat_map(|&v| {
                    task.causal_graph_successors(Variable(v))
                        .iter()
                        .chain(task.causal_graph_predecessors(Variable(v)).iter())
                })
                .map(|v| v.id())
                .filter(|v| !subset.variables.contains(v))
                .collect();
            extensions.sort_unstable();
            extensions.dedup();

            for extension in extensions {
                if budget == 0 {
                    break;
                }
                let mut variables = subset.variables.clone();
                variables.push(extension);
                variables.sort_unstable();
                if seen.contains(&variables) {
                    continue;
                }
                seen.push(variables.clone());
                budget -= 1;
                let ratio = self.evaluate(scratch, &variables);
                let candidate = EvaluatedSubset { variables, ratio };
                evaluated.push(candidate.clone());
                open.push(candidate);
            }
        }
        evaluated
    }

    /// Greedy maximum-weight set packing: subsets with the most pruning are
    /// chosen first, skipping any subset overlapping an already chosen one.
    /// Variables not covered by a chosen subset remain singleton blocks.
    fn pack(n: usize, mut evaluated: Vec<EvaluatedSubset>) -> Vec<Vec<usize>> {
        evaluated.retain(|s| s.ratio < 1.0);
        evaluated.sort_by(|a, b| {
            a.ratio
                .total_cmp(&b.ratio)
                .then_with(|| b.variables.len().cmp(&a.variables.len()))
        });

        let mut covered = vec![false; n];
        let mut blocks: Vec<Vec<usize>> = vec![];
        for subset in evaluated {
            if subset.variables.iter().all(|&v| !covered[v]) {
                for &v in &subset.variables {
                    covered[v] = true;
                }
                blocks.push(subset.variables);
            }
        }
        for v in 0..n {
            if !covered[v] {
                blocks.push(vec![v]);
            }
        }
        // bigger blocks first; level order breaks ties
        blocks.sort_by_key(|block| (std::cmp::Reverse(block.len()), block[0]));
        blocks
    }

    /// Turns the ordered variable partition into an explicit pair list:
    /// every block is merged internally in level order, then the block
    /// products are merged linearly.
    fn plan_merges(n: usize, blocks: &[Vec<usize>]) -> VecDeque<(usize, usize)> {
        let mut pairs = VecDeque::new();
        let mut next_composite = n;
        let mut block_roots: Vec<usize> = vec![];
        for block in blocks {
            let mut root = block[0];
            for &variable in &block[1..] {
                pairs.push_back((root, variable));
                root = next_composite;
                next_composite += 1;
            }
            block_roots.push(root);
        }
        let mut root = block_roots[0];
        for &other in &block_roots[1..] {
            pairs.push_back((root, other));
            root = next_composite;
            next_composite += 1;
        }
        pairs
    }
}

impl MergeStrategy for MergeMiasm {
    fn name(&self) -> &str {
        "miasm"
    }

    fn initialize(&mut self, task: &dyn PlanningTask, _fts: &FactoredTransitionSystem) {
        // the search probes a scratch copy of the atomic factored system so
        // that the real one is never touched
        let mut scratch = FactoredTransitionSystem::new(task);
        for index in scratch.live_indices() {
            scratch.prune(index, true, true, false);
        }
        let evaluated = self.search_subsets(task, &mut scratch);
        let blocks = Self::pack(task.num_variables(), evaluated);
        self.merge_order = Self::plan_merges(task.num_variables(), &blocks);
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        match self.merge_order.pop_front() {
            Some((a, b))
                if fts.is_active(a)
                    && fts.is_active(b)
                    && (allowed.is_empty()
                        || (allowed.contains(&a) && allowed.contains(&b))) =>
            {
                (a, b)
            }
            _ => {
                warn!("miasm merge order cannot be followed, merging the first two candidates");
                let candidates = candidate_indices(fts, allowed);
                (candidates[0], candidates[1])
            }
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_miasm {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// v0 gates v1 (the goal); v2 is disconnected. Merging {v0, v1} prunes
    /// the unreachable product state, so MIASM must group them.
    fn gated_task() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 1)],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![],
                    effects: vec![Effect { fact: fact(2, 1), conditions: vec![] }],
                },
            ],
            vec![0, 0, 0],
            vec![fact(1, 1)],
        )
    }

    #[test]
    fn the_precomputed_order_starts_with_the_most_pruning_subset() {
        let task = gated_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeMiasm::default();
        strategy.initialize(&task, &fts);
        let (a, b) = strategy.next_pair(&mut fts, &[]);
        assert_eq!([0, 1], { let mut p = [a, b]; p.sort_unstable(); p });
    }

    #[test]
    fn the_order_covers_every_factor() {
        let task = gated_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeMiasm::default();
        strategy.initialize(&task, &fts);
        while fts.num_active_entries() > 1 {
            let (a, b) = strategy.next_pair(&mut fts, &[]);
            fts.merge(a, b);
        }
        assert_eq!(1, fts.num_active_entries());
    }

    #[test]
    fn probing_does_not_disturb_the_real_factored_system() {
        let task = gated_task();
        let fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeMiasm::default();
        strategy.initialize(&task, &fts);
        assert_eq!(3, fts.size());
        assert_eq!(3, fts.num_active_entries());
    }
}
