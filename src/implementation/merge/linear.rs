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

//! This module provides linear merging: the classic strategy that grows a
//! single composite factor by absorbing the atomic factors one at a time,
//! following a precomputed variable order.

use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{
    FactoredTransitionSystem, MergeStrategy, PlanningTask, Variable,
};

use super::candidate_indices;

/// The variable orders a linear merge strategy can follow.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum VariableOrder {
    /// variables in their task order
    #[default]
    Level,
    /// variables in reverse task order
    ReverseLevel,
    /// goal variables first, then along the causal graph towards their
    /// ancestors, levels breaking ties
    CausalGraphGoalLevel,
    /// a seeded random permutation
    Random(u64),
}

impl VariableOrder {
    /// Materializes the order for the given task.
    pub fn compute(self, task: &dyn PlanningTask) -> Vec<Variable> {
        let n = task.num_variables();
        match self {
            VariableOrder::Level => (0..n).map(Variable).collect(),
            VariableOrder::ReverseLevel => (0..n).rev().map(Variable).collect(),
            VariableOrder::Random(seed) => {
                let mut order: Vec<Variable> = (0..n).map(Variable).collect();
                order.shuffle(&mut StdRng::seed_from_u64(seed));
                order
            }
            VariableOrder::CausalGraphGoalLevel => {
                let mut picked = vec![false; n];
                let mut order: Vec<Variable> = vec![];
                let mut frontier: Vec<Variable> =
                    task.goal().iter().map(|f| f.variable).collect();
                frontier.sort_unstable();
                frontier.dedup();
                while order.len() < n {
                    let next = frontier
                        .iter()
                        .copied()
                        .find(|v| !picked[v.id()])
                        .unwrap_or_else(|| {
                            // no causally connected candidate left: fall back
                            // to the first unpicked variable
                            (0..n).map(Variable).find(|v| !picked[v.id()]).unwrap()
                        });
                    picked[next.id()] = true;
                    order.push(next);
                    let mut extension: Vec<Variable> = task
                        .causal_graph_predecessors(next)
                        .iter()
                        .copied()
                        .filter(|v| !picked[v.id()])
                        .collect();
                    frontier.retain(|v| !picked[v.id()]);
                    extension.retain(|v| !frontier.contains(v));
                    frontier.extend(extension);
                    frontier.sort_unstable();
                }
                order
            }
        }
    }
}

/// The linear merge strategy: the first pair is made of the atomic factors of
/// the first two variables in order; every subsequent pair combines the most
/// recent composite with the atomic factor of the next variable.
#[derive(Debug, Clone, Default)]
pub struct MergeLinear {
    pub variable_order: VariableOrder,
    /// the variables still waiting to be absorbed, most imminent last
    remaining: Vec<Variable>,
    started: bool,
}

impl MergeLinear {
    pub fn new(variable_order: VariableOrder) -> Self {
        MergeLinear { variable_order, remaining: vec![], started: false }
    }
}

impl MergeStrategy for MergeLinear {
    fn name(&self) -> &str {
        "linear"
    }

    fn initialize(&mut self, task: &dyn PlanningTask, _fts: &FactoredTransitionSystem) {
        self.remaining = self.variable_order.compute(task);
        self.remaining.reverse();
        self.started = false;
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        let pair = if self.started {
            let composite = fts.size() - 1;
            self.remaining.pop().map(|next| (composite, next.id()))
        } else {
            match (self.remaining.pop(), self.remaining.pop()) {
                (Some(a), Some(b)) => Some((a.id(), b.id())),
                _ => None,
            }
        };
        self.started = true;

        match pair {
            Some((a, b)) if fts.is_active(a) && fts.is_active(b) && in_allowed(allowed, a, b) => {
                (a, b)
            }
            _ => {
                // the precomputed order cannot be followed (typically because
                // the main loop excluded a factor): fall back to the first
                // two candidates
                warn!("linear merge order cannot be followed, merging the first two candidates");
                let candidates = candidate_indices(fts, allowed);
                (candidates[0], candidates[1])
            }
        }
    }
}

fn in_allowed(allowed: &[usize], a: usize, b: usize) -> bool {
    allowed.is_empty() || (allowed.contains(&a) && allowed.contains(&b))
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_linear {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    fn three_var_task() -> ExplicitTask {
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
    fn level_order_merges_variables_in_task_order() {
        let task = three_var_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeLinear::new(VariableOrder::Level);
        strategy.initialize(&task, &fts);

        assert_eq!((0, 1), strategy.next_pair(&mut fts, &[]));
        let merged = fts.merge(0, 1);
        assert_eq!((merged, 2), strategy.next_pair(&mut fts, &[]));
    }

    #[test]
    fn reverse_level_starts_from_the_last_variable() {
        let task = three_var_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeLinear::new(VariableOrder::ReverseLevel);
        strategy.initialize(&task, &fts);
        assert_eq!((2, 1), strategy.next_pair(&mut fts, &[]));
    }

    #[test]
    fn causal_goal_order_starts_from_a_goal_variable() {
        let task = three_var_task();
        let order = VariableOrder::CausalGraphGoalLevel.compute(&task);
        assert_eq!(Variable(2), order[0]);
        // v1 is the causal predecessor of the goal variable
        assert_eq!(Variable(1), order[1]);
        assert_eq!(Variable(0), order[2]);
    }

    #[test]
    fn random_orders_are_reproducible_permutations() {
        let task = three_var_task();
        let a = VariableOrder::Random(3).compute(&task);
        let b = VariableOrder::Random(3).compute(&task);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(vec![Variable(0), Variable(1), Variable(2)], sorted);
    }

    #[test]
    fn a_restriction_forces_the_fallback_pair() {
        let task = three_var_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut strategy = MergeLinear::new(VariableOrder::Level);
        strategy.initialize(&task, &fts);
        // factor 0 is excluded: the precomputed (0, 1) pair is not available
        let pair = strategy.next_pair(&mut fts, &[1, 2]);
        assert_eq!((1, 2), pair);
    }
}
