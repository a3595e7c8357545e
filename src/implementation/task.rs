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

//! This module provides `ExplicitTask`: a straightforward in-memory
//! implementation of the `PlanningTask` trait. It is the type a front end
//! will typically instantiate after grounding its input, and the one all of
//! our tests are written against. The causal graph is derived from the
//! operators at construction time; mutex information is optional and may be
//! supplied by the front end.

use fxhash::FxHashSet;

use crate::{Effect, Fact, PlanningTask, Variable};

/// One ground operator of an [`ExplicitTask`].
#[derive(Debug, Clone)]
pub struct ExplicitOperator {
    /// the non-negative cost of applying this operator
    pub cost: isize,
    /// the facts that must hold for the operator to be applicable (at most
    /// one per variable)
    pub preconditions: Vec<Fact>,
    /// the effects of the operator (at most one per variable)
    pub effects: Vec<Effect>,
}

/// An in-memory planning task. See the module documentation.
#[derive(Debug, Clone)]
pub struct ExplicitTask {
    domain_sizes: Vec<usize>,
    operators: Vec<ExplicitOperator>,
    initial_state: Vec<usize>,
    goal: Vec<Fact>,
    /// causal graph, derived from the operators
    successors: Vec<Vec<Variable>>,
    predecessors: Vec<Vec<Variable>>,
    /// unordered mutex fact pairs, as supplied by the front end
    mutexes: FxHashSet<(Fact, Fact)>,
}

impl ExplicitTask {
    /// Creates a task from its raw ingredients and derives its causal graph:
    /// there is an arc `u -> v` whenever some operator reads `u` (through a
    /// precondition or an effect condition) or writes `u`, and writes `v`.
    ///
    /// # Panics
    /// When the ingredients are inconsistent (value out of domain, incomplete
    /// initial state, negative cost). Such a task denotes a front-end bug.
    pub fn new(
        domain_sizes: Vec<usize>,
        operators: Vec<ExplicitOperator>,
        initial_state: Vec<usize>,
        goal: Vec<Fact>,
    ) -> Self {
        let num_variables = domain_sizes.len();
        assert_eq!(num_variables, initial_state.len(), "incomplete initial state");
        let in_domain = |fact: &Fact| fact.value < domain_sizes[fact.variable.id()];
        assert!(initial_state.iter().enumerate().all(|(v, &x)| x < domain_sizes[v]));
        assert!(goal.iter().all(in_domain));
        for op in &operators {
            assert!(op.cost >= 0, "negative operator cost");
            assert!(op.preconditions.iter().all(in_domain));
            assert!(op.effects.iter().all(|e| in_domain(&e.fact)));
            assert!(op.effects.iter().flat_map(|e| e.conditions.iter()).all(in_domain));
        }

        let mut arcs: FxHashSet<(Variable, Variable)> = FxHashSet::default();
        for op in &operators {
            let mut reads: Vec<Variable> =
                op.preconditions.iter().map(|f| f.variable).collect();
            reads.extend(
                op.effects.iter().flat_map(|e| e.conditions.iter()).map(|f| f.variable),
            );
            let writes: Vec<Variable> = op.effects.iter().map(|e| e.fact.variable).collect();
            for &u in reads.iter().chain(writes.iter()) {
                for &v in &writes {
                    if u != v {
                        arcs.insert((u, v));
                    }
                }
            }
        }
        let mut successors = vec![vec![]; num_variables];
        let mut predecessors = vec![vec![]; num_variables];
        for (u, v) in arcs {
            successors[u.id()].push(v);
            predecessors[v.id()].push(u);
        }
        for list in successors.iter_mut().chain(predecessors.iter_mut()) {
            list.sort_unstable();
        }

        ExplicitTask {
            domain_sizes,
            operators,
            initial_state,
            goal,
            successors,
            predecessors,
            mutexes: FxHashSet::default(),
        }
    }

    /// Declares the given fact pairs mutually exclusive (in both directions).
    pub fn with_mutexes(mut self, mutexes: impl IntoIterator<Item = (Fact, Fact)>) -> Self {
        for (a, b) in mutexes {
            self.mutexes.insert((a, b));
            self.mutexes.insert((b, a));
        }
        self
    }
}

impl PlanningTask for ExplicitTask {
    fn num_variables(&self) -> usize {
        self.domain_sizes.len()
    }
    fn domain_size(&self, var: Variable) -> usize {
        self.domain_sizes[var.id()]
    }
    fn num_operators(&self) -> usize {
        self.operators.len()
    }
    fn operator_cost(&self, op: usize) -> isize {
        self.operators[op].cost
    }
    fn operator_preconditions(&self, op: usize) -> &[Fact] {
        &self.operators[op].preconditions
    }
    fn operator_effects(&self, op: usize) -> &[Effect] {
        &self.operators[op].effects
    }
    fn initial_state(&self) -> &[usize] {
        &self.initial_state
    }
    fn goal(&self) -> &[Fact] {
        &self.goal
    }
    fn causal_graph_successors(&self, var: Variable) -> &[Variable] {
        &self.successors[var.id()]
    }
    fn causal_graph_predecessors(&self, var: Variable) -> &[Variable] {
        &self.predecessors[var.id()]
    }
    fn are_facts_mutex(&self, a: Fact, b: Fact) -> bool {
        self.mutexes.contains(&(a, b))
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_explicit_task {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    #[test]
    fn the_causal_graph_links_readers_to_writers() {
        let task = ExplicitTask::new(
            vec![2, 2, 2],
            vec![ExplicitOperator {
                cost: 1,
                preconditions: vec![fact(0, 1)],
                effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
            }],
            vec![0, 0, 0],
            vec![fact(1, 1)],
        );
        assert_eq!(&[Variable(1)], task.causal_graph_successors(Variable(0)));
        assert_eq!(&[Variable(0)], task.causal_graph_predecessors(Variable(1)));
        assert!(task.causal_graph_successors(Variable(2)).is_empty());
    }

    #[test]
    fn effect_conditions_count_as_reads() {
        let task = ExplicitTask::new(
            vec![2, 2],
            vec![ExplicitOperator {
                cost: 0,
                preconditions: vec![],
                effects: vec![Effect {
                    fact: fact(1, 1),
                    conditions: vec![fact(0, 1)],
                }],
            }],
            vec![0, 0],
            vec![fact(1, 1)],
        );
        assert_eq!(&[Variable(1)], task.causal_graph_successors(Variable(0)));
    }

    #[test]
    fn co_occurring_effects_link_both_ways() {
        let task = ExplicitTask::new(
            vec![2, 2],
            vec![ExplicitOperator {
                cost: 1,
                preconditions: vec![],
                effects: vec![
                    Effect { fact: fact(0, 1), conditions: vec![] },
                    Effect { fact: fact(1, 1), conditions: vec![] },
                ],
            }],
            vec![0, 0],
            vec![fact(0, 1), fact(1, 1)],
        );
        assert_eq!(&[Variable(1)], task.causal_graph_successors(Variable(0)));
        assert_eq!(&[Variable(0)], task.causal_graph_successors(Variable(1)));
    }

    #[test]
    fn mutexes_are_symmetric() {
        let task = ExplicitTask::new(vec![2, 2], vec![], vec![0, 0], vec![])
            .with_mutexes([(fact(0, 1), fact(1, 1))]);
        assert!(task.are_facts_mutex(fact(0, 1), fact(1, 1)));
        assert!(task.are_facts_mutex(fact(1, 1), fact(0, 1)));
        assert!(!task.are_facts_mutex(fact(0, 0), fact(1, 1)));
    }

    #[test]
    #[should_panic(expected = "incomplete initial state")]
    fn an_incomplete_initial_state_is_rejected() {
        ExplicitTask::new(vec![2, 2], vec![], vec![0], vec![]);
    }
}
