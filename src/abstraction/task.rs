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

//! This module defines the read-only view over the planning task which the
//! whole library consumes. Producing such a task (parsing PDDL or SAS files,
//! grounding, mutex inference, ...) is the job of an external front end; the
//! core only ever reads it.

use crate::{Effect, Fact, Variable};

/// This trait defines the "contract" of what defines a factored planning task
/// amenable to merge-and-shrink abstraction: finitely many finite-domain
/// variables, operators made of precondition/effect facts with a non-negative
/// cost, one full initial state and a conjunctive goal.
///
/// The task object is expected to be immutable and to outlive the whole
/// heuristic construction: every strategy and the factored transition system
/// borrow it for the entire computation.
pub trait PlanningTask {
    /// Any task bears on a number of variables $v_0, v_1, ... , v_{n-1}$.
    /// This method returns the value of the number $n$.
    fn num_variables(&self) -> usize;
    /// This method returns the size of the (finite) domain of the given
    /// variable. Values of `var` range over `0..domain_size(var)`.
    fn domain_size(&self, var: Variable) -> usize;
    /// A human readable name for the given fact. The default implementation
    /// simply renders `var <id> = <value>`; front ends that know the original
    /// predicate names will want to override it.
    fn fact_name(&self, fact: Fact) -> String {
        format!("var {} = {}", fact.variable.id(), fact.value)
    }

    /// This method returns the number of operators (ground actions) in the
    /// task. Operators are identified by their position `0..num_operators()`.
    fn num_operators(&self) -> usize;
    /// The non-negative cost of applying the given operator.
    fn operator_cost(&self, op: usize) -> isize;
    /// The conjunction of facts that must hold for `op` to be applicable.
    fn operator_preconditions(&self, op: usize) -> &[Fact];
    /// The effects of the given operator. An operator has at most one effect
    /// per variable; each effect may carry its own conditions.
    fn operator_effects(&self, op: usize) -> &[Effect];

    /// The initial state, as a full assignment: one value per variable.
    fn initial_state(&self) -> &[usize];
    /// The goal, as a conjunction of facts (at most one per variable).
    fn goal(&self) -> &[Fact];

    /// The successors of `var` in the causal graph of the task; that is, the
    /// variables whose value can be affected by an operator reading `var`.
    fn causal_graph_successors(&self, var: Variable) -> &[Variable];
    /// The predecessors of `var` in the causal graph of the task.
    fn causal_graph_predecessors(&self, var: Variable) -> &[Variable];

    /// Returns true iff the two given facts (on distinct variables) are known
    /// to be mutually exclusive: no reachable state satisfies both. A sound
    /// default is to declare nothing mutex; the information only ever guides
    /// merge scoring.
    fn are_facts_mutex(&self, _a: Fact, _b: Fact) -> bool {
        false
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_task {
    use crate::{Fact, PlanningTask, Variable};

    struct MinimalTask;
    impl PlanningTask for MinimalTask {
        fn num_variables(&self) -> usize {
            1
        }
        fn domain_size(&self, _: Variable) -> usize {
            2
        }
        fn num_operators(&self) -> usize {
            0
        }
        fn operator_cost(&self, _: usize) -> isize {
            unreachable!()
        }
        fn operator_preconditions(&self, _: usize) -> &[Fact] {
            unreachable!()
        }
        fn operator_effects(&self, _: usize) -> &[crate::Effect] {
            unreachable!()
        }
        fn initial_state(&self) -> &[usize] {
            &[0]
        }
        fn goal(&self) -> &[Fact] {
            &[]
        }
        fn causal_graph_successors(&self, _: Variable) -> &[Variable] {
            &[]
        }
        fn causal_graph_predecessors(&self, _: Variable) -> &[Variable] {
            &[]
        }
    }

    #[test]
    fn by_default_no_facts_are_mutex() {
        let task = MinimalTask;
        let a = Fact { variable: Variable(0), value: 0 };
        let b = Fact { variable: Variable(0), value: 1 };
        assert!(!task.are_facts_mutex(a, b));
    }

    #[test]
    fn by_default_fact_names_render_the_assignment() {
        let task = MinimalTask;
        let fact = Fact { variable: Variable(0), value: 1 };
        assert_eq!("var 0 = 1", task.fact_name(fact));
    }
}
