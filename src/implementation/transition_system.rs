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

//! This module provides the transition system data structure: one factor of
//! the factored transition system. A factor owns a set of dense abstract
//! states, a goal flag per state, and its transitions -- not per label, but
//! per *group* of locally equivalent labels (labels inducing pointwise
//! identical transition sets share their transition list).

use std::fmt::Write;

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::{
    Effect, Labels, PlanningTask, StateEquivalenceRelation, Variable, INFINITY,
    PRUNED_STATE,
};

// ----------------------------------------------------------------------------
// --- TRANSITION -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// One abstract transition: an ordered pair of abstract state indices. The
/// label inducing it is implied by the group holding the transition.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
}
impl Transition {
    pub fn new(from: usize, to: usize) -> Self {
        Transition { from, to }
    }
    /// A transition is a self loop when it does not change the abstract state.
    pub fn is_self_loop(self) -> bool {
        self.from == self.to
    }
}

// ----------------------------------------------------------------------------
// --- LABEL GROUP ------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A maximal set of labels inducing identical transitions within one factor,
/// together with that shared transition list and the minimum cost over the
/// member labels.
///
/// A group whose labels have all been reduced away is kept as a tombstone
/// (no labels, no transitions, cost ∞) until the next merge or shrink
/// recomputes the group structure from scratch.
#[derive(Debug, Clone)]
pub struct LabelGroup {
    labels: Vec<usize>,
    cost: isize,
    transitions: Vec<Transition>,
}
impl LabelGroup {
    /// The identifiers of the labels in this group, in increasing order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
    /// The minimum cost over the labels of this group.
    pub fn cost(&self) -> isize {
        self.cost
    }
    /// The transitions shared by all labels of this group, sorted
    /// lexicographically and duplicate free.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
    /// True iff every label of this group has been reduced away.
    pub fn is_tombstone(&self) -> bool {
        self.labels.is_empty()
    }
}

// ----------------------------------------------------------------------------
// --- TRANSITION SYSTEM ------------------------------------------------------
// ----------------------------------------------------------------------------
/// One factor of the factored transition system: an abstraction of the
/// projection of the task onto its `incorporated_variables`.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    /// the task variables this factor abstracts, in increasing order
    incorporated_variables: Vec<Variable>,
    /// states are the dense indices `0..num_states`
    num_states: usize,
    /// the abstract initial state; `None` once it has been pruned away, in
    /// which case the factor (and hence the whole task) is unsolvable
    init_state: Option<usize>,
    /// one flag per state
    goal_states: Vec<bool>,
    /// the label equivalence relation, possibly containing tombstones
    groups: Vec<LabelGroup>,
    /// the group holding each label; `None` for reduced labels
    label_to_group: Vec<Option<usize>>,
}

impl TransitionSystem {
    /// Builds the atomic factors of the given task: one transition system per
    /// variable, each abstracting the projection of every operator onto that
    /// variable, together with the initial labels table (one label per
    /// operator).
    pub fn build_atomic(task: &dyn PlanningTask) -> (Labels, Vec<TransitionSystem>) {
        let num_ops = task.num_operators();
        let labels = Labels::new((0..num_ops).map(|op| task.operator_cost(op)).collect());

        let factors = (0..task.num_variables())
            .map(|v| Self::build_atomic_factor(task, Variable(v), &labels))
            .collect();
        (labels, factors)
    }

    fn build_atomic_factor(
        task: &dyn PlanningTask,
        var: Variable,
        labels: &Labels,
    ) -> TransitionSystem {
        let domain = task.domain_size(var);
        let num_ops = task.num_operators();

        let mut label_transitions: Vec<Vec<Transition>> = vec![vec![]; num_ops];
        for (op, transitions) in label_transitions.iter_mut().enumerate() {
            project_operator(task, op, var, domain, transitions);
            transitions.sort_unstable();
            transitions.dedup();
        }

        let goal_value = task.goal().iter().find(|f| f.variable == var).map(|f| f.value);
        let goal_states = (0..domain)
            .map(|value| goal_value.map_or(true, |g| g == value))
            .collect();

        let (groups, label_to_group) =
            regroup_by_transitions(labels, (0..num_ops).zip(label_transitions));

        TransitionSystem {
            incorporated_variables: vec![var],
            num_states: domain,
            init_state: Some(task.initial_state()[var.id()]),
            goal_states,
            groups,
            label_to_group,
        }
    }

    /// Computes the synchronized product of the two given factors. The
    /// product has `|ts1| · |ts2|` states with `(a, b)` encoded as
    /// `a · |ts2| + b`; a product state is initial (resp. goal) iff both its
    /// components are; and every label transitions by the cartesian product
    /// of its component transitions.
    pub fn merge(labels: &Labels, ts1: &TransitionSystem, ts2: &TransitionSystem) -> Self {
        let n2 = ts2.num_states;
        let num_states = ts1.num_states * n2;

        let init_state = match (ts1.init_state, ts2.init_state) {
            (Some(a), Some(b)) => Some(a * n2 + b),
            _ => None,
        };
        let mut goal_states = vec![false; num_states];
        for (a, goal) in goal_states.chunks_mut(n2).enumerate() {
            if ts1.goal_states[a] {
                for (b, flag) in goal.iter_mut().enumerate() {
                    *flag = ts2.goal_states[b];
                }
            }
        }

        // Labels sharing their group in both components share their product
        // transitions; bucket them by that pair of groups before computing
        // any cartesian product.
        let mut bucket_of: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut buckets: Vec<(Vec<usize>, (usize, usize))> = vec![];
        for label in labels.active_labels() {
            let g1 = ts1.label_to_group[label].expect("active label outside any group");
            let g2 = ts2.label_to_group[label].expect("active label outside any group");
            let bucket = *bucket_of.entry((g1, g2)).or_insert_with(|| {
                buckets.push((vec![], (g1, g2)));
                buckets.len() - 1
            });
            buckets[bucket].0.push(label);
        }

        let grouped = buckets.into_iter().map(|(bucket_labels, (g1, g2))| {
            let mut transitions = Vec::with_capacity(
                ts1.groups[g1].transitions.len() * ts2.groups[g2].transitions.len(),
            );
            for t1 in &ts1.groups[g1].transitions {
                for t2 in &ts2.groups[g2].transitions {
                    transitions
                        .push(Transition::new(t1.from * n2 + t2.from, t1.to * n2 + t2.to));
                }
            }
            transitions.sort_unstable();
            transitions.dedup();
            (bucket_labels, transitions)
        });
        let (groups, label_to_group) = coalesce_groups(labels, grouped);

        TransitionSystem {
            incorporated_variables: ts1
                .incorporated_variables
                .iter()
                .merge(ts2.incorporated_variables.iter())
                .copied()
                .collect(),
            num_states,
            init_state,
            goal_states,
            groups,
            label_to_group,
        }
    }

    /// Applies the given equivalence relation to this factor: states become
    /// the class indices of `relation`, transitions are rewritten through
    /// `mapping` (one entry per old state, [`PRUNED_STATE`] for states
    /// belonging to no class), and the group structure is recomputed.
    ///
    /// Returns true iff the number of states strictly decreased.
    pub fn apply_abstraction(
        &mut self,
        labels: &Labels,
        relation: &StateEquivalenceRelation,
        mapping: &[isize],
    ) -> bool {
        debug_assert_eq!(mapping.len(), self.num_states);
        let new_num_states = relation.len();

        let mut goal_states = vec![false; new_num_states];
        for (state, &goal) in self.goal_states.iter().enumerate() {
            if goal && mapping[state] != PRUNED_STATE {
                goal_states[mapping[state] as usize] = true;
            }
        }
        self.init_state = self.init_state.and_then(|init| match mapping[init] {
            PRUNED_STATE => None,
            new_init => Some(new_init as usize),
        });

        let grouped = self
            .groups
            .iter()
            .filter(|group| !group.is_tombstone())
            .map(|group| {
                let mut transitions: Vec<Transition> = group
                    .transitions
                    .iter()
                    .filter(|t| {
                        mapping[t.from] != PRUNED_STATE && mapping[t.to] != PRUNED_STATE
                    })
                    .map(|t| {
                        Transition::new(mapping[t.from] as usize, mapping[t.to] as usize)
                    })
                    .collect();
                transitions.sort_unstable();
                transitions.dedup();
                (group.labels.clone(), transitions)
            })
            .collect::<Vec<_>>();
        let (groups, label_to_group) = coalesce_groups(labels, grouped.into_iter());
        self.groups = groups;
        self.label_to_group = label_to_group;

        let shrunk = new_num_states < self.num_states;
        self.num_states = new_num_states;
        shrunk
    }

    /// Applies a label reduction produced by the label reduction strategy.
    /// Each entry of `mapping` replaces a set of old labels by one fresh
    /// label.
    ///
    /// When `same_group_guaranteed` holds (which is the case in every factor
    /// but the one the reduction was computed against), all the old labels of
    /// an entry belong to a single group: the fresh label simply replaces
    /// them there. Otherwise the old labels are removed from their groups and
    /// the fresh label forms a new singleton group whose transitions are the
    /// union of the old groups'; emptied groups remain as tombstones.
    pub fn apply_label_reduction(
        &mut self,
        labels: &Labels,
        mapping: &[(usize, Vec<usize>)],
        same_group_guaranteed: bool,
    ) {
        if self.label_to_group.len() < labels.len() {
            self.label_to_group.resize(labels.len(), None);
        }

        if same_group_guaranteed {
            for (new_label, old_labels) in mapping {
                let group_id = self.label_to_group[old_labels[0]]
                    .expect("active label outside any group");
                for &old in old_labels {
                    debug_assert_eq!(Some(group_id), self.label_to_group[old]);
                    self.label_to_group[old] = None;
                }
                let group = &mut self.groups[group_id];
                group.labels.retain(|l| !old_labels.contains(l));
                group.labels.push(*new_label);
                group.cost = group.cost.min(labels.cost(*new_label));
                self.label_to_group[*new_label] = Some(group_id);
            }
        } else {
            let mut affected: Vec<usize> = vec![];
            for (new_label, old_labels) in mapping {
                let mut transitions: Vec<Transition> = vec![];
                for group_id in old_labels
                    .iter()
                    .map(|&old| self.label_to_group[old].expect("reduced twice"))
                    .dedup()
                {
                    transitions.extend_from_slice(&self.groups[group_id].transitions);
                }
                transitions.sort_unstable();
                transitions.dedup();

                for &old in old_labels {
                    let group_id = self.label_to_group[old].take().unwrap();
                    self.groups[group_id].labels.retain(|&l| l != old);
                    affected.push(group_id);
                }

                let fresh = LabelGroup {
                    labels: vec![*new_label],
                    cost: labels.cost(*new_label),
                    transitions,
                };
                self.label_to_group[*new_label] = Some(self.groups.len());
                self.groups.push(fresh);
            }

            affected.sort_unstable();
            affected.dedup();
            for group_id in affected {
                let group = &mut self.groups[group_id];
                if group.labels.is_empty() {
                    group.cost = INFINITY;
                    group.transitions.clear();
                } else {
                    group.cost =
                        group.labels.iter().map(|&l| labels.cost(l)).min().unwrap();
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // --- ACCESSORS ----------------------------------------------------------
    // ------------------------------------------------------------------------

    /// The number of abstract states of this factor.
    pub fn num_states(&self) -> usize {
        self.num_states
    }
    /// The abstract initial state, unless it has been pruned away.
    pub fn init_state(&self) -> Option<usize> {
        self.init_state
    }
    /// Returns true iff the given state is an abstract goal state.
    pub fn is_goal_state(&self, state: usize) -> bool {
        self.goal_states[state]
    }
    /// A factor whose initial state was pruned away can never reach a goal.
    pub fn is_solvable(&self) -> bool {
        self.init_state.is_some()
    }
    /// A factor is goal relevant iff at least one of its states is not a
    /// goal state.
    pub fn is_goal_relevant(&self) -> bool {
        self.goal_states.iter().any(|&g| !g)
    }
    /// The task variables this factor abstracts, in increasing order.
    pub fn incorporated_variables(&self) -> &[Variable] {
        &self.incorporated_variables
    }
    /// Iterates over the non-tombstone label groups along with their group
    /// identifiers. Group identifiers are only stable until the next merge,
    /// shrink or label reduction.
    pub fn label_groups(&self) -> impl Iterator<Item = (usize, &LabelGroup)> {
        self.groups.iter().enumerate().filter(|(_, g)| !g.is_tombstone())
    }
    /// The group holding the given label, if that label is active.
    pub fn group_of_label(&self, label: usize) -> Option<usize> {
        self.label_to_group.get(label).copied().flatten()
    }
    /// The transitions of the group holding the given (active) label.
    pub fn transitions_of_label(&self, label: usize) -> &[Transition] {
        &self.groups[self.group_of_label(label).expect("inactive label")].transitions
    }
    /// The total number of transitions, counted once per group.
    pub fn total_transitions(&self) -> usize {
        self.groups.iter().map(|g| g.transitions.len()).sum()
    }

    /// Checks that every group keeps its transitions sorted and duplicate
    /// free; this is an invariant of the data structure and only ever used in
    /// debug assertions.
    pub fn are_transitions_sorted_unique(&self) -> bool {
        self.groups
            .iter()
            .all(|g| g.transitions.windows(2).all(|w| w[0] < w[1]))
    }

    /// A one line summary used in log output.
    pub fn statistics(&self) -> String {
        format!(
            "{} states, {} arcs, {} label groups ({} vars incorporated)",
            self.num_states,
            self.total_transitions(),
            self.groups.iter().filter(|g| !g.is_tombstone()).count(),
            self.incorporated_variables.len(),
        )
    }

    /// A full rendition of the factor (states, goals, groups, transitions)
    /// used by the debug verbosity level.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "transition system over {:?}: {} states, init {:?}",
            self.incorporated_variables.iter().map(|v| v.id()).collect::<Vec<_>>(),
            self.num_states,
            self.init_state,
        );
        let goals: Vec<usize> = (0..self.num_states).filter(|&s| self.goal_states[s]).collect();
        let _ = writeln!(out, "goal states: {goals:?}");
        for (id, group) in self.label_groups() {
            let _ = writeln!(
                out,
                "group {id} (cost {}): labels {:?}, transitions {:?}",
                group.cost,
                group.labels,
                group.transitions.iter().map(|t| (t.from, t.to)).collect::<Vec<_>>(),
            );
        }
        out
    }
}

/// Projects operator `op` onto variable `var`, pushing the induced
/// transitions. An operator without an effect on `var` behaves as a self loop
/// on the states permitted by its precondition; an effect whose conditions
/// might not hold contributes the unchanged state as well.
fn project_operator(
    task: &dyn PlanningTask,
    op: usize,
    var: Variable,
    domain: usize,
    transitions: &mut Vec<Transition>,
) {
    let pre = task
        .operator_preconditions(op)
        .iter()
        .find(|f| f.variable == var)
        .map(|f| f.value);
    let effect: Option<&Effect> =
        task.operator_effects(op).iter().find(|e| e.fact.variable == var);

    let sources: Vec<usize> = match pre {
        Some(value) => vec![value],
        None => (0..domain).collect(),
    };
    match effect {
        None => {
            for s in sources {
                transitions.push(Transition::new(s, s));
            }
        }
        Some(effect) => {
            let condition_on_var =
                effect.conditions.iter().find(|f| f.variable == var).map(|f| f.value);
            let conditions_elsewhere =
                effect.conditions.iter().any(|f| f.variable != var);
            for s in sources {
                if condition_on_var.map_or(true, |c| c == s) {
                    transitions.push(Transition::new(s, effect.fact.value));
                    if conditions_elsewhere {
                        // the effect may fail to trigger in the full state
                        transitions.push(Transition::new(s, s));
                    }
                } else {
                    transitions.push(Transition::new(s, s));
                }
            }
        }
    }
}

/// Groups the given `(label, transitions)` pairs into maximal groups of
/// identical transition sets. Used for atomic construction where every label
/// comes with its own transition list.
fn regroup_by_transitions(
    labels: &Labels,
    label_transitions: impl Iterator<Item = (usize, Vec<Transition>)>,
) -> (Vec<LabelGroup>, Vec<Option<usize>>) {
    coalesce_groups(labels, label_transitions.map(|(label, t)| (vec![label], t)))
}

/// Coalesces buckets of labels into maximal groups: buckets with pointwise
/// equal transition lists are united. Returns the resulting groups along with
/// the label-to-group index.
fn coalesce_groups(
    labels: &Labels,
    buckets: impl Iterator<Item = (Vec<usize>, Vec<Transition>)>,
) -> (Vec<LabelGroup>, Vec<Option<usize>>) {
    let mut group_of: FxHashMap<Vec<Transition>, usize> = FxHashMap::default();
    let mut groups: Vec<LabelGroup> = vec![];
    for (bucket_labels, transitions) in buckets {
        debug_assert!(transitions.windows(2).all(|w| w[0] < w[1]));
        let cost = bucket_labels.iter().map(|&l| labels.cost(l)).min().unwrap_or(INFINITY);
        match group_of.entry(transitions) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let group = &mut groups[*entry.get()];
                group.labels.extend_from_slice(&bucket_labels);
                group.cost = group.cost.min(cost);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                let transitions = entry.key().clone();
                entry.insert(groups.len());
                groups.push(LabelGroup { labels: bucket_labels, cost, transitions });
            }
        }
    }
    let mut label_to_group = vec![None; labels.len()];
    for (id, group) in groups.iter_mut().enumerate() {
        group.labels.sort_unstable();
        for &label in &group.labels {
            label_to_group[label] = Some(id);
        }
    }
    (groups, label_to_group)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_transition_system {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// Two binary variables; `op0` flips v0 from 0 to 1; `op1` sets v1 to 1
    /// when v0 is 1; the goal requires v1 = 1.
    fn chain_task() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2],
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
            ],
            vec![0, 0],
            vec![fact(1, 1)],
        )
    }

    #[test]
    fn atomic_factors_project_each_operator() {
        let task = chain_task();
        let (_, factors) = TransitionSystem::build_atomic(&task);
        assert_eq!(2, factors.len());

        let ts0 = &factors[0];
        assert_eq!(2, ts0.num_states());
        assert_eq!(Some(0), ts0.init_state());
        // the goal does not constrain v0: every state is a goal state
        assert!(!ts0.is_goal_relevant());
        // op0 moves 0 -> 1, op1 self loops on 1: distinct transition sets
        assert_eq!(vec![Transition::new(0, 1)], ts0.transitions_of_label(0));
        assert_eq!(vec![Transition::new(1, 1)], ts0.transitions_of_label(1));

        let ts1 = &factors[1];
        assert!(ts1.is_goal_relevant());
        assert!(ts1.is_goal_state(1));
        assert!(!ts1.is_goal_state(0));
        // op0 does not touch v1: self loop everywhere
        assert_eq!(
            vec![Transition::new(0, 0), Transition::new(1, 1)],
            ts1.transitions_of_label(0)
        );
        assert_eq!(
            vec![Transition::new(0, 1), Transition::new(1, 1)],
            ts1.transitions_of_label(1)
        );
    }

    #[test]
    fn labels_with_identical_transitions_share_a_group() {
        let task = ExplicitTask::new(
            vec![2],
            vec![
                ExplicitOperator {
                    cost: 3,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 5,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
            ],
            vec![0],
            vec![fact(0, 1)],
        );
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let ts = &factors[0];
        assert_eq!(1, ts.label_groups().count());
        let (_, group) = ts.label_groups().next().unwrap();
        assert_eq!(&[0, 1], group.labels());
        // the group cost is the minimum over its labels
        assert_eq!(3, group.cost());
    }

    #[test]
    fn merge_produces_the_synchronized_product() {
        let task = chain_task();
        let (labels, factors) = TransitionSystem::build_atomic(&task);
        let product = TransitionSystem::merge(&labels, &factors[0], &factors[1]);

        assert_eq!(4, product.num_states());
        assert_eq!(Some(0), product.init_state());
        // goal: v1 = 1, any v0: states (0,1) = 1 and (1,1) = 3
        assert!(product.is_goal_state(1));
        assert!(product.is_goal_state(3));
        assert!(!product.is_goal_state(0));
        assert!(!product.is_goal_state(2));
        assert_eq!(
            vec![Variable(0), Variable(1)],
            product.incorporated_variables().to_vec()
        );

        // op0: (0,b) -> (1,b); op1: (1,0) -> (1,1) and (1,1) self loop
        assert_eq!(
            vec![Transition::new(0, 2), Transition::new(1, 3)],
            product.transitions_of_label(0)
        );
        assert_eq!(
            vec![Transition::new(2, 3), Transition::new(3, 3)],
            product.transitions_of_label(1)
        );
    }

    #[test]
    fn merge_state_count_is_the_product_of_its_inputs() {
        let task = ExplicitTask::new(
            vec![3, 4],
            vec![],
            vec![0, 0],
            vec![fact(0, 2)],
        );
        let (labels, factors) = TransitionSystem::build_atomic(&task);
        let product = TransitionSystem::merge(&labels, &factors[0], &factors[1]);
        assert_eq!(12, product.num_states());
    }

    #[test]
    fn applying_the_identity_relation_is_a_noop() {
        let task = chain_task();
        let (labels, factors) = TransitionSystem::build_atomic(&task);
        let mut ts = factors[0].clone();
        let before = ts.dump();

        let relation: StateEquivalenceRelation = vec![vec![0], vec![1]];
        let shrunk = ts.apply_abstraction(&labels, &relation, &[0, 1]);
        assert!(!shrunk);
        assert_eq!(before, ts.dump());
    }

    #[test]
    fn collapsing_states_rewrites_transitions_and_recomputes_groups() {
        let task = chain_task();
        let (labels, factors) = TransitionSystem::build_atomic(&task);
        let mut ts = factors[0].clone();

        let relation: StateEquivalenceRelation = vec![vec![0, 1]];
        let shrunk = ts.apply_abstraction(&labels, &relation, &[0, 0]);
        assert!(shrunk);
        assert_eq!(1, ts.num_states());
        // both labels now self loop on the single state: one group
        assert_eq!(1, ts.label_groups().count());
        assert_eq!(vec![Transition::new(0, 0)], ts.transitions_of_label(0));
    }

    #[test]
    fn pruning_the_initial_state_makes_the_factor_unsolvable() {
        let task = chain_task();
        let (labels, factors) = TransitionSystem::build_atomic(&task);
        let mut ts = factors[0].clone();

        let relation: StateEquivalenceRelation = vec![vec![1]];
        ts.apply_abstraction(&labels, &relation, &[PRUNED_STATE, 0]);
        assert!(!ts.is_solvable());
    }

    #[test]
    fn same_group_label_reduction_substitutes_in_place() {
        let task = ExplicitTask::new(
            vec![2],
            vec![
                ExplicitOperator {
                    cost: 3,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 5,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
            ],
            vec![0],
            vec![fact(0, 1)],
        );
        let (mut labels, factors) = TransitionSystem::build_atomic(&task);
        let mut ts = factors[0].clone();

        let fresh = labels.reduce(&[0, 1]);
        ts.apply_label_reduction(&labels, &[(fresh, vec![0, 1])], true);

        assert_eq!(None, ts.group_of_label(0));
        assert_eq!(None, ts.group_of_label(1));
        let group_id = ts.group_of_label(fresh).unwrap();
        let (_, group) = ts.label_groups().find(|(id, _)| *id == group_id).unwrap();
        assert_eq!(&[fresh], group.labels());
        assert_eq!(3, group.cost());
    }

    #[test]
    fn cross_group_label_reduction_unions_transitions_and_leaves_tombstones() {
        // two operators with different local behavior on the factor
        let task = chain_task();
        let (mut labels, factors) = TransitionSystem::build_atomic(&task);
        let mut ts = factors[0].clone();
        assert_eq!(2, ts.label_groups().count());

        let fresh = labels.reduce(&[0, 1]);
        ts.apply_label_reduction(&labels, &[(fresh, vec![0, 1])], false);

        // the fresh singleton group holds the union of both transition sets
        assert_eq!(
            vec![Transition::new(0, 1), Transition::new(1, 1)],
            ts.transitions_of_label(fresh)
        );
        // both old groups are now tombstones, skipped by iteration
        assert_eq!(1, ts.label_groups().count());
        assert!(ts.are_transitions_sorted_unique());
    }
}
