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

//! This module provides the per-factor distance information: the cost of a
//! cheapest path from the initial state to every abstract state (init
//! distances) and from every abstract state to a closest goal state (goal
//! distances). Distances are computed with uniform-cost search where the
//! label group costs are the edge weights.

use std::cmp::Ordering;

use binary_heap_plus::BinaryHeap;
use compare::Compare;

use crate::{StateEquivalenceRelation, Transition, TransitionSystem, INFINITY};

/// Orders `(distance, state)` pairs so that the *smallest* distance pops
/// first off a [`BinaryHeap`] (which is a max heap by default).
#[derive(Debug, Clone, Copy, Default)]
struct MinDist;
impl Compare<(isize, usize)> for MinDist {
    fn compare(&self, l: &(isize, usize), r: &(isize, usize)) -> Ordering {
        r.0.cmp(&l.0).then_with(|| r.1.cmp(&l.1))
    }
}

/// The distance information of one factor. After any mutation of the factor,
/// the distances are stale and must be recomputed before their next use; the
/// factored transition system enforces that discipline.
#[derive(Debug, Clone)]
pub struct Distances {
    init_distances: Vec<isize>,
    goal_distances: Vec<isize>,
    computed: bool,
}

impl Distances {
    /// Creates a stale (not yet computed) distance object for a factor of the
    /// given size.
    pub fn new_stale(num_states: usize) -> Self {
        Distances {
            init_distances: vec![INFINITY; num_states],
            goal_distances: vec![INFINITY; num_states],
            computed: false,
        }
    }

    /// (Re)computes both distance vectors from the current transitions of the
    /// given factor.
    pub fn compute(&mut self, ts: &TransitionSystem) {
        let n = ts.num_states();
        self.init_distances = vec![INFINITY; n];
        self.goal_distances = vec![INFINITY; n];

        let mut forward: Vec<Vec<(usize, isize)>> = vec![vec![]; n];
        let mut backward: Vec<Vec<(usize, isize)>> = vec![vec![]; n];
        for (_, group) in ts.label_groups() {
            let cost = group.cost();
            for &Transition { from, to } in group.transitions() {
                forward[from].push((to, cost));
                backward[to].push((from, cost));
            }
        }

        if let Some(init) = ts.init_state() {
            dijkstra(&forward, [init].into_iter(), &mut self.init_distances);
        }
        let goals = (0..n).filter(|&s| ts.is_goal_state(s));
        dijkstra(&backward, goals, &mut self.goal_distances);

        self.computed = true;
    }

    /// Whether the distances are in sync with the factor they belong to.
    pub fn are_computed(&self) -> bool {
        self.computed
    }
    /// Marks the distances stale; any read before the next `compute` is a
    /// bug.
    pub fn invalidate(&mut self) {
        self.computed = false;
    }

    /// The cost of a cheapest path from the initial state to `state`
    /// ([`INFINITY`] when unreachable).
    pub fn init_distance(&self, state: usize) -> isize {
        debug_assert!(self.computed);
        self.init_distances[state]
    }
    /// The cost of a cheapest path from `state` to a goal state
    /// ([`INFINITY`] when no goal can be reached: the state is irrelevant).
    pub fn goal_distance(&self, state: usize) -> isize {
        debug_assert!(self.computed);
        self.goal_distances[state]
    }
    /// All goal distances, indexed by state.
    pub fn goal_distances(&self) -> &[isize] {
        debug_assert!(self.computed);
        &self.goal_distances
    }

    /// Projects the distances through an equivalence relation: the distance
    /// of a class is the minimum over its members. When some class mixes
    /// distinct distances the result is only a lower bound and the object is
    /// marked stale, forcing a recomputation before the next read.
    pub fn apply_abstraction(&mut self, relation: &StateEquivalenceRelation) {
        let mut homogeneous = true;
        let mut init = Vec::with_capacity(relation.len());
        let mut goal = Vec::with_capacity(relation.len());
        for class in relation {
            let g = class.iter().map(|&s| self.init_distances[s]).min().unwrap();
            let h = class.iter().map(|&s| self.goal_distances[s]).min().unwrap();
            homogeneous &= class
                .iter()
                .all(|&s| self.init_distances[s] == g && self.goal_distances[s] == h);
            init.push(g);
            goal.push(h);
        }
        self.init_distances = init;
        self.goal_distances = goal;
        self.computed = homogeneous;
    }

    /// Computes the set of states to prune: a state is dropped when it is
    /// unreachable (`init = ∞`, if `prune_unreachable`) or irrelevant
    /// (`goal = ∞`, if `prune_irrelevant`). Returns one flag per state, true
    /// meaning "prune me".
    pub fn prunable_states(
        &self,
        prune_unreachable: bool,
        prune_irrelevant: bool,
    ) -> Vec<bool> {
        debug_assert!(self.computed);
        self.init_distances
            .iter()
            .zip(self.goal_distances.iter())
            .map(|(&g, &h)| {
                (prune_unreachable && g == INFINITY) || (prune_irrelevant && h == INFINITY)
            })
            .collect()
    }

    /// A one line summary used in log output.
    pub fn statistics(&self) -> String {
        let reachable =
            self.init_distances.iter().filter(|&&d| d != INFINITY).count();
        let relevant = self.goal_distances.iter().filter(|&&d| d != INFINITY).count();
        format!(
            "{reachable}/{} states reachable, {relevant}/{} relevant",
            self.init_distances.len(),
            self.goal_distances.len(),
        )
    }
}

/// Uniform-cost search from the given sources along the given adjacency
/// lists. `distances` must be preset to [`INFINITY`]; it is updated in place.
fn dijkstra(
    adjacency: &[Vec<(usize, isize)>],
    sources: impl Iterator<Item = usize>,
    distances: &mut [isize],
) {
    let mut heap = BinaryHeap::from_vec_cmp(vec![], MinDist);
    for source in sources {
        distances[source] = 0;
        heap.push((0, source));
    }
    while let Some((dist, state)) = heap.pop() {
        if dist > distances[state] {
            continue;
        }
        for &(succ, cost) in &adjacency[state] {
            let new_dist = dist.saturating_add(cost);
            if new_dist < distances[succ] {
                distances[succ] = new_dist;
                heap.push((new_dist, succ));
            }
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_distances {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// A single variable with a 3 valued domain: 0 -> 1 costs 4, 1 -> 2
    /// costs 2, and the goal is value 2.
    fn line_task() -> ExplicitTask {
        ExplicitTask::new(
            vec![3],
            vec![
                ExplicitOperator {
                    cost: 4,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(0, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 2,
                    preconditions: vec![fact(0, 1)],
                    effects: vec![Effect { fact: fact(0, 2), conditions: vec![] }],
                },
            ],
            vec![0],
            vec![fact(0, 2)],
        )
    }

    fn computed(ts: &TransitionSystem) -> Distances {
        let mut distances = Distances::new_stale(ts.num_states());
        distances.compute(ts);
        distances
    }

    #[test]
    fn distances_follow_cheapest_paths() {
        let task = line_task();
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let distances = computed(&factors[0]);

        assert_eq!(0, distances.init_distance(0));
        assert_eq!(4, distances.init_distance(1));
        assert_eq!(6, distances.init_distance(2));
        assert_eq!(6, distances.goal_distance(0));
        assert_eq!(2, distances.goal_distance(1));
        assert_eq!(0, distances.goal_distance(2));
    }

    #[test]
    fn unreachable_and_irrelevant_states_get_infinity() {
        let task = ExplicitTask::new(
            vec![3],
            vec![ExplicitOperator {
                cost: 1,
                preconditions: vec![fact(0, 0)],
                effects: vec![Effect { fact: fact(0, 2), conditions: vec![] }],
            }],
            vec![0],
            vec![fact(0, 2)],
        );
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let distances = computed(&factors[0]);

        // value 1 is neither reachable nor can it reach the goal
        assert_eq!(INFINITY, distances.init_distance(1));
        assert_eq!(INFINITY, distances.goal_distance(1));
        assert_eq!(vec![false, true, false], distances.prunable_states(true, true));
        assert_eq!(vec![false, true, false], distances.prunable_states(true, false));
    }

    #[test]
    fn abstraction_of_homogeneous_classes_keeps_distances_computed() {
        let task = line_task();
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let mut distances = computed(&factors[0]);

        distances.apply_abstraction(&vec![vec![0], vec![1], vec![2]]);
        assert!(distances.are_computed());
        assert_eq!(4, distances.init_distance(1));
    }

    #[test]
    fn abstraction_of_mixed_classes_goes_stale() {
        let task = line_task();
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let mut distances = computed(&factors[0]);

        distances.apply_abstraction(&vec![vec![0, 1], vec![2]]);
        assert!(!distances.are_computed());
    }

    #[test]
    fn goal_distances_expose_the_whole_vector() {
        let task = line_task();
        let (_, factors) = TransitionSystem::build_atomic(&task);
        let distances = computed(&factors[0]);
        assert_eq!(&[6, 2, 0], distances.goal_distances());
    }
}
