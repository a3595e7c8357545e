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

//! This module provides the factored transition system: the exclusive owner
//! of the labels table and of three parallel vectors of optional entries
//! (transition system, heuristic representation, distances), indexed by
//! *factor index*. Factor indices are never reused: merging two factors
//! empties their slots and appends the product at a fresh index at the end.

use crate::{
    Distances, Labels, PlanningTask, Representation, StateEquivalenceRelation,
    TransitionSystem, INFINITY, PRUNED_STATE,
};

/// The factored transition system. See the module documentation; all
/// mutations of any factor go through this type so that the transition
/// systems, representations and distances always stay in lockstep.
pub struct FactoredTransitionSystem {
    labels: Labels,
    transition_systems: Vec<Option<TransitionSystem>>,
    representations: Vec<Option<Representation>>,
    distances: Vec<Option<Distances>>,
    /// the number of live (non-empty) slots
    num_active_entries: usize,
    /// the first factor that was found unsolvable, if any
    unsolvable_index: Option<usize>,
    /// while probing, the length the vectors had before the first transient
    /// copy was made; everything at or beyond this index is discarded by
    /// `release_copies`
    transient_baseline: Option<usize>,
}

impl FactoredTransitionSystem {
    /// Builds the atomic factored transition system of the given task: one
    /// factor per variable, one label per operator, all distances computed.
    /// No pruning happens here; the main loop prunes right after
    /// construction, according to its own flags.
    pub fn new(task: &dyn PlanningTask) -> Self {
        let (labels, factors) = TransitionSystem::build_atomic(task);
        let representations = factors
            .iter()
            .map(|ts| {
                let var = ts.incorporated_variables()[0];
                Some(Representation::new_leaf(var, ts.num_states()))
            })
            .collect();
        let distances = factors
            .iter()
            .map(|ts| {
                let mut distances = Distances::new_stale(ts.num_states());
                distances.compute(ts);
                Some(distances)
            })
            .collect();
        let num_active_entries = factors.len();
        FactoredTransitionSystem {
            labels,
            transition_systems: factors.into_iter().map(Some).collect(),
            representations,
            distances,
            num_active_entries,
            unsolvable_index: None,
            transient_baseline: None,
        }
    }

    // ------------------------------------------------------------------------
    // --- MUTATIONS ----------------------------------------------------------
    // ------------------------------------------------------------------------

    /// Merges factors `index1` and `index2`: their synchronized product is
    /// appended at index `size()`, its distances are computed, and the two
    /// argument slots become empty. Returns the index of the product.
    ///
    /// While transient copies exist (see [`Self::copy`]), the sources are
    /// left in place instead of being emptied and no representation is
    /// maintained for the product: the whole merge is a probe that
    /// `release_copies` will undo.
    pub fn merge(&mut self, index1: usize, index2: usize) -> usize {
        assert!(index1 != index2, "merge strategy returned twice the same index");
        assert!(self.is_active(index1) && self.is_active(index2));
        let transient = self.transient_baseline.is_some();

        let merged = TransitionSystem::merge(
            &self.labels,
            self.transition_systems[index1].as_ref().unwrap(),
            self.transition_systems[index2].as_ref().unwrap(),
        );
        let mut merged_distances = Distances::new_stale(merged.num_states());
        merged_distances.compute(&merged);

        if transient {
            self.representations.push(None);
        } else {
            let left_size = self.transition_systems[index1].as_ref().unwrap().num_states();
            let right_size =
                self.transition_systems[index2].as_ref().unwrap().num_states();
            let left = self.representations[index1].take().unwrap();
            let right = self.representations[index2].take().unwrap();
            self.representations.push(Some(Representation::new_merge(
                left, right, left_size, right_size,
            )));
            self.transition_systems[index1] = None;
            self.transition_systems[index2] = None;
            self.distances[index1] = None;
            self.distances[index2] = None;
        }
        self.transition_systems.push(Some(merged));
        self.distances.push(Some(merged_distances));
        self.num_active_entries -= 1;

        let new_index = self.transition_systems.len() - 1;
        if !transient && !self.is_factor_solvable(new_index) {
            self.unsolvable_index.get_or_insert(new_index);
        }
        debug_assert!(self.is_component_valid(new_index));
        new_index
    }

    /// Shrinks factor `index` under the given equivalence relation. The
    /// transition system, its distances and its representation are updated in
    /// lockstep; distances are recomputed when the relation mixed states of
    /// distinct distances. Returns true iff the state count strictly
    /// decreased.
    pub fn apply_abstraction(
        &mut self,
        index: usize,
        relation: &StateEquivalenceRelation,
    ) -> bool {
        assert!(self.is_active(index));
        let num_states = self.transition_systems[index].as_ref().unwrap().num_states();

        let mut mapping = vec![PRUNED_STATE; num_states];
        for (class_id, class) in relation.iter().enumerate() {
            for &state in class {
                debug_assert_eq!(PRUNED_STATE, mapping[state], "overlapping classes");
                mapping[state] = class_id as isize;
            }
        }
        if mapping.iter().enumerate().all(|(s, &m)| m == s as isize) {
            // identity: a no-op by definition
            return false;
        }

        let ts = self.transition_systems[index].as_mut().unwrap();
        let shrunk = ts.apply_abstraction(&self.labels, relation, &mapping);
        let distances = self.distances[index].as_mut().unwrap();
        distances.apply_abstraction(relation);
        if !distances.are_computed() {
            distances.compute(self.transition_systems[index].as_ref().unwrap());
        }
        if let Some(representation) = self.representations[index].as_mut() {
            representation.apply_abstraction(&mapping);
        }
        if self.transient_baseline.is_none() && !self.is_factor_solvable(index) {
            self.unsolvable_index.get_or_insert(index);
        }
        debug_assert!(self.is_component_valid(index));
        shrunk
    }

    /// Applies a label reduction plan: each entry `(new, old...)` replaces
    /// the old labels by one fresh label in the shared table, and the change
    /// is broadcast to every live factor. `exempt_index` is the factor the
    /// plan was computed against (the one about to be merged or shrunk): only
    /// there may the old labels of one entry span several groups.
    pub fn apply_label_reduction(
        &mut self,
        mapping: &[(usize, Vec<usize>)],
        exempt_index: usize,
    ) {
        for (new_label, old_labels) in mapping {
            debug_assert_eq!(*new_label, self.labels.len());
            let fresh = self.labels.reduce(old_labels);
            debug_assert_eq!(fresh, *new_label);
        }
        for index in 0..self.transition_systems.len() {
            if let Some(ts) = self.transition_systems[index].as_mut() {
                ts.apply_label_reduction(&self.labels, mapping, index != exempt_index);
            }
        }
    }

    /// Prunes the unreachable and/or irrelevant states of factor `index`.
    /// With `as_abstraction`, the doomed states are not dropped but collapsed
    /// onto (up to) two sink states, one for the unreachable and one for the
    /// irrelevant ones. Returns `(pruned_anything, pruned_unreachable)`.
    pub fn prune(
        &mut self,
        index: usize,
        prune_unreachable: bool,
        prune_irrelevant: bool,
        as_abstraction: bool,
    ) -> (bool, bool) {
        assert!(self.is_active(index));
        let distances = self.distances[index].as_ref().unwrap();
        let doomed = distances.prunable_states(prune_unreachable, prune_irrelevant);
        if doomed.iter().all(|&d| !d) {
            return (false, false);
        }
        let unreachable: Vec<usize> = (0..doomed.len())
            .filter(|&s| prune_unreachable && distances.init_distance(s) == INFINITY)
            .collect();
        let pruned_unreachable = !unreachable.is_empty();

        let mut relation: StateEquivalenceRelation = (0..doomed.len())
            .filter(|&s| !doomed[s])
            .map(|s| vec![s])
            .collect();
        if as_abstraction {
            let irrelevant: Vec<usize> = (0..doomed.len())
                .filter(|&s| {
                    doomed[s] && !(prune_unreachable && distances.init_distance(s) == INFINITY)
                })
                .collect();
            if !unreachable.is_empty() {
                relation.push(unreachable);
            }
            if !irrelevant.is_empty() {
                relation.push(irrelevant);
            }
        }
        self.apply_abstraction(index, &relation);
        (true, pruned_unreachable)
    }

    /// Marks the given factor unsolvable; used by the main loop when it
    /// detects an initial state with infinite goal distance while pruning is
    /// disabled.
    pub(crate) fn mark_unsolvable(&mut self, index: usize) {
        self.unsolvable_index.get_or_insert(index);
    }

    // ------------------------------------------------------------------------
    // --- TRANSIENT COPIES ---------------------------------------------------
    // ------------------------------------------------------------------------

    /// Clones factor `index` (transition system and distances, but no
    /// representation) into a fresh transient slot and returns its index.
    /// Scoring functions use such copies to probe a hypothetical merge
    /// without committing it; every copy and probe merge must be discarded
    /// through [`Self::release_copies`] before the strategy returns.
    pub fn copy(&mut self, index: usize) -> usize {
        assert!(self.is_active(index));
        self.transient_baseline.get_or_insert(self.transition_systems.len());
        self.transition_systems.push(self.transition_systems[index].clone());
        self.distances.push(self.distances[index].clone());
        self.representations.push(None);
        self.num_active_entries += 1;
        self.transition_systems.len() - 1
    }

    /// Discards every transient entry (copies and probe merges) in LIFO
    /// order, restoring the exact live-entry bookkeeping from before the
    /// first [`Self::copy`] call.
    pub fn release_copies(&mut self) {
        if let Some(baseline) = self.transient_baseline.take() {
            self.transition_systems.truncate(baseline);
            self.representations.truncate(baseline);
            self.distances.truncate(baseline);
            self.num_active_entries =
                self.transition_systems.iter().filter(|ts| ts.is_some()).count();
        }
    }

    // ------------------------------------------------------------------------
    // --- ACCESSORS ----------------------------------------------------------
    // ------------------------------------------------------------------------

    /// The total number of slots ever allocated (live or not). New factors
    /// are appended at this index.
    pub fn size(&self) -> usize {
        self.transition_systems.len()
    }
    /// The number of live factors.
    pub fn num_active_entries(&self) -> usize {
        self.num_active_entries
    }
    /// Returns true iff the given index denotes a live factor.
    pub fn is_active(&self, index: usize) -> bool {
        index < self.size() && self.transition_systems[index].is_some()
    }
    /// The indices of all live factors, in increasing order.
    pub fn live_indices(&self) -> Vec<usize> {
        (0..self.size()).filter(|&i| self.is_active(i)).collect()
    }
    /// The shared labels table.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }
    /// The transition system of the given live factor.
    pub fn get_transition_system(&self, index: usize) -> &TransitionSystem {
        self.transition_systems[index].as_ref().expect("empty factor slot")
    }
    /// The distances of the given live factor.
    pub fn get_distances(&self, index: usize) -> &Distances {
        self.distances[index].as_ref().expect("empty factor slot")
    }
    /// The representation of the given live factor (absent on transient
    /// copies).
    pub fn get_representation(&self, index: usize) -> Option<&Representation> {
        self.representations[index].as_ref()
    }

    /// A factor is solvable as long as its initial state still reaches some
    /// goal state.
    pub fn is_factor_solvable(&self, index: usize) -> bool {
        let ts = self.get_transition_system(index);
        match ts.init_state() {
            None => false,
            Some(init) => self.get_distances(index).goal_distance(init) != INFINITY,
        }
    }
    /// The index of the first factor found unsolvable, if any.
    pub fn unsolvable_index(&self) -> Option<usize> {
        self.unsolvable_index
    }
    /// The goal distance of the initial state of the given factor: the
    /// heuristic value this factor assigns to the initial task state.
    pub fn get_init_goal_distance(&self, index: usize) -> isize {
        let ts = self.get_transition_system(index);
        match ts.init_state() {
            None => INFINITY,
            Some(init) => self.get_distances(index).goal_distance(init),
        }
    }

    /// Consumes the final factor of a finished construction: the unsolvable
    /// one when unsolvability was detected, the most recently created live
    /// factor otherwise.
    pub fn extract_final(&mut self) -> (Representation, Distances) {
        let index = self
            .unsolvable_index
            .or_else(|| self.live_indices().pop())
            .expect("no factor left to extract");
        self.extract_factor(index)
    }

    /// Consumes the given factor and hands out its representation and
    /// distances; the slot becomes empty.
    pub fn extract_factor(&mut self, index: usize) -> (Representation, Distances) {
        assert!(self.is_active(index));
        let representation =
            self.representations[index].take().expect("extracting a transient copy");
        let distances = self.distances[index].take().unwrap();
        self.transition_systems[index] = None;
        self.num_active_entries -= 1;
        (representation, distances)
    }

    /// A one line summary of the given factor, for log output.
    pub fn statistics(&self, index: usize) -> String {
        format!(
            "factor {index}: {}; {}",
            self.get_transition_system(index).statistics(),
            self.get_distances(index).statistics(),
        )
    }
    /// A full rendition of the given factor, for the debug verbosity level.
    pub fn dump(&self, index: usize) -> String {
        self.get_transition_system(index).dump()
    }

    /// The internal consistency of one factor: distances in sync, transitions
    /// canonical, every active label grouped. Only meant for debug
    /// assertions.
    fn is_component_valid(&self, index: usize) -> bool {
        let ts = self.get_transition_system(index);
        self.get_distances(index).are_computed()
            && ts.are_transitions_sorted_unique()
            && self.labels.active_labels().all(|l| ts.group_of_label(l).is_some())
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
