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

//! This module provides the global table of labels shared by all the factors
//! of a factored transition system. A label is an abstraction of one or more
//! operators of the task; it is identified by its position in the table and
//! carries a non-negative cost.

/// The global table of labels. Initially there is one label per operator
/// (same cost); label reduction replaces groups of labels by fresh ones.
///
/// Labels have a lifecycle: they are *active* from their creation until they
/// are *reduced*. Reduced labels are never reused, but their identifiers
/// remain in the table as tombstones so that the indices of the remaining
/// labels stay stable.
#[derive(Debug, Clone)]
pub struct Labels {
    /// cost per label; `None` marks a reduced label (tombstone)
    costs: Vec<Option<isize>>,
    /// the number of `Some` entries in `costs`
    num_active: usize,
}

impl Labels {
    /// Creates the initial table: one active label per operator cost, in
    /// operator order.
    pub fn new(operator_costs: Vec<isize>) -> Self {
        debug_assert!(operator_costs.iter().all(|&c| c >= 0));
        let num_active = operator_costs.len();
        Labels { costs: operator_costs.into_iter().map(Some).collect(), num_active }
    }

    /// The total number of identifiers ever handed out, tombstones included.
    /// Fresh labels are assigned the identifier `len()`.
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// True iff no label was ever created.
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// The number of labels which are still active.
    pub fn num_active(&self) -> usize {
        self.num_active
    }

    /// Returns true iff the given label has not been reduced away.
    pub fn is_active(&self, label: usize) -> bool {
        self.costs[label].is_some()
    }

    /// The cost of the given label, which must be active.
    pub fn cost(&self, label: usize) -> isize {
        self.costs[label].expect("cost of a reduced label")
    }

    /// Iterates over the identifiers of all active labels, in increasing
    /// order.
    pub fn active_labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.costs.iter().enumerate().filter(|(_, c)| c.is_some()).map(|(i, _)| i)
    }

    /// Replaces the given (active) labels by a fresh one whose cost is the
    /// minimum of theirs, and returns the identifier of that fresh label.
    /// The old labels become tombstones.
    pub fn reduce(&mut self, old_labels: &[usize]) -> usize {
        debug_assert!(old_labels.len() >= 2);
        let mut cost = isize::MAX;
        for &old in old_labels {
            cost = cost.min(self.costs[old].take().expect("reducing an inactive label"));
        }
        self.costs.push(Some(cost));
        self.num_active -= old_labels.len();
        self.num_active += 1;
        self.costs.len() - 1
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_labels {
    use crate::Labels;

    #[test]
    fn initially_there_is_one_active_label_per_operator() {
        let labels = Labels::new(vec![1, 2, 3]);
        assert_eq!(3, labels.len());
        assert_eq!(3, labels.num_active());
        assert_eq!(vec![0, 1, 2], labels.active_labels().collect::<Vec<_>>());
    }

    #[test]
    fn reduce_creates_a_fresh_label_with_the_minimum_cost() {
        let mut labels = Labels::new(vec![4, 2, 7]);
        let fresh = labels.reduce(&[0, 2]);
        assert_eq!(3, fresh);
        assert_eq!(4, labels.cost(fresh));
        assert_eq!(2, labels.num_active());
    }

    #[test]
    fn reduced_labels_become_tombstones_but_keep_their_identifiers() {
        let mut labels = Labels::new(vec![1, 1, 1]);
        labels.reduce(&[0, 1]);
        assert!(!labels.is_active(0));
        assert!(!labels.is_active(1));
        assert!(labels.is_active(2));
        assert!(labels.is_active(3));
        assert_eq!(4, labels.len());
        assert_eq!(vec![2, 3], labels.active_labels().collect::<Vec<_>>());
    }

    #[test]
    fn fresh_labels_can_be_reduced_again() {
        let mut labels = Labels::new(vec![5, 3, 9]);
        let first = labels.reduce(&[0, 1]);
        assert_eq!(3, labels.cost(first));
        let second = labels.reduce(&[first, 2]);
        assert_eq!(4, second);
        assert_eq!(3, labels.cost(second));
        assert_eq!(vec![second], labels.active_labels().collect::<Vec<_>>());
        assert_eq!(1, labels.num_active());
    }
}
