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

//! This module provides the symmetry-based merge strategy. The actual
//! symmetry detection (building a symmetry graph of the factored system and
//! canonicalizing it) lives behind the [`SymmetryOracle`] trait and is *not*
//! part of this crate: clients owning a canonicalization engine plug it in
//! here. Whenever the oracle finds a cluster of factors mapped onto each
//! other by an atomic symmetry, those factors are merged with each other
//! first; otherwise the wrapped fallback strategy decides.

use log::warn;

use crate::{FactoredTransitionSystem, MergeStrategy, PlanningTask, SymmetryOracle};

/// The oracle-backed symmetry merge strategy. See the module documentation.
pub struct MergeSymmetries {
    oracle: Box<dyn SymmetryOracle>,
    fallback: Box<dyn MergeStrategy>,
    /// the factor indices of the cluster currently being merged
    current_cluster: Vec<usize>,
    started_cluster: bool,
}

impl MergeSymmetries {
    pub fn new(oracle: Box<dyn SymmetryOracle>, fallback: Box<dyn MergeStrategy>) -> Self {
        MergeSymmetries {
            oracle,
            fallback,
            current_cluster: vec![],
            started_cluster: false,
        }
    }
}

impl MergeStrategy for MergeSymmetries {
    fn name(&self) -> &str {
        "symmetries"
    }

    fn initialize(&mut self, task: &dyn PlanningTask, fts: &FactoredTransitionSystem) {
        self.fallback.initialize(task, fts);
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        if self.current_cluster.len() < 2 && !self.started_cluster && allowed.is_empty() {
            self.current_cluster = self
                .oracle
                .symmetry_clusters(fts)
                .into_iter()
                .map(|cluster| {
                    cluster.into_iter().filter(|&i| fts.is_active(i)).collect::<Vec<_>>()
                })
                .find(|cluster| cluster.len() >= 2)
                .unwrap_or_default();
        }

        let in_cluster = self.current_cluster.len() >= 2
            || (self.started_cluster && !self.current_cluster.is_empty());
        if in_cluster {
            let pair = if !self.started_cluster {
                (self.current_cluster[0], self.current_cluster[1])
            } else {
                (fts.size() - 1, self.current_cluster[0])
            };
            if allowed.is_empty()
                || (allowed.contains(&pair.0) && allowed.contains(&pair.1))
            {
                self.started_cluster = true;
                self.current_cluster.retain(|&i| i != pair.0 && i != pair.1);
                if self.current_cluster.is_empty() {
                    self.started_cluster = false;
                }
                return pair;
            }
            // the main loop excluded a factor of the cluster merge sequence:
            // abandon the cluster and let the fallback decide
            warn!("symmetry cluster cannot honor a factor restriction, falling back");
        }
        self.current_cluster.clear();
        self.started_cluster = false;
        self.fallback.next_pair(fts, allowed)
    }

    fn tiebreaking_statistics(&self) -> (usize, usize) {
        self.fallback.tiebreaking_statistics()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_symmetries {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    fn task3() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2, 2],
            vec![],
            vec![0, 0, 0],
            vec![fact(0, 1)],
        )
    }

    /// A canned oracle answering with a fixed cluster once.
    struct CannedOracle {
        cluster: std::cell::RefCell<Option<Vec<usize>>>,
    }
    impl SymmetryOracle for CannedOracle {
        fn symmetry_clusters(&self, _fts: &FactoredTransitionSystem) -> Vec<Vec<usize>> {
            self.cluster.borrow_mut().take().map(|c| vec![c]).unwrap_or_default()
        }
    }

    #[test]
    fn a_found_cluster_is_merged_before_anything_else() {
        let task = task3();
        let mut fts = FactoredTransitionSystem::new(&task);
        let oracle =
            CannedOracle { cluster: std::cell::RefCell::new(Some(vec![1, 2])) };
        let mut strategy = MergeSymmetries::new(
            Box::new(oracle),
            Box::new(MergeLinear::new(VariableOrder::Level)),
        );
        strategy.initialize(&task, &fts);
        assert_eq!((1, 2), strategy.next_pair(&mut fts, &[]));
    }

    #[test]
    fn without_symmetries_the_fallback_decides() {
        let task = task3();
        let mut fts = FactoredTransitionSystem::new(&task);
        let oracle = CannedOracle { cluster: std::cell::RefCell::new(None) };
        let mut strategy = MergeSymmetries::new(
            Box::new(oracle),
            Box::new(MergeLinear::new(VariableOrder::Level)),
        );
        strategy.initialize(&task, &fts);
        assert_eq!((0, 1), strategy.next_pair(&mut fts, &[]));
    }

    #[test]
    fn a_restriction_mid_cluster_abandons_it_and_delegates_to_the_fallback() {
        let task = ExplicitTask::new(
            vec![2, 2, 2, 2],
            vec![],
            vec![0, 0, 0, 0],
            vec![fact(0, 1)],
        );
        let mut fts = FactoredTransitionSystem::new(&task);
        let oracle =
            CannedOracle { cluster: std::cell::RefCell::new(Some(vec![1, 2, 3])) };
        let mut strategy = MergeSymmetries::new(
            Box::new(oracle),
            Box::new(MergeLinear::new(VariableOrder::Level)),
        );
        strategy.initialize(&task, &fts);

        assert_eq!((1, 2), strategy.next_pair(&mut fts, &[]));
        fts.merge(1, 2);
        // the exclusion threshold kicked in: the fresh composite is not
        // allowed, so the pending cluster merge cannot happen and the
        // fallback must choose among the allowed factors
        let (a, b) = strategy.next_pair(&mut fts, &[0, 3]);
        assert_eq!((0, 3), (a, b));
        assert!(fts.is_active(a) && fts.is_active(b));
    }
}
