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

//! This module provides the predefined merge strategy: it replays a static
//! merge order, given either as an explicit list of factor index pairs or as
//! a binary merge tree over the task variables. The order is validated up
//! front; replaying an invalid order would be a configuration error, not a
//! runtime surprise.

use std::collections::VecDeque;

use log::warn;

use crate::{ConfigError, FactoredTransitionSystem, MergeStrategy, Variable};

use super::candidate_indices;

/// A binary merge tree: the leaves name atomic factors (task variables), and
/// every inner node stands for the merge of its two subtrees, left before
/// right, bottom up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTree {
    Leaf(Variable),
    Merge(Box<MergeTree>, Box<MergeTree>),
}

impl MergeTree {
    /// Flattens the tree into the pair list its bottom-up evaluation
    /// produces, given that the product of the `k`-th merge is appended at
    /// factor index `num_atomic + k`.
    fn flatten(&self, num_atomic: usize, pairs: &mut Vec<(usize, usize)>) -> usize {
        match self {
            MergeTree::Leaf(var) => var.id(),
            MergeTree::Merge(left, right) => {
                let left_index = left.flatten(num_atomic, pairs);
                let right_index = right.flatten(num_atomic, pairs);
                pairs.push((left_index, right_index));
                num_atomic + pairs.len() - 1
            }
        }
    }
}

/// The predefined merge strategy. See the module documentation.
#[derive(Debug, Clone)]
pub struct MergePredefined {
    pairs: VecDeque<(usize, usize)>,
}

impl MergePredefined {
    /// Builds the strategy from an explicit pair list. The list must describe
    /// a complete merge: `num_atomic - 1` pairs, each index live at replay
    /// time and consumed exactly once.
    pub fn from_pairs(
        pairs: Vec<(usize, usize)>,
        num_atomic: usize,
    ) -> Result<Self, ConfigError> {
        if num_atomic > 0 && pairs.len() != num_atomic - 1 {
            return Err(ConfigError::InvalidPredefinedOrder);
        }
        let mut live = vec![true; num_atomic + pairs.len()];
        for (k, &(a, b)) in pairs.iter().enumerate() {
            let next = num_atomic + k;
            if a == b || a >= next || b >= next || !live[a] || !live[b] {
                return Err(ConfigError::InvalidPredefinedOrder);
            }
            live[a] = false;
            live[b] = false;
        }
        Ok(MergePredefined { pairs: pairs.into() })
    }

    /// Builds the strategy from a merge tree whose leaves must name every
    /// task variable exactly once.
    pub fn from_tree(tree: &MergeTree, num_atomic: usize) -> Result<Self, ConfigError> {
        let mut pairs = vec![];
        tree.flatten(num_atomic, &mut pairs);
        Self::from_pairs(pairs, num_atomic)
    }
}

impl MergeStrategy for MergePredefined {
    fn name(&self) -> &str {
        "predefined"
    }

    fn next_pair(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        allowed: &[usize],
    ) -> (usize, usize) {
        let (a, b) = self.pairs.pop_front().expect("predefined merge order exhausted");
        assert!(
            fts.is_active(a) && fts.is_active(b),
            "predefined merge order references a dead factor"
        );
        if allowed.is_empty() || (allowed.contains(&a) && allowed.contains(&b)) {
            (a, b)
        } else {
            // the main loop excluded a factor the order relies on: degrade
            // gracefully instead of replaying an impossible merge
            warn!("predefined merge order cannot honor a factor restriction, merging the first two candidates");
            let candidates = candidate_indices(fts, allowed);
            (candidates[0], candidates[1])
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
