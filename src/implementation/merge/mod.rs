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

//! This module provides the implementations of the stock merge strategies:
//! linear merging along a variable order, score-based filtering over a list
//! of scoring functions, merging along the strongly connected components of
//! the causal graph, the MIASM precomputed merge tree, random merging,
//! replaying a predefined order, and oracle-backed symmetry merging.

mod linear;
mod random;
mod predefined;
mod score_based;
mod scoring;
mod sccs;
mod miasm;
mod symmetries;

pub use linear::*;
pub use random::*;
pub use predefined::*;
pub use score_based::*;
pub use scoring::*;
pub use sccs::*;
pub use miasm::*;
pub use symmetries::*;

use crate::FactoredTransitionSystem;

/// The candidate indices a strategy must choose from: the `allowed` subset
/// when the main loop restricts it, every live index otherwise.
pub(crate) fn candidate_indices(
    fts: &FactoredTransitionSystem,
    allowed: &[usize],
) -> Vec<usize> {
    if allowed.is_empty() {
        fts.live_indices()
    } else {
        allowed.iter().copied().filter(|&i| fts.is_active(i)).collect()
    }
}
