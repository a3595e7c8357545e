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

//! This module (and its submodules) provide the concrete implementation of
//! the merge-and-shrink engine: the factored transition system and its
//! components, the stock strategies, the main loop and the extracted
//! heuristic.

mod task;
mod labels;
mod transition_system;
mod distances;
mod representation;
mod fts;
mod shrink;
mod merge;
mod label_reduction;
mod algorithm;
mod heuristic;

pub use task::*;
pub use labels::*;
pub use transition_system::*;
pub use distances::*;
pub use representation::*;
pub use fts::*;
pub use shrink::*;
pub use merge::*;
pub use label_reduction::*;
pub use algorithm::*;
pub use heuristic::*;
