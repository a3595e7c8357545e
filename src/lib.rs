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


//! # MNS
//! MNS is a generic framework to build merge-and-shrink abstraction
//! heuristics for classical planning tasks in Rust. Its goal is to let you
//! describe your planning task through the `PlanningTask` trait (or
//! instantiate the ready-made `ExplicitTask`) and to compute an admissible
//! goal-distance estimator from it. To that end, the framework maintains a
//! *factored transition system*: a collection of abstract transition systems
//! which it repeatedly merges (synchronized product) and shrinks (quotient
//! under an equivalence relation), while a merge tree of lookup tables keeps
//! track of where every concrete state went. When the construction finishes,
//! looking a state up costs a handful of table accesses.
//!
//! ## Quick Example
//! The following presents a minimalistic use of mns. It computes the exact
//! goal distances for the little "chain" task: flip the first switch, which
//! unlocks flipping the second one, which is the goal.
//!
//! #### Describe your planning task
//! A task is made of finite domain variables, operators (preconditions,
//! effects, a cost), an initial state and a conjunctive goal:
//! ```
//! use mns::*;
//!
//! let on = |var: usize| Fact { variable: Variable(var), value: 1 };
//! let off = |var: usize| Fact { variable: Variable(var), value: 0 };
//!
//! let task = ExplicitTask::new(
//!     // two binary variables
//!     vec![2, 2],
//!     vec![
//!         // flip the first switch (only from its off position)
//!         ExplicitOperator {
//!             cost: 1,
//!             preconditions: vec![off(0)],
//!             effects: vec![Effect { fact: on(0), conditions: vec![] }],
//!         },
//!         // the second switch requires the first one to be on
//!         ExplicitOperator {
//!             cost: 1,
//!             preconditions: vec![on(0)],
//!             effects: vec![Effect { fact: on(1), conditions: vec![] }],
//!         },
//!     ],
//!     // initially both switches are off
//!     vec![0, 0],
//!     // the goal only cares about the second switch
//!     vec![on(1)],
//! );
//! # let _ = task;
//! ```
//!
//! #### Pick your strategies and run the algorithm
//! The construction is driven by three cooperating strategies: a *merge
//! strategy* decides which two factors to combine next, a *shrink strategy*
//! decides how to abstract a factor that grows beyond the size limits, and
//! (optional but recommended) *label reduction* combines operator labels
//! that have become indistinguishable. The recommended defaults are the
//! SCC-DFP merge strategy, non-greedy bisimulation shrinking, and exact
//! label reduction before shrinking:
//! ```
//! # use mns::*;
//! # let on = |var: usize| Fact { variable: Variable(var), value: 1 };
//! # let off = |var: usize| Fact { variable: Variable(var), value: 0 };
//! # let task = ExplicitTask::new(
//! #     vec![2, 2],
//! #     vec![
//! #         ExplicitOperator {
//! #             cost: 1,
//! #             preconditions: vec![off(0)],
//! #             effects: vec![Effect { fact: on(0), conditions: vec![] }],
//! #         },
//! #         ExplicitOperator {
//! #             cost: 1,
//! #             preconditions: vec![on(0)],
//! #             effects: vec![Effect { fact: on(1), conditions: vec![] }],
//! #         },
//! #     ],
//! #     vec![0, 0],
//! #     vec![on(1)],
//! # );
//! // 1. The merge strategy: score-based filtering with the DFP weights
//! let mut merge = MergeSccs::new(
//!     OrderOfSccs::Topological,
//!     InternalMergeOrder::Selector(ScoreBasedFiltering::dfp()),
//! );
//!
//! // 2. The shrink strategy: non-greedy bisimulation
//! let mut shrink = ShrinkBisimulation::default();
//!
//! // 3. Exact label reduction, applied before shrinking
//! let mut reduction = ExactLabelReduction::new(true, false);
//!
//! // 4. The size limits and budgets (the defaults cap factors at 50 000
//! //    abstract states)
//! let params = MergeAndShrinkParametersBuilder::default().build().unwrap();
//!
//! // 5. Validate the configuration -- the only fallible step
//! let mut algorithm = MergeAndShrinkAlgorithm::new(
//!     &mut merge,
//!     &mut shrink,
//!     Some(&mut reduction),
//!     params,
//! ).unwrap();
//!
//! // 6. Build the abstraction and extract the heuristic
//! let heuristic = MergeAndShrinkHeuristic::from_algorithm(&task, &mut algorithm);
//!
//! // 7. Query it: two steps from the start, one after the first flip, and
//! //    a `None` would have denoted a dead end
//! assert_eq!(Some(2), heuristic.value(&[0, 0]));
//! assert_eq!(Some(1), heuristic.value(&[1, 0]));
//! assert_eq!(Some(0), heuristic.value(&[1, 1]));
//! ```
//!
//! ## Going further / Getting a grasp on the codebase
//! The easiest way to get your way around with MNS is probably to start
//! exploring the available APIs and then to move to the exploration of the
//! stock strategies. For the exploration of the APIs, you are encouraged to
//! start with the types `mns::PlanningTask` and `mns::ExplicitTask` which
//! define what the framework consumes. After that, it is interesting to have
//! a look at the various merge and shrink strategies and the configuration
//! options you can use when customizing the behavior of the algorithm
//! (`mns::MergeAndShrinkParameters`). Time and size budgets never make the
//! construction fail: whatever was built when a budget runs out still yields
//! an admissible heuristic.

mod common;
mod abstraction;
mod implementation;

pub use common::*;
pub use abstraction::*;
pub use implementation::*;
