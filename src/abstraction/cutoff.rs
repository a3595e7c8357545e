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

//! This module defines the `Cutoff` trait along with the two stock
//! implementations. A cutoff decides when the heuristic construction should
//! stop trying to improve its abstraction and settle for what it has.
//! Cancellation is strictly cooperative: the main loop polls the cutoff
//! between its major steps, and no step ever suspends.

use std::time::{Duration, Instant};

/// The contract of a cutoff criterion. `must_stop` is polled by the main loop
/// after every potentially expensive step; returning true makes the loop
/// terminate gracefully and the best available factors are kept.
pub trait Cutoff {
    fn must_stop(&self) -> bool;
}

/// _This is the default cutoff._ It lets the construction run until a single
/// factor remains (or the abstraction is proved unsolvable).
#[derive(Debug, Default, Copy, Clone)]
pub struct NoCutoff;
impl Cutoff for NoCutoff {
    fn must_stop(&self) -> bool {
        false
    }
}

/// This cutoff allows one to specify a maximum time budget for the heuristic
/// construction. Once the budget is elapsed, the main loop stops and the
/// heuristic is extracted from the factors computed so far.
///
/// The budget is checked against a monotonic clock at every poll; there is no
/// background timer thread.
#[derive(Debug, Clone)]
pub struct ElapsedTimeBudget {
    start: Instant,
    budget: Duration,
}
impl ElapsedTimeBudget {
    /// Creates a budget starting to count *now*.
    pub fn new(budget: Duration) -> Self {
        ElapsedTimeBudget { start: Instant::now(), budget }
    }
    /// The time spent since this budget was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
impl Cutoff for ElapsedTimeBudget {
    fn must_stop(&self) -> bool {
        self.start.elapsed() > self.budget
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_cutoff {
    use std::time::Duration;

    use crate::{Cutoff, ElapsedTimeBudget, NoCutoff};

    #[test]
    fn no_cutoff_never_stops() {
        assert!(!NoCutoff.must_stop());
    }

    #[test]
    fn an_unexpired_budget_does_not_stop() {
        let budget = ElapsedTimeBudget::new(Duration::from_secs(3600));
        assert!(!budget.must_stop());
    }

    #[test]
    fn an_expired_budget_stops() {
        let budget = ElapsedTimeBudget::new(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(budget.must_stop());
    }
}
