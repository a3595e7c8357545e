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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client library is likely to work with.

use thiserror::Error;

// ----------------------------------------------------------------------------
// --- VARIABLE ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// This type denotes a state variable of the planning task at hand. Each
/// variable is assumed to be identified with an integer ranging from 0 until
/// `task.num_variables()` and to carry a finite domain `{0..domain_size}`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Variable(pub usize);
impl Variable {
    #[inline]
    /// This function retruns the id (numeric value) of the variable.
    ///
    /// # Examples:
    /// ```
    /// # use mns::Variable;
    /// assert_eq!(0, Variable(0).id());
    /// assert_eq!(1, Variable(1).id());
    /// assert_eq!(2, Variable(2).id());
    /// assert_eq!(3, Variable(3).id());
    /// ```
    pub fn id(self) -> usize {
        self.0
    }
}

// ----------------------------------------------------------------------------
// --- FACT -------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A fact is the affectation of a given `value` to some `variable` of the
/// task. Any given `Fact` should be understood as ```[[ variable = value ]]```.
/// Preconditions, goals and effect conditions are all conjunctions of facts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Fact {
    pub variable: Variable,
    pub value: usize,
}

// ----------------------------------------------------------------------------
// --- EFFECT -----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// One effect of an operator: it assigns `fact.value` to `fact.variable`
/// whenever the (possibly empty) conjunction of `conditions` holds in the
/// state where the operator is applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Effect {
    /// the assignment performed by this effect
    pub fact: Fact,
    /// the effect only triggers when these facts hold (empty = always)
    pub conditions: Vec<Fact>,
}

// ----------------------------------------------------------------------------
// --- SENTINELS --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The value used to encode an infinite distance (unreachable / dead state).
pub const INFINITY: isize = isize::MAX;

/// The reserved abstract state denoting that a concrete state has been pruned
/// away from its factor. A lookup that reaches this sentinel can never lead
/// to a goal state.
pub const PRUNED_STATE: isize = -1;

/// The heuristic value standing for a provably unsolvable state. It shares
/// its encoding with [`PRUNED_STATE`]: once a representation has been
/// "distance-ified", pruned entries and infinite distances collapse onto this
/// single sentinel.
pub const DEAD_END: isize = -1;

// ----------------------------------------------------------------------------
// --- VERBOSITY --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The amount of output the algorithm produces while it runs. All output is
/// emitted through the `log` crate; this level decides what gets emitted at
/// all, irrespective of the logger configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub enum Verbosity {
    /// no output during construction, only starting and final statistics
    Silent,
    /// basic output during construction, starting and final statistics
    #[default]
    Normal,
    /// full output during construction, starting and final statistics
    Verbose,
    /// like verbose, with factor dumps after every operation
    Debug,
}

// ----------------------------------------------------------------------------
// --- RESULTS ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A reason explaining why the main loop stopped merging factors while more
/// than one factor remained. None of these is an error: the factors computed
/// so far still yield a valid (admissible) heuristic.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Interrupt {
    /// It stopped because the configured time budget was exhausted
    RanOutOfTime,
    /// It stopped because some factor exceeded the transition-count budget
    TooManyTransitions,
    /// It stopped because the exclusion threshold left fewer than two factors
    /// allowed to participate in further merges
    NotEnoughAllowedFactors,
}

/// The outcome of a merge-and-shrink construction.
///
/// Three cases are to be distinguished:
///
/// * When the `is_exact` flag is true and no interrupt is present: the
///   construction merged every factor into a single one (or proved the task
///   unsolvable early), and the resulting heuristic is the full
///   merge-and-shrink heuristic for the configured strategies.
/// * When the `is_exact` flag is false, the `interrupt` tells which budget
///   stopped the construction; the live factors still induce an admissible
///   heuristic.
/// * `is_exact` true together with an interrupt does not occur.
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    /// is the construction exact (it merged down to one factor, or proved the
    /// task unsolvable)? or was it interrupted by some budget?
    pub is_exact: bool,
    /// if present, the budget which interrupted the construction
    pub interrupt: Option<Interrupt>,
}

// ----------------------------------------------------------------------------
// --- CONFIGURATION ERRORS ---------------------------------------------------
// ----------------------------------------------------------------------------
/// The errors which can pop up while validating the user-provided
/// configuration. These are the only fatal errors of the library: everything
/// else (time budget, transition budgets, unsolvable abstractions) is a
/// regular outcome.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("transition system size limit must be at least 1")]
    MaxStatesTooLow,
    #[error("transition system size limit before merge must be at least 1")]
    MaxStatesBeforeMergeTooLow,
    #[error("threshold before merge must be at least 1")]
    ThresholdTooLow,
    #[error("a predefined merge order must merge every factor exactly once")]
    InvalidPredefinedOrder,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_common {
    use crate::{Fact, Variable, Verbosity};

    #[test]
    fn test_var_id() {
        assert_eq!(0, Variable(0).id());
        assert_eq!(1, Variable(1).id());
        assert_eq!(2, Variable(2).id());
        assert_eq!(3, Variable(3).id());
    }

    #[test]
    fn verbosity_levels_are_ordered() {
        assert!(Verbosity::Silent < Verbosity::Normal);
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Debug);
    }

    #[test]
    fn facts_are_ordered_by_variable_then_value() {
        let a = Fact { variable: Variable(0), value: 1 };
        let b = Fact { variable: Variable(1), value: 0 };
        assert!(a < b);
    }
}
