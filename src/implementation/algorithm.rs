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

//! This module provides the main merge-and-shrink loop: the component that
//! repeatedly asks the merge strategy for a pair, reduces labels, shrinks the
//! pair under the size limits, merges it and prunes the product, until a
//! single factor remains or some budget runs out. Budgets ending the loop are
//! regular outcomes; only an invalid configuration is an error.

use std::time::Duration;

use derive_builder::Builder;
use log::{debug, info, trace, warn};

use crate::{
    shrink_before_merge_step, Completion, ConfigError, Cutoff, ElapsedTimeBudget,
    ExactLabelReduction, FactoredTransitionSystem, Interrupt, MergeStrategy, NoCutoff,
    PlanningTask, ShrinkStrategy, Verbosity,
};

// ----------------------------------------------------------------------------
// --- PARAMETERS -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The tuning knobs of the merge-and-shrink construction. Unset size limits
/// are resolved against each other when the algorithm is created (see
/// [`MergeAndShrinkAlgorithm::new`]); inconsistent combinations are corrected
/// with a warning, and nonsensical ones are rejected.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct MergeAndShrinkParameters {
    /// maximum factor size allowed at any time point
    #[builder(setter(strip_option))]
    pub max_states: Option<usize>,
    /// maximum factor size allowed for the two factors of a merge
    #[builder(setter(strip_option))]
    pub max_states_before_merge: Option<usize>,
    /// factors above this soft limit get shrunk before they are merged
    #[builder(setter(strip_option))]
    pub threshold_before_merge: Option<usize>,
    /// prune abstract states unreachable from the initial state
    pub prune_unreachable_states: bool,
    /// prune abstract states from which no goal state can be reached
    pub prune_irrelevant_states: bool,
    /// map pruned states onto sink states instead of dropping them
    pub pruning_as_abstraction: bool,
    /// how chatty the construction is
    pub verbosity: Verbosity,
    /// time budget for the whole construction (None = unbounded)
    #[builder(setter(strip_option))]
    pub max_time: Option<Duration>,
    /// stop the construction when a factor exceeds this many transitions
    #[builder(setter(strip_option))]
    pub num_transitions_to_abort: Option<usize>,
    /// exclude factors exceeding this many transitions from further merges
    #[builder(setter(strip_option))]
    pub num_transitions_to_exclude: Option<usize>,
}

impl Default for MergeAndShrinkParameters {
    fn default() -> Self {
        MergeAndShrinkParameters {
            max_states: None,
            max_states_before_merge: None,
            threshold_before_merge: None,
            prune_unreachable_states: true,
            prune_irrelevant_states: true,
            pruning_as_abstraction: false,
            verbosity: Verbosity::default(),
            max_time: None,
            num_transitions_to_abort: None,
            num_transitions_to_exclude: None,
        }
    }
}

/// The default cap on factor sizes when the user sets no limit at all.
const DEFAULT_MAX_STATES: usize = 50_000;

/// Resolves the three interdependent size limits the way users expect:
/// limits left unset are derived from the ones given, oversized values are
/// corrected with a warning, and a zero limit is rejected.
fn resolve_size_limits(
    params: &MergeAndShrinkParameters,
) -> Result<(usize, usize, usize), ConfigError> {
    let (mut max_states, mut max_before_merge) =
        match (params.max_states, params.max_states_before_merge) {
            (None, None) => (DEFAULT_MAX_STATES, DEFAULT_MAX_STATES),
            (Some(max), None) => (max, max),
            (None, Some(before)) => (before.saturating_mul(before), before),
            (Some(max), Some(before)) => (max, before),
        };
    if max_before_merge > max_states {
        warn!("max_states_before_merge exceeds max_states, correcting");
        max_before_merge = max_states;
    }
    if max_states < 1 {
        return Err(ConfigError::MaxStatesTooLow);
    }
    if max_before_merge < 1 {
        return Err(ConfigError::MaxStatesBeforeMergeTooLow);
    }

    let mut threshold = params.threshold_before_merge.unwrap_or(max_states);
    if threshold < 1 {
        return Err(ConfigError::ThresholdTooLow);
    }
    if threshold > max_states {
        warn!("threshold_before_merge exceeds max_states, correcting");
        threshold = max_states;
    }
    Ok((max_states, max_before_merge, threshold))
}

// ----------------------------------------------------------------------------
// --- ALGORITHM --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The merge-and-shrink algorithm. It borrows its strategies (they are
/// stateful across iterations) and owns the validated parameters.
pub struct MergeAndShrinkAlgorithm<'a> {
    merge_strategy: &'a mut dyn MergeStrategy,
    shrink_strategy: &'a mut dyn ShrinkStrategy,
    label_reduction: Option<&'a mut ExactLabelReduction>,
    params: MergeAndShrinkParameters,
    max_states: usize,
    max_states_before_merge: usize,
    threshold_before_merge: usize,
}

impl<'a> MergeAndShrinkAlgorithm<'a> {
    /// Validates the configuration and creates the algorithm. This is the
    /// only place where a user error is reported; everything after this
    /// point terminates gracefully.
    pub fn new(
        merge_strategy: &'a mut dyn MergeStrategy,
        shrink_strategy: &'a mut dyn ShrinkStrategy,
        label_reduction: Option<&'a mut ExactLabelReduction>,
        params: MergeAndShrinkParameters,
    ) -> Result<Self, ConfigError> {
        let (max_states, max_states_before_merge, threshold_before_merge) =
            resolve_size_limits(&params)?;
        Ok(MergeAndShrinkAlgorithm {
            merge_strategy,
            shrink_strategy,
            label_reduction,
            params,
            max_states,
            max_states_before_merge,
            threshold_before_merge,
        })
    }

    fn normal(&self) -> bool {
        self.params.verbosity >= Verbosity::Normal
    }
    fn verbose(&self) -> bool {
        self.params.verbosity >= Verbosity::Verbose
    }

    fn warn_on_unusual_options(&self) {
        match &self.label_reduction {
            None => warn!(
                "you did not enable label reduction; this may drastically \
                 reduce the performance of merge-and-shrink"
            ),
            Some(reduction) => {
                if reduction.before_shrinking && reduction.before_merging {
                    warn!(
                        "label reduction is applied twice per iteration, both \
                         before shrinking and merging; this double computation \
                         effort does not pay off for most configurations"
                    );
                } else {
                    if reduction.before_shrinking
                        && (self.shrink_strategy.name() == "f-preserving"
                            || self.shrink_strategy.name() == "random")
                    {
                        warn!(
                            "bucket-based shrink strategies perform best if \
                             used with label reduction before merging, not \
                             before shrinking"
                        );
                    }
                    if reduction.before_merging
                        && self.shrink_strategy.name().contains("bisimulation")
                    {
                        warn!(
                            "shrinking based on bisimulation performs best if \
                             used with label reduction before shrinking, not \
                             before merging"
                        );
                    }
                }
            }
        }
        if !self.params.prune_unreachable_states || !self.params.prune_irrelevant_states {
            warn!(
                "pruning is (partially) turned off; this may drastically \
                 reduce the performance of merge-and-shrink"
            );
        }
    }

    /// Prunes every live factor according to the configured flags. Returns
    /// true iff some factor became unsolvable.
    fn prune_all_factors(&self, fts: &mut FactoredTransitionSystem) -> bool {
        for index in fts.live_indices() {
            if self.params.prune_unreachable_states || self.params.prune_irrelevant_states
            {
                fts.prune(
                    index,
                    self.params.prune_unreachable_states,
                    self.params.prune_irrelevant_states,
                    self.params.pruning_as_abstraction,
                );
            }
            if !fts.is_factor_solvable(index) {
                fts.mark_unsolvable(index);
                return true;
            }
        }
        false
    }

    fn too_many_transitions(&self, fts: &FactoredTransitionSystem, index: usize) -> bool {
        match self.params.num_transitions_to_abort {
            None => false,
            Some(abort) => {
                let transitions = fts.get_transition_system(index).total_transitions();
                if transitions > abort {
                    if self.normal() {
                        info!(
                            "factor {index} has too many transitions \
                             ({transitions}), stopping computation"
                        );
                    }
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Builds the factored transition system: atomic construction, pruning,
    /// then the main loop. The returned completion tells whether the
    /// construction ran to the end or which budget interrupted it; in every
    /// case the returned system induces an admissible heuristic.
    pub fn build_factored_transition_system(
        &mut self,
        task: &dyn PlanningTask,
    ) -> (FactoredTransitionSystem, Completion) {
        let cutoff: Box<dyn Cutoff> = match self.params.max_time {
            Some(budget) => Box::new(ElapsedTimeBudget::new(budget)),
            None => Box::new(NoCutoff),
        };
        if self.normal() {
            info!("running merge-and-shrink algorithm...");
            info!(
                "size limits: max states {}, before merge {}, shrink threshold {}",
                self.max_states, self.max_states_before_merge, self.threshold_before_merge,
            );
        }
        self.warn_on_unusual_options();

        let mut fts = FactoredTransitionSystem::new(task);
        if self.normal() {
            info!("built {} atomic factors", fts.size());
        }
        let unsolvable = self.prune_all_factors(&mut fts);

        let mut interrupt = None;
        if unsolvable {
            if self.normal() {
                info!("atomic factored system is unsolvable, stopping computation");
            }
        } else if cutoff.must_stop() {
            interrupt = Some(Interrupt::RanOutOfTime);
        } else if fts.live_indices().iter().any(|&i| self.too_many_transitions(&fts, i)) {
            interrupt = Some(Interrupt::TooManyTransitions);
        } else {
            self.merge_strategy.initialize(task, &fts);
            interrupt = self.main_loop(&mut fts, cutoff.as_ref());
        }
        (fts, Completion { is_exact: interrupt.is_none(), interrupt })
    }

    fn main_loop(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        cutoff: &dyn Cutoff,
    ) -> Option<Interrupt> {
        let num_atomic = fts.size();
        let mut maximum_intermediate_size = 0;
        let mut maximum_transitions = 0;
        for index in fts.live_indices() {
            let ts = fts.get_transition_system(index);
            maximum_intermediate_size = maximum_intermediate_size.max(ts.num_states());
            maximum_transitions = maximum_transitions.max(ts.total_transitions());
        }
        let mut remaining_labels = vec![fts.labels().num_active()];
        let mut init_h_improvements: Vec<isize> = vec![];
        let mut relative_pruning: Vec<f64> = vec![];
        let mut merge_order: Vec<(usize, usize)> = vec![];

        let exclude_enabled = self.params.num_transitions_to_exclude.is_some();
        let mut allowed: Vec<usize> =
            if exclude_enabled { fts.live_indices() } else { vec![] };

        let mut interrupt = None;
        while fts.num_active_entries() > 1 {
            let (index1, index2) = self.merge_strategy.next_pair(fts, &allowed);
            assert_ne!(index1, index2, "merge strategy returned twice the same index");
            merge_order.push((index1, index2));
            if self.normal() {
                info!("next pair of indices: ({index1}, {index2})");
                if self.verbose() {
                    debug!("{}", fts.statistics(index1));
                    debug!("{}", fts.statistics(index2));
                }
            }
            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }

            // label reduction (before shrinking)
            if let Some(reduction) = self.label_reduction.as_deref_mut() {
                if reduction.before_shrinking {
                    reduction.reduce((index1, index2), fts);
                    remaining_labels.push(fts.labels().num_active());
                }
            }
            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }

            // shrinking
            let shrunk = shrink_before_merge_step(
                fts,
                self.shrink_strategy,
                index1,
                index2,
                self.max_states,
                self.max_states_before_merge,
                self.threshold_before_merge,
            );
            if self.verbose() && shrunk {
                debug!("{}", fts.statistics(index1));
                debug!("{}", fts.statistics(index2));
            }
            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }

            // label reduction (before merging)
            if let Some(reduction) = self.label_reduction.as_deref_mut() {
                if reduction.before_merging {
                    reduction.reduce((index1, index2), fts);
                    remaining_labels.push(fts.labels().num_active());
                }
            }
            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }

            // merging
            let init_h1 = fts.get_init_goal_distance(index1);
            let init_h2 = fts.get_init_goal_distance(index2);
            let merged = fts.merge(index1, index2);
            let merged_size = fts.get_transition_system(merged).num_states();
            maximum_intermediate_size = maximum_intermediate_size.max(merged_size);
            maximum_transitions = maximum_transitions
                .max(fts.get_transition_system(merged).total_transitions());
            init_h_improvements
                .push(fts.get_init_goal_distance(merged).saturating_sub(init_h1.max(init_h2)));
            if self.verbose() {
                debug!("{}", fts.statistics(merged));
            }
            if self.params.verbosity >= Verbosity::Debug {
                trace!("{}", fts.dump(merged));
            }

            // we do not check the transition budget here but only after
            // pruning, to allow recovering a too large product
            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }

            // pruning
            if self.params.prune_unreachable_states || self.params.prune_irrelevant_states
            {
                let before = merged_size;
                fts.prune(
                    merged,
                    self.params.prune_unreachable_states,
                    self.params.prune_irrelevant_states,
                    self.params.pruning_as_abstraction,
                );
                let after = fts.get_transition_system(merged).num_states();
                relative_pruning.push(1.0 - after as f64 / before as f64);
                if self.verbose() && after < before {
                    debug!("{}", fts.statistics(merged));
                }
            }

            if !fts.is_factor_solvable(merged) {
                fts.mark_unsolvable(merged);
                if self.normal() {
                    info!("abstract problem is unsolvable, stopping computation");
                }
                break;
            }

            if exclude_enabled {
                let threshold = self.params.num_transitions_to_exclude.unwrap();
                allowed.retain(|&i| i != index1 && i != index2);
                let transitions = fts.get_transition_system(merged).total_transitions();
                if transitions <= threshold {
                    allowed.push(merged);
                } else if self.normal() {
                    info!(
                        "factor {merged} has too many transitions ({transitions}), \
                         excluding it from further merges"
                    );
                }
                if allowed.len() <= 1 {
                    if self.normal() {
                        info!(
                            "not enough factors remaining with a low enough \
                             number of transitions, stopping computation"
                        );
                    }
                    interrupt = Some(Interrupt::NotEnoughAllowedFactors);
                    break;
                }
            }

            if cutoff.must_stop() {
                interrupt = Some(Interrupt::RanOutOfTime);
                break;
            }
            if self.too_many_transitions(fts, merged) {
                interrupt = Some(Interrupt::TooManyTransitions);
                break;
            }
        }

        if self.normal() {
            info!("end of merge-and-shrink algorithm, statistics:");
            info!("maximum intermediate abstraction size: {maximum_intermediate_size}");
            info!("maximum intermediate number of transitions: {maximum_transitions}");
            info!("init h value improvements: {init_h_improvements:?}");
            info!("course of label reduction: {remaining_labels:?}");
            info!("relative pruning per iteration: {relative_pruning:?}");
            let (tiebreak_iterations, tiebreak_candidates) =
                self.merge_strategy.tiebreaking_statistics();
            info!("iterations with merge tiebreaking: {tiebreak_iterations}");
            info!("total tiebreaking merge candidates: {tiebreak_candidates}");
            let linear = merge_order
                .iter()
                .enumerate()
                .skip(1)
                .all(|(k, &(a, b))| a == num_atomic + k - 1 || b == num_atomic + k - 1);
            info!(
                "merge order: {merge_order:?} ({})",
                if linear { "linear" } else { "non-linear" }
            );
        }
        interrupt
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
