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

//! This module provides the stock merge scoring functions consumed by the
//! score-based filtering selector. Scores are minimized: the best candidates
//! are those with the lowest score under each function in turn.

use fxhash::FxHashMap;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::{
    compute_shrink_sizes, AtLimit, Fact, FactoredTransitionSystem,
    MergeScoringFunction, PlanningTask, ShrinkBisimulation, ShrinkStrategy,
    TransitionSystem, Variable, INFINITY,
};

// ----------------------------------------------------------------------------
// --- GOAL RELEVANCE ---------------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate 0 when at least one of its factors is goal relevant
/// (has a non goal state), ∞ otherwise. Merging two goal irrelevant factors
/// can never improve the heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringGoalRelevance;
impl MergeScoringFunction for ScoringGoalRelevance {
    fn name(&self) -> &str {
        "goal relevance"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                let relevant = fts.get_transition_system(i).is_goal_relevant()
                    || fts.get_transition_system(j).is_goal_relevant();
                if relevant {
                    0.0
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- DFP --------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The weight of Dräger, Finkbeiner and Podelski: for every label, its rank
/// in a factor is the smallest goal distance among the targets of its group's
/// transitions (−1 for labels irrelevant in the factor). A candidate pair is
/// scored `min over labels relevant in both factors of max(rank1, rank2)`;
/// pairs without such a label score ∞.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringDfp;

/// The per-label ranks of one factor; `None` encodes the −1 "irrelevant"
/// rank of the original formulation.
fn label_ranks(fts: &FactoredTransitionSystem, index: usize) -> Vec<Option<isize>> {
    let ts = fts.get_transition_system(index);
    let distances = fts.get_distances(index);
    let mut ranks: Vec<Option<isize>> = vec![None; fts.labels().len()];
    for (_, group) in ts.label_groups() {
        // a group is irrelevant when it self loops on every single state
        let irrelevant = group.transitions().len() == ts.num_states()
            && group.transitions().iter().all(|t| t.is_self_loop());
        let rank = if irrelevant {
            None
        } else {
            Some(
                group
                    .transitions()
                    .iter()
                    .map(|t| distances.goal_distance(t.to))
                    .min()
                    .unwrap_or(INFINITY),
            )
        };
        for &label in group.labels() {
            ranks[label] = match (ranks[label], rank) {
                (None, r) => r,
                (Some(old), Some(new)) => Some(old.min(new)),
                (Some(old), None) => Some(old),
            };
        }
    }
    ranks
}

impl MergeScoringFunction for ScoringDfp {
    fn name(&self) -> &str {
        "dfp"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        let mut cache: FxHashMap<usize, Vec<Option<isize>>> = FxHashMap::default();
        let mut ranks = |fts: &FactoredTransitionSystem, index: usize| {
            cache.entry(index).or_insert_with(|| label_ranks(fts, index)).clone()
        };
        candidates
            .iter()
            .map(|&(i, j)| {
                let ranks1 = ranks(fts, i);
                let ranks2 = ranks(fts, j);
                let mut weight = INFINITY;
                for label in fts.labels().active_labels() {
                    if let (Some(r1), Some(r2)) = (ranks1[label], ranks2[label]) {
                        weight = weight.min(r1.max(r2));
                    }
                }
                if weight == INFINITY {
                    f64::INFINITY
                } else {
                    weight as f64
                }
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- MIASM ------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores every candidate by actually performing the merge on transient
/// copies (with a bisimulation pre-shrink under `max_states`, like the real
/// thing) and measuring the ratio of the pruned product size to the full
/// product size. Lower means more unreachable or irrelevant states vanished.
#[derive(Debug, Clone)]
pub struct ScoringMiasm {
    pub max_states: usize,
}
impl Default for ScoringMiasm {
    fn default() -> Self {
        ScoringMiasm { max_states: 50_000 }
    }
}
impl MergeScoringFunction for ScoringMiasm {
    fn name(&self) -> &str {
        "miasm"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                let expected = fts.get_transition_system(i).num_states()
                    * fts.get_transition_system(j).num_states();
                let probe = shrink_and_merge_temporarily(fts, i, j, self.max_states);
                let score = if fts.is_factor_solvable(probe) {
                    fts.get_transition_system(probe).num_states() as f64 / expected as f64
                } else {
                    // everything was pruned: the perfect merge
                    0.0
                };
                fts.release_copies();
                score
            })
            .collect()
    }
}

/// Copies the two given factors, shrinks the copies the way the main loop
/// would right before a merge (non greedy bisimulation, no threshold), merges
/// them and prunes the product. Returns the probe index; the caller must
/// release the copies.
pub(crate) fn shrink_and_merge_temporarily(
    fts: &mut FactoredTransitionSystem,
    index1: usize,
    index2: usize,
    max_states: usize,
) -> usize {
    let copy1 = fts.copy(index1);
    let copy2 = fts.copy(index2);
    let (target1, target2) = compute_shrink_sizes(
        fts.get_transition_system(copy1).num_states(),
        fts.get_transition_system(copy2).num_states(),
        max_states,
        max_states,
    );
    let mut bisim = ShrinkBisimulation { greedy: false, at_limit: AtLimit::UseUp };
    for (copy, target) in [(copy1, target1), (copy2, target2)] {
        if fts.get_transition_system(copy).num_states() > target {
            let relation = bisim.compute_equivalence_relation(fts, copy, target);
            fts.apply_abstraction(copy, &relation);
        }
    }
    let probe = fts.merge(copy1, copy2);
    fts.prune(probe, true, true, false);
    probe
}

// ----------------------------------------------------------------------------
// --- NUMBER OF TRANSITIONS --------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate by the number of transitions its synchronized product
/// would have, without building it: smaller products are cheaper to carry
/// through the remaining iterations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringNumTransitions;
impl MergeScoringFunction for ScoringNumTransitions {
    fn name(&self) -> &str {
        "number of transitions"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                count_product_transitions(
                    fts,
                    fts.get_transition_system(i),
                    fts.get_transition_system(j),
                ) as f64
            })
            .collect()
    }
}

/// The number of transitions of the (hypothetical) product of the two given
/// factors: every active label contributes the product of its two local
/// transition counts.
pub(crate) fn count_product_transitions(
    fts: &FactoredTransitionSystem,
    ts1: &TransitionSystem,
    ts2: &TransitionSystem,
) -> usize {
    fts.labels()
        .active_labels()
        .map(|label| {
            ts1.transitions_of_label(label).len() * ts2.transitions_of_label(label).len()
        })
        .sum()
}

// ----------------------------------------------------------------------------
// --- LABEL REDUCTION OPPORTUNITIES ------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate by (the negation of) the number of labels that would
/// become combinable once the pair is merged: labels sharing cost and local
/// group in every *other* live factor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringLabelReductionOpportunities;
impl MergeScoringFunction for ScoringLabelReductionOpportunities {
    fn name(&self) -> &str {
        "label reduction opportunities"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                let others: Vec<usize> = fts
                    .live_indices()
                    .into_iter()
                    .filter(|&k| k != i && k != j)
                    .collect();
                let mut bucket_sizes: FxHashMap<(isize, Vec<usize>), usize> =
                    FxHashMap::default();
                for label in fts.labels().active_labels() {
                    let key = (
                        fts.labels().cost(label),
                        others
                            .iter()
                            .map(|&k| {
                                fts.get_transition_system(k)
                                    .group_of_label(label)
                                    .unwrap()
                            })
                            .collect::<Vec<usize>>(),
                    );
                    *bucket_sizes.entry(key).or_insert(0) += 1;
                }
                let combinable: usize =
                    bucket_sizes.values().map(|&size| size.saturating_sub(1)).sum();
                -(combinable as f64)
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- NUMBER OF VARIABLES ----------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate by the number of variables its product would
/// incorporate: prefers keeping the factors small in scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringNumVariables;
impl MergeScoringFunction for ScoringNumVariables {
    fn name(&self) -> &str {
        "number of variables"
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                (fts.get_transition_system(i).incorporated_variables().len()
                    + fts.get_transition_system(j).incorporated_variables().len())
                    as f64
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- CAUSAL CONNECTION ------------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate by how strongly its two factors are causally connected:
/// `1 − (causal arcs between their variables / possible arcs)`, so that
/// tightly coupled factors come first.
#[derive(Debug, Default, Clone)]
pub struct ScoringCausalConnection {
    connected: Vec<Vec<bool>>,
}
impl MergeScoringFunction for ScoringCausalConnection {
    fn name(&self) -> &str {
        "causal connection"
    }
    fn initialize(&mut self, task: &dyn PlanningTask) {
        let n = task.num_variables();
        self.connected = vec![vec![false; n]; n];
        for u in 0..n {
            for &v in task.causal_graph_successors(Variable(u)) {
                self.connected[u][v.id()] = true;
            }
        }
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                let vars1 = fts.get_transition_system(i).incorporated_variables();
                let vars2 = fts.get_transition_system(j).incorporated_variables();
                let mut arcs = 0usize;
                for &u in vars1 {
                    for &v in vars2 {
                        arcs += usize::from(self.connected[u.id()][v.id()]);
                        arcs += usize::from(self.connected[v.id()][u.id()]);
                    }
                }
                let possible = (vars1.len() * vars2.len() * 2) as f64;
                1.0 - arcs as f64 / possible
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- MUTEX DENSITY ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// Scores a candidate by the density of mutexes between the fact pairs of
/// its two factors: mutexes translate into unreachable product states, which
/// pruning then removes for free. Denser is better, hence `1 − density`.
#[derive(Debug, Default, Clone)]
pub struct ScoringMutexDensity {
    density: Vec<Vec<f64>>,
}
impl MergeScoringFunction for ScoringMutexDensity {
    fn name(&self) -> &str {
        "mutex density"
    }
    fn initialize(&mut self, task: &dyn PlanningTask) {
        let n = task.num_variables();
        self.density = vec![vec![0.0; n]; n];
        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                let (du, dv) = (task.domain_size(Variable(u)), task.domain_size(Variable(v)));
                let mut mutexes = 0usize;
                for x in 0..du {
                    for y in 0..dv {
                        let a = Fact { variable: Variable(u), value: x };
                        let b = Fact { variable: Variable(v), value: y };
                        mutexes += usize::from(task.are_facts_mutex(a, b));
                    }
                }
                self.density[u][v] = mutexes as f64 / (du * dv) as f64;
            }
        }
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|&(i, j)| {
                let vars1 = fts.get_transition_system(i).incorporated_variables();
                let vars2 = fts.get_transition_system(j).incorporated_variables();
                let total: f64 = vars1
                    .iter()
                    .flat_map(|&u| vars2.iter().map(move |&v| (u, v)))
                    .map(|(u, v)| self.density[u.id()][v.id()])
                    .sum();
                1.0 - total / (vars1.len() * vars2.len()) as f64
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- TOTAL ORDER ------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The deterministic tie breaker: ranks every candidate by a fixed total
/// order over the factor indices that considers composite factors first
/// (most recent to first added) and atomic factors next (task order). Two
/// candidates never tie.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringTotalOrder {
    num_atomic: usize,
}
impl MergeScoringFunction for ScoringTotalOrder {
    fn name(&self) -> &str {
        "total order"
    }
    fn initialize(&mut self, task: &dyn PlanningTask) {
        self.num_atomic = task.num_variables();
    }
    fn compute_scores(
        &mut self,
        fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        // position of every factor index in the corrected order
        let size = fts.size();
        let mut position = vec![usize::MAX; size];
        let mut next = 0;
        for raw in (0..size).rev() {
            let index =
                if raw >= self.num_atomic { raw } else { self.num_atomic - 1 - raw };
            if fts.is_active(index) {
                position[index] = next;
                next += 1;
            }
        }
        candidates
            .iter()
            .map(|&(i, j)| {
                let (lo, hi) = (position[i].min(position[j]), position[i].max(position[j]));
                (lo * size + hi) as f64
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- SINGLE RANDOM ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// The random tie breaker: one candidate, drawn uniformly with a seeded
/// generator, scores 0 and every other candidate scores ∞.
#[derive(Debug, Clone)]
pub struct ScoringSingleRandom {
    rng: StdRng,
}
impl ScoringSingleRandom {
    pub fn new(seed: u64) -> Self {
        ScoringSingleRandom { rng: StdRng::seed_from_u64(seed) }
    }
}
impl MergeScoringFunction for ScoringSingleRandom {
    fn name(&self) -> &str {
        "single random"
    }
    fn compute_scores(
        &mut self,
        _fts: &mut FactoredTransitionSystem,
        candidates: &[(usize, usize)],
    ) -> Vec<f64> {
        let winner = self.rng.random_range(0..candidates.len());
        (0..candidates.len())
            .map(|c| if c == winner { 0.0 } else { f64::INFINITY })
            .collect()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_scoring {
    use crate::*;

    fn fact(var: usize, value: usize) -> Fact {
        Fact { variable: Variable(var), value }
    }

    /// v0 gates v1 which gates v2 (the goal); v3 is disconnected filler.
    fn chain4_task() -> ExplicitTask {
        ExplicitTask::new(
            vec![2, 2, 2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(1, 1)],
                    effects: vec![Effect { fact: fact(2, 1), conditions: vec![] }],
                },
            ],
            vec![0, 0, 0, 0],
            vec![fact(2, 1)],
        )
    }

    #[test]
    fn goal_relevance_rejects_pairs_of_irrelevant_factors() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringGoalRelevance;
        // factor 2 is the only goal relevant one
        let scores =
            scoring.compute_scores(&mut fts, &[(0, 1), (0, 2), (2, 3)]);
        assert_eq!(f64::INFINITY, scores[0]);
        assert_eq!(0.0, scores[1]);
        assert_eq!(0.0, scores[2]);
    }

    #[test]
    fn dfp_prefers_pairs_sharing_a_label_close_to_the_goal() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringDfp;
        let scores = scoring.compute_scores(&mut fts, &[(1, 2), (0, 3)]);
        // op1 is relevant in both factors 1 and 2 and reaches the goal
        assert!(scores[0] < scores[1]);
    }

    #[test]
    fn miasm_gives_the_best_score_to_the_most_pruning_merge() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        // the real loop prunes the atomic factors before any scoring
        for index in fts.live_indices() {
            fts.prune(index, true, true, false);
        }
        let mut scoring = ScoringMiasm::default();
        let scores = scoring.compute_scores(&mut fts, &[(1, 2), (3, 0)]);
        // (v1, v2): state (0, 1) of the product is unreachable -> 3/4, while
        // (v3, v0) prunes nothing
        assert!(scores[0] < scores[1]);
        // probing left no trace
        assert_eq!(4, fts.num_active_entries());
        assert_eq!(4, fts.size());
    }

    #[test]
    fn transition_counts_are_computed_without_building_the_product() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringNumTransitions;
        let scores = scoring.compute_scores(&mut fts, &[(0, 1)]);
        let merged = fts.merge(0, 1);
        assert_eq!(
            fts.get_transition_system(merged).total_transitions() as f64,
            scores[0]
        );
    }

    #[test]
    fn causal_connection_prefers_connected_pairs() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringCausalConnection::default();
        scoring.initialize(&task);
        let scores = scoring.compute_scores(&mut fts, &[(0, 1), (0, 3)]);
        assert!(scores[0] < scores[1]);
    }

    #[test]
    fn mutex_density_prefers_mutex_rich_pairs() {
        let task = ExplicitTask::new(
            vec![2, 2, 2],
            vec![],
            vec![0, 0, 0],
            vec![fact(0, 1)],
        )
        .with_mutexes([(fact(0, 1), fact(1, 1))]);
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringMutexDensity::default();
        scoring.initialize(&task);
        let scores = scoring.compute_scores(&mut fts, &[(0, 1), (0, 2)]);
        assert!(scores[0] < scores[1]);
    }

    #[test]
    fn total_order_places_composites_before_atomics() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringTotalOrder::default();
        scoring.initialize(&task);
        let merged = fts.merge(0, 1);
        let scores = scoring.compute_scores(&mut fts, &[(2, 3), (merged, 2)]);
        // the composite ranks before any atomic factor
        assert!(scores[1] < scores[0]);
    }

    #[test]
    fn total_order_never_ties() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringTotalOrder::default();
        scoring.initialize(&task);
        let candidates =
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let mut scores = scoring.compute_scores(&mut fts, &candidates);
        scores.sort_unstable_by(f64::total_cmp);
        scores.dedup();
        assert_eq!(candidates.len(), scores.len());
    }

    #[test]
    fn single_random_elects_exactly_one_winner() {
        let task = chain4_task();
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringSingleRandom::new(99);
        let scores = scoring.compute_scores(&mut fts, &[(0, 1), (0, 2), (1, 2)]);
        assert_eq!(1, scores.iter().filter(|&&s| s == 0.0).count());
        assert_eq!(2, scores.iter().filter(|&&s| s == f64::INFINITY).count());
    }

    #[test]
    fn label_reduction_opportunities_counts_combinable_labels() {
        // two identical operators: combinable once their distinguishing
        // factors are both part of the merge
        let task = ExplicitTask::new(
            vec![2, 2, 2],
            vec![
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 0)],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
                ExplicitOperator {
                    cost: 1,
                    preconditions: vec![fact(0, 1)],
                    effects: vec![Effect { fact: fact(1, 1), conditions: vec![] }],
                },
            ],
            vec![0, 0, 0],
            vec![fact(1, 1)],
        );
        let mut fts = FactoredTransitionSystem::new(&task);
        let mut scoring = ScoringLabelReductionOpportunities;
        let scores = scoring.compute_scores(&mut fts, &[(0, 1), (1, 2)]);
        // merging (0, 1) leaves only factor 2 where both labels self loop:
        // one combination becomes possible
        assert_eq!(-1.0, scores[0]);
        // merging (1, 2) leaves factor 0 where the labels differ
        assert_eq!(0.0, scores[1]);
    }
}
