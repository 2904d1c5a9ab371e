//! Neighborhood Explorer: move enumeration, evaluation, and application.
//!
//! See `spec.md` §4.2. Every selection operation that finds no
//! admissible move signals [`Error::EmptyNeighborhood`], which the base
//! runner (`crate::runner`) recovers from locally by ending the run.

use std::sync::Arc;

use rand::Rng;

use crate::core::cftype::Scalar;
use crate::core::cost::{is_improving, CostStructure, DeltaCostComponent};
use crate::core::state::StateManager;
use crate::error::{Error, Result};

/// A move in some neighborhood.
///
/// Must support value-copy and equality (`Clone + PartialEq`); the
/// inverse predicate defaults to equality, matching `spec.md` §3's
/// "default: equality" and the source's `IsInverse` helper.
pub trait Move: Clone + PartialEq + Send + Sync {
    /// Whether applying `self` after `earlier` would undo it.
    fn inverse(&self, earlier: &Self) -> bool {
        self == earlier
    }
}

/// A move paired with its (possibly not-yet-computed) cost.
///
/// `is_valid = false` means `cost` has not yet been populated for this
/// move; runners lazily populate it via [`NeighborhoodExplorer::delta_cost`].
#[derive(Debug, Clone)]
pub struct EvaluatedMove<Mv, C: Scalar> {
    /// The move itself.
    pub mv: Mv,
    /// The move's evaluated cost, if `is_valid`.
    pub cost: CostStructure<C>,
    /// Whether `cost` has been computed.
    pub is_valid: bool,
}

impl<Mv, C: Scalar> EvaluatedMove<Mv, C> {
    /// A move with its cost already computed.
    pub fn evaluated(mv: Mv, cost: CostStructure<C>) -> Self {
        EvaluatedMove {
            mv,
            cost,
            is_valid: true,
        }
    }
}

/// Enumerates and evaluates moves around a state for one neighborhood.
///
/// `SM` fixes the companion [`StateManager`] this explorer evaluates
/// full costs through; `delta_components` is registered in parallel
/// with `SM::components()` — a `None` at index `i` means component `i`
/// has no incremental evaluator and the framework falls back to full
/// recomputation on a cloned post-state (`spec.md` §4.2).
pub trait NeighborhoodExplorer: Send + Sync {
    /// The opaque problem instance type.
    type Input;
    /// The opaque state type.
    type State: Clone;
    /// The move type for this neighborhood.
    type Move: Move;
    /// The cost scalar (`CFtype`).
    type C: Scalar;
    /// The companion state manager this explorer evaluates full costs through.
    type SM: StateManager<Input = Self::Input, State = Self::State, C = Self::C>;

    /// The state manager used for full-cost fallback evaluation.
    fn state_manager(&self) -> &Self::SM;

    /// Delta evaluators, parallel to `state_manager().components()`.
    /// A missing entry (or an index beyond the slice) falls back to full
    /// recomputation for that component.
    fn delta_components(
        &self,
    ) -> &[Option<Arc<dyn DeltaCostComponent<Self::Input, Self::State, Self::Move, Self::C>>>];

    /// A uniformly random move in the neighborhood.
    fn random_move<R: Rng>(&self, input: &Self::Input, state: &Self::State, rng: &mut R) -> Self::Move;

    /// The first move of a deterministic, reproducible enumeration.
    fn first_move(&self, input: &Self::Input, state: &Self::State) -> Option<Self::Move>;

    /// The move following `current` in the enumeration, or `None` at the end.
    fn next_move(
        &self,
        input: &Self::Input,
        state: &Self::State,
        current: &Self::Move,
    ) -> Option<Self::Move>;

    /// Mutates `state` to reflect `mv`. Must stay consistent with
    /// [`delta_cost`](Self::delta_cost): the full cost recomputed on the
    /// mutated state must equal `cost(state) + delta_cost(mv)` (mod
    /// floating tolerance).
    fn apply(&self, input: &Self::Input, state: &mut Self::State, mv: &Self::Move);

    /// Number of sub-neighborhoods for multi-neighborhood explorers (1
    /// for a simple, single neighborhood).
    fn modality(&self) -> usize {
        1
    }

    /// Sum over registered delta components of the cost change `mv`
    /// would induce, without materializing the post-state (except for
    /// components lacking an incremental evaluator).
    fn delta_cost(
        &self,
        input: &Self::Input,
        state: &Self::State,
        mv: &Self::Move,
        weights: Option<&[f64]>,
    ) -> CostStructure<Self::C> {
        let components = self.state_manager().components();
        let deltas = self.delta_components();

        let mut violations = Self::C::zero();
        let mut objective = Self::C::zero();
        let mut all_components = Vec::with_capacity(components.len());
        let mut weighted_sum = 0.0;
        let mut post_state_cache: Option<Self::State> = None;

        for (i, cc) in components.iter().enumerate() {
            let effective_weight = weights.and_then(|w| w.get(i).copied()).unwrap_or(cc.weight());
            let raw_delta = match deltas.get(i).and_then(|d| d.as_ref()) {
                Some(delta_cc) => delta_cc.delta(input, state, mv),
                None => {
                    let post_state = post_state_cache.get_or_insert_with(|| {
                        let mut cloned = state.clone();
                        self.apply(input, &mut cloned, mv);
                        cloned
                    });
                    cc.compute(input, post_state) - cc.compute(input, state)
                }
            };
            let weighted_delta = raw_delta.scale(effective_weight);
            all_components.push(weighted_delta);
            if cc.is_hard() {
                violations = violations + weighted_delta;
            } else {
                objective = objective + weighted_delta;
            }
            if weights.is_some() {
                weighted_sum += raw_delta.to_f64() * effective_weight;
            }
        }

        let mut cs = CostStructure::from_parts(violations, objective, all_components);
        if weights.is_some() {
            cs = cs.with_weighted(weighted_sum);
        }
        cs
    }

    /// Scans moves in enumeration order, returning the first whose
    /// evaluated cost is strictly improving and satisfies `predicate`.
    fn select_first<F>(
        &self,
        input: &Self::Input,
        state: &Self::State,
        predicate: F,
        weights: Option<&[f64]>,
    ) -> Result<(EvaluatedMove<Self::Move, Self::C>, usize)>
    where
        F: Fn(&Self::Move, &CostStructure<Self::C>) -> bool,
    {
        let mut explored = 0usize;
        let mut current = self.first_move(input, state);
        while let Some(mv) = current {
            explored += 1;
            let cost = self.delta_cost(input, state, &mv, weights);
            if is_improving(&cost) && predicate(&mv, &cost) {
                return Ok((EvaluatedMove::evaluated(mv, cost), explored));
            }
            current = self.next_move(input, state, &mv);
        }
        Err(Error::EmptyNeighborhood)
    }

    /// Scans the whole neighborhood, returning the evaluated move with
    /// smallest cost satisfying `predicate`. Among `k` equally-best
    /// moves the returned one is uniformly random (reservoir sampling).
    fn select_best<F, R>(
        &self,
        input: &Self::Input,
        state: &Self::State,
        predicate: F,
        weights: Option<&[f64]>,
        rng: &mut R,
    ) -> Result<(EvaluatedMove<Self::Move, Self::C>, usize)>
    where
        F: Fn(&Self::Move, &CostStructure<Self::C>) -> bool,
        R: Rng,
    {
        let mut explored = 0usize;
        let mut current = self.first_move(input, state);
        let mut best: Option<EvaluatedMove<Self::Move, Self::C>> = None;
        let mut ties = 0u64;

        while let Some(mv) = current {
            explored += 1;
            let cost = self.delta_cost(input, state, &mv, weights);
            if predicate(&mv, &cost) {
                best = reservoir_update(best, EvaluatedMove::evaluated(mv.clone(), cost), &mut ties, rng);
            }
            current = self.next_move(input, state, &mv);
        }

        best.map(|b| (b, explored)).ok_or(Error::EmptyNeighborhood)
    }

    /// Draws `samples` random moves and applies the same best-with-ties
    /// rule as [`select_best`](Self::select_best) to that sample.
    fn random_best<F, R>(
        &self,
        input: &Self::Input,
        state: &Self::State,
        samples: usize,
        predicate: F,
        weights: Option<&[f64]>,
        rng: &mut R,
    ) -> Result<(EvaluatedMove<Self::Move, Self::C>, usize)>
    where
        F: Fn(&Self::Move, &CostStructure<Self::C>) -> bool,
        R: Rng,
    {
        let mut sampled = 0usize;
        let mut best: Option<EvaluatedMove<Self::Move, Self::C>> = None;
        let mut ties = 0u64;

        for _ in 0..samples {
            let mv = self.random_move(input, state, rng);
            sampled += 1;
            let cost = self.delta_cost(input, state, &mv, weights);
            if predicate(&mv, &cost) {
                best = reservoir_update(best, EvaluatedMove::evaluated(mv, cost), &mut ties, rng);
            }
        }

        best.map(|b| (b, sampled)).ok_or(Error::EmptyNeighborhood)
    }
}

/// Reservoir tie-breaking: keep `candidate` if it's strictly better than
/// `current`, reset the tie counter; if equal, accept the `(ties+1)`-th
/// tie with probability `1/(ties+1)`; otherwise keep `current`.
pub(crate) fn reservoir_update<Mv, C: Scalar, R: Rng>(
    current: Option<EvaluatedMove<Mv, C>>,
    candidate: EvaluatedMove<Mv, C>,
    ties: &mut u64,
    rng: &mut R,
) -> Option<EvaluatedMove<Mv, C>> {
    match current {
        None => {
            *ties = 1;
            Some(candidate)
        }
        Some(cur) => {
            if candidate.cost < cur.cost {
                *ties = 1;
                Some(candidate)
            } else if candidate.cost == cur.cost {
                *ties += 1;
                if rng.random_range(0..*ties) == 0 {
                    Some(candidate)
                } else {
                    Some(cur)
                }
            } else {
                Some(cur)
            }
        }
    }
}
