//! State Manager: state-level operations independent of any neighborhood.
//!
//! See `spec.md` §4.1. A `StateManager` owns the [`ComponentRegistry`]
//! (`spec.md` §3's "Cost components are owned by the user-supplied
//! problem module; the framework holds non-owning references registered
//! at setup") and knows how to construct and evaluate states; it knows
//! nothing about moves or neighborhoods.

use rand::Rng;

use crate::core::cftype::Scalar;
use crate::core::cost::{ComponentRegistry, CostStructure};
use crate::error::{Error, Result};

/// State-level operations a problem module provides to the search core.
///
/// Type parameters are fixed by the implementor: `Input` is the opaque
/// problem instance, `State` an element of the search space, `C` the
/// cost scalar (`spec.md` §3).
pub trait StateManager: Send + Sync {
    /// The opaque problem instance type.
    type Input;
    /// The opaque state (solution) type.
    type State: Clone;
    /// The cost scalar (`CFtype`).
    type C: Scalar;

    /// The registry of cost components this manager was set up with.
    fn components(&self) -> &ComponentRegistry<Self::Input, Self::State, Self::C>;

    /// Produces a valid initial state. User-defined; must be consistent
    /// (i.e. satisfy [`check_consistency`](Self::check_consistency)).
    fn random_state<R: Rng>(&self, input: &Self::Input, rng: &mut R) -> Self::State;

    /// Produces `k` independent random states and returns the one with
    /// the smallest [`CostStructure`], ties broken by first-seen.
    fn sample_state<R: Rng>(
        &self,
        input: &Self::Input,
        k: usize,
        rng: &mut R,
    ) -> (Self::State, CostStructure<Self::C>) {
        assert!(k > 0, "sample_state requires at least one sample");
        let mut best_state = self.random_state(input, rng);
        let mut best_cost = self.cost(input, &best_state, None);
        for _ in 1..k {
            let candidate = self.random_state(input, rng);
            let candidate_cost = self.cost(input, &candidate, None);
            if candidate_cost < best_cost {
                best_state = candidate;
                best_cost = candidate_cost;
            }
        }
        (best_state, best_cost)
    }

    /// GRASP-style greedy construction controlled by an RCL threshold
    /// `alpha` and/or a fixed RCL size `k`. Defaults to
    /// [`Error::NotImplemented`], per `spec.md` §4.1.
    fn greedy_state<R: Rng>(
        &self,
        _input: &Self::Input,
        _alpha: f64,
        _k: usize,
        _rng: &mut R,
    ) -> Result<Self::State> {
        Err(Error::not_implemented("greedy_state"))
    }

    /// Aggregates every registered component's cost into a
    /// [`CostStructure`]. If `weights` is present, fills `weighted` and
    /// sets `is_weighted = true`.
    fn cost(
        &self,
        input: &Self::Input,
        state: &Self::State,
        weights: Option<&[f64]>,
    ) -> CostStructure<Self::C> {
        self.components().cost(input, state, weights)
    }

    /// `true` iff `cs` has reached the lower bound. Default: `cs == 0`.
    fn lower_bound_reached(&self, cs: &CostStructure<Self::C>) -> bool {
        cs.is_zero()
    }

    /// `lower_bound_reached(cost(input, state))`.
    fn optimal_state_reached(&self, input: &Self::Input, state: &Self::State) -> bool {
        self.lower_bound_reached(&self.cost(input, state, None))
    }

    /// User-defined distance metric (e.g. Hamming distance) between two
    /// states. Used only by observers. Defaults to
    /// [`Error::NotImplemented`].
    fn state_distance(&self, _input: &Self::Input, _a: &Self::State, _b: &Self::State) -> Result<u64> {
        Err(Error::not_implemented("state_distance"))
    }

    /// User-defined consistency check, used by tests.
    fn check_consistency(&self, input: &Self::Input, state: &Self::State) -> bool;
}
