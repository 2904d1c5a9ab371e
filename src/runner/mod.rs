//! Local-search runners: the hill-climbing, simulated-annealing, tabu
//! search, and great deluge algorithm families (`spec.md` §4.3–§4.7).
//!
//! Every family follows the same state machine (`spec.md` §4.3's
//! "initialize, repeat {select move, decide acceptance, apply, update
//! best, check termination}, finalize"); [`RunnerContext`] is the shared
//! bookkeeping every family's `run`/`run_with_cancel` pair drives.

pub mod greatdeluge;
pub mod hc;
pub mod sa;
pub mod tabu;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::cftype::Scalar;
use crate::core::cost::CostStructure;
use crate::core::observer::{notify_all, Event, Observer};

/// Statistics and the best state found by a runner's `run`.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "State: serde::Serialize, C: serde::Serialize",
        deserialize = "State: serde::Deserialize<'de>, C: serde::Deserialize<'de>"
    ))
)]
pub struct RunnerResult<State: Clone, C: Scalar> {
    /// The best state found.
    pub best: State,
    /// Cost of `best`.
    pub best_cost: CostStructure<C>,
    /// Total number of iterations executed.
    pub iterations: usize,
    /// Iteration at which `best` was found.
    pub iteration_of_best: usize,
    /// Total number of move evaluations (may exceed `iterations` when a
    /// runner samples or scans more than one move per iteration).
    pub evaluations: usize,
    /// Whether the run ended via external cancellation or a deadline,
    /// rather than converging or exhausting its own budget.
    pub cancelled: bool,
    /// Best cost sampled at regular intervals, oldest first.
    pub cost_history: Vec<f64>,
}

/// An external stop signal a long-running search polls between iterations.
#[derive(Clone, Default)]
pub struct CancelToken(Option<Arc<AtomicBool>>);

impl CancelToken {
    /// A token that never signals cancellation.
    pub fn none() -> Self {
        CancelToken(None)
    }

    /// Wraps a shared flag a caller can flip from another thread.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        CancelToken(Some(flag))
    }

    /// `true` iff the wrapped flag (if any) is set.
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
    }
}

/// Shared iteration bookkeeping every runner family drives: current and
/// best state/cost, iteration and evaluation counters, periodic cost
/// history sampling, and the external cancellation/deadline checks.
pub struct RunnerContext<State: Clone, C: Scalar> {
    current_state: State,
    current_cost: CostStructure<C>,
    best_state: State,
    best_cost: CostStructure<C>,
    iteration: usize,
    iteration_of_best: usize,
    evaluations: usize,
    history_interval: usize,
    cost_history: Vec<f64>,
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl<State: Clone, C: Scalar> RunnerContext<State, C> {
    /// Starts a run from `initial_state` at `initial_cost`.
    pub fn new(
        initial_state: State,
        initial_cost: CostStructure<C>,
        history_interval: usize,
        cancel: CancelToken,
        max_duration: Option<Duration>,
    ) -> Self {
        let mut cost_history = Vec::new();
        cost_history.push(initial_cost.governing());
        RunnerContext {
            current_state: initial_state.clone(),
            current_cost: initial_cost.clone(),
            best_state: initial_state,
            best_cost: initial_cost,
            iteration: 0,
            iteration_of_best: 0,
            evaluations: 0,
            history_interval: history_interval.max(1),
            cost_history,
            cancel,
            deadline: max_duration.map(|d| Instant::now() + d),
        }
    }

    /// The current state.
    pub fn current(&self) -> &State {
        &self.current_state
    }

    /// The current state's cost.
    pub fn current_cost(&self) -> &CostStructure<C> {
        &self.current_cost
    }

    /// The best cost found so far.
    pub fn best_cost(&self) -> &CostStructure<C> {
        &self.best_cost
    }

    /// How many iterations have elapsed.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// How many move evaluations have been counted.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Replaces the current state/cost (e.g. after accepting a move),
    /// updating `best` if this is a strict improvement.
    pub fn move_to(&mut self, state: State, cost: CostStructure<C>) {
        self.current_state = state;
        self.current_cost = cost.clone();
        if cost < self.best_cost {
            self.best_state = self.current_state.clone();
            self.best_cost = cost;
            self.iteration_of_best = self.iteration;
        }
    }

    /// Like [`move_to`](Self::move_to), additionally notifying `observers`
    /// of `STORE_MOVE` and, when the move improves on `best`, `NEW_BEST`
    /// (`spec.md` §6).
    pub fn move_to_observed(
        &mut self,
        state: State,
        cost: CostStructure<C>,
        observers: &[&dyn Observer],
    ) {
        self.move_to(state, cost);
        notify_all(observers, Event::StoreMove);
        if self.iteration_of_best == self.iteration {
            notify_all(observers, Event::NewBest);
        }
    }

    /// Counts one neighborhood exploration/evaluation.
    pub fn count_evaluation(&mut self) {
        self.evaluations += 1;
    }

    /// Counts one completed iteration and samples cost history at
    /// `history_interval`.
    pub fn advance_iteration(&mut self) {
        self.iteration += 1;
        if self.iteration.is_multiple_of(self.history_interval) {
            self.cost_history.push(self.best_cost.governing());
        }
    }

    /// `true` iff cancellation was requested or the deadline passed.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `true` iff cancellation (not a deadline) was the stop reason.
    pub fn was_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Finalizes bookkeeping into a [`RunnerResult`].
    pub fn finish(mut self, cancelled: bool) -> RunnerResult<State, C> {
        if self
            .cost_history
            .last()
            .is_none_or(|&last| (last - self.best_cost.governing()).abs() > 1e-12)
        {
            self.cost_history.push(self.best_cost.governing());
        }
        RunnerResult {
            best: self.best_state,
            best_cost: self.best_cost,
            iterations: self.iteration,
            iteration_of_best: self.iteration_of_best,
            evaluations: self.evaluations,
            cancelled,
            cost_history: self.cost_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(total: i64) -> CostStructure<i64> {
        CostStructure::from_parts(0, total, vec![total])
    }

    #[test]
    fn move_to_updates_best_only_on_improvement() {
        let mut ctx = RunnerContext::new(0i64, cs(10), 1, CancelToken::none(), None);
        ctx.move_to(1, cs(12));
        assert_eq!(*ctx.best_cost(), cs(10));
        ctx.move_to(2, cs(4));
        assert_eq!(*ctx.best_cost(), cs(4));
        assert_eq!(ctx.iteration_of_best, 0);
    }

    #[test]
    fn cancel_token_reflects_external_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let token = CancelToken::from_flag(flag.clone());
        assert!(!token.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(token.is_cancelled());
    }

    #[test]
    fn finish_appends_final_history_point_when_missing() {
        let mut ctx = RunnerContext::new(0i64, cs(10), 1000, CancelToken::none(), None);
        ctx.move_to(1, cs(3));
        let result = ctx.finish(false);
        assert_eq!(*result.cost_history.last().unwrap(), 3.0);
    }
}
