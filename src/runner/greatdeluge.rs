//! Great deluge (`spec.md` §4.7): accepts any move that keeps the
//! current cost under a slowly-falling water level.

use std::time::Duration;

use rand::Rng;

use super::{CancelToken, RunnerContext, RunnerResult};
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::observer::{Event, Observer};
use crate::core::state::StateManager;
use crate::error::{Error, Result};
use crate::rng::create_rng;

/// Configuration for [`GreatDelugeRunner`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GreatDelugeConfig {
    /// Initial water level as a multiple of the initial state's cost
    /// (e.g. `1.2` starts 20% above the initial cost).
    pub initial_level_factor: f64,
    /// The level drops by `decay_rate * (level - final_level_floor)`
    /// each iteration (a fixed fraction of the remaining headroom).
    pub decay_rate: f64,
    /// The level never drops below this absolute value.
    pub final_level_floor: f64,
    /// Maximum total iterations. `0` = unbounded.
    pub max_iterations: usize,
    /// Maximum consecutive iterations without a new best. `0` = unbounded.
    pub max_idle_iterations: usize,
    /// Wall-clock budget.
    pub max_duration: Option<Duration>,
    /// Cost-history sampling interval.
    pub history_sample_interval: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for GreatDelugeConfig {
    fn default() -> Self {
        GreatDelugeConfig {
            initial_level_factor: 1.2,
            decay_rate: 0.01,
            final_level_floor: 0.0,
            max_iterations: 0,
            max_idle_iterations: 5000,
            max_duration: None,
            history_sample_interval: 100,
            seed: None,
        }
    }
}

impl GreatDelugeConfig {
    /// Sets the initial level factor.
    pub fn with_initial_level_factor(mut self, factor: f64) -> Self {
        self.initial_level_factor = factor;
        self
    }

    /// Sets the per-iteration decay rate.
    pub fn with_decay_rate(mut self, rate: f64) -> Self {
        self.decay_rate = rate;
        self
    }

    /// Sets the level floor.
    pub fn with_final_level_floor(mut self, floor: f64) -> Self {
        self.final_level_floor = floor;
        self
    }

    /// Sets the hard iteration cap.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the idle-iteration cap.
    pub fn with_max_idle_iterations(mut self, n: usize) -> Self {
        self.max_idle_iterations = n;
        self
    }

    /// Sets a wall-clock budget.
    pub fn with_max_duration(mut self, d: Duration) -> Self {
        self.max_duration = Some(d);
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.initial_level_factor < 1.0 {
            return Err("initial_level_factor must be at least 1.0".into());
        }
        if !(0.0..1.0).contains(&self.decay_rate) {
            return Err("decay_rate must be in [0, 1)".into());
        }
        Ok(())
    }
}

/// Executes the great deluge algorithm.
pub struct GreatDelugeRunner;

impl GreatDelugeRunner {
    /// Runs to completion (no external cancellation).
    pub fn run<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &GreatDelugeConfig,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_with_cancel(sm, ne, input, config, CancelToken::none())
    }

    /// Runs with an external cancellation token.
    pub fn run_with_cancel<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &GreatDelugeConfig,
        cancel: CancelToken,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_with_observers(sm, ne, input, config, cancel, &[])
    }

    /// Runs with an external cancellation token, notifying `observers`
    /// of `START`/`STORE_MOVE`/`NEW_BEST`/`END` as the run progresses
    /// (`spec.md` §6).
    pub fn run_with_observers<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &GreatDelugeConfig,
        cancel: CancelToken,
        observers: &[&dyn Observer],
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        let initial_state = sm.random_state(input, &mut rng);
        Self::run_from_with_observers(sm, ne, input, initial_state, config, cancel, observers)
    }

    /// Runs to completion from a caller-supplied starting state
    /// (`spec.md` §4.3's `go(in, start)`), rather than drawing one via
    /// [`StateManager::random_state`]. Used to hand off state between
    /// runners (token-ring) or to improve a greedily constructed state
    /// (GRASP).
    pub fn run_from<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &GreatDelugeConfig,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_from_with_cancel(sm, ne, input, start, config, CancelToken::none())
    }

    /// [`Self::run_from`] with an external cancellation token.
    pub fn run_from_with_cancel<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &GreatDelugeConfig,
        cancel: CancelToken,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_from_with_observers(sm, ne, input, start, config, cancel, &[])
    }

    /// [`Self::run_from`] with an external cancellation token and observers.
    pub fn run_from_with_observers<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &GreatDelugeConfig,
        cancel: CancelToken,
        observers: &[&dyn Observer],
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        config
            .validate()
            .map_err(|reason| Error::incorrect("decay_rate", reason))?;
        crate::core::observer::notify_all(observers, Event::Start);

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let initial_cost = sm.cost(input, &start, None);
        let mut level = (initial_cost.governing() * config.initial_level_factor)
            .max(config.final_level_floor)
            .max(initial_cost.governing());

        let mut ctx = RunnerContext::new(
            start,
            initial_cost,
            config.history_sample_interval,
            cancel,
            config.max_duration,
        );

        let mut idle = 0usize;

        loop {
            if ctx.should_stop() {
                break;
            }
            if config.max_iterations > 0 && ctx.iteration() >= config.max_iterations {
                break;
            }
            if config.max_idle_iterations > 0 && idle >= config.max_idle_iterations {
                break;
            }

            let mv = ne.random_move(input, ctx.current(), &mut rng);
            ctx.count_evaluation();
            let delta = ne.delta_cost(input, ctx.current(), &mv, None);
            let candidate_level = ctx.current_cost().governing() + delta.governing();

            if candidate_level <= level {
                let mut next_state = ctx.current().clone();
                ne.apply(input, &mut next_state, &mv);
                let next_cost = ctx.current_cost().clone() + delta;
                let improved = next_cost < *ctx.best_cost();
                ctx.move_to_observed(next_state, next_cost, observers);
                idle = if improved { 0 } else { idle + 1 };
            } else {
                idle += 1;
            }

            level = (level - config.decay_rate * (level - config.final_level_floor).max(0.0))
                .max(config.final_level_floor);

            ctx.advance_iteration();
        }

        let cancelled = ctx.was_cancelled();
        crate::core::observer::notify_all(observers, Event::End);
        Ok(ctx.finish(cancelled))
    }
}
