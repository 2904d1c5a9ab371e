//! Simulated annealing family (`spec.md` §4.5).
//!
//! One runner covers the basic/min-temperature, evaluation-based,
//! time-based, with-reheating, with-shifting-penalty, and with-learning
//! variants of the original source's `SimulatedAnnealing*` hierarchy:
//! each is a combination of [`SaConfig`] fields rather than a distinct
//! type, since they differ only in their stopping rule, their
//! temperature schedule, or how they weight cost components — not in
//! the acceptance criterion itself.

use std::time::Duration;

use rand::Rng;

use super::{CancelToken, RunnerContext, RunnerResult};
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::observer::{Event, Observer};
use crate::core::state::StateManager;
use crate::error::{Error, Result};
use crate::rng::create_rng;

/// Temperature schedule. See the source's cooling-schedule survey.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// `T_{k+1} = alpha * T_k`. Typical `alpha`: 0.95-0.99.
    Geometric {
        /// Cooling factor in `(0, 1)`.
        alpha: f64,
    },
    /// `T_k = T_0 - k * (T_0 - T_min) / max_steps`, fixed duration.
    Linear,
    /// `T_{k+1} = T_k / (1 + beta * T_k)` (Lundy & Mees 1986).
    LundyMees {
        /// Cooling parameter, typically `(T0-Tmin)/(max_iter*T0*Tmin)`.
        beta: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.95 }
    }
}

/// Configuration for [`SimulatedAnnealingRunner`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaConfig {
    /// Initial temperature. Ignored when `learning` estimates it.
    pub initial_temperature: f64,
    /// Temperature below which the run stops (the "min-temperature" variant).
    pub min_temperature: f64,
    /// Temperature schedule.
    pub cooling: CoolingSchedule,
    /// Iterations per temperature level (ignored for `LundyMees`, which
    /// cools every iteration).
    pub iterations_per_temperature: usize,
    /// Hard cap on temperature steps. `0` = unbounded.
    pub max_iterations: usize,
    /// Hard cap on move evaluations, the "evaluation-based" stopping
    /// rule. `0` = unbounded.
    pub max_evaluations: usize,
    /// Wall-clock budget, the "time-based" stopping rule.
    pub max_duration: Option<Duration>,
    /// Reheat to `initial_temperature * reheat_factor` after this many
    /// consecutive temperature steps with no new best ("with-reheating").
    /// `None` disables reheating.
    pub reheat_after_idle_steps: Option<usize>,
    /// Multiplier applied to `initial_temperature` on reheat.
    pub reheat_factor: f64,
    /// Progressively scales up hard-component weights while the current
    /// state stays infeasible, pushing the search back towards
    /// feasibility ("with-shifting-penalty").
    pub shifting_penalty: bool,
    /// Growth rate applied to the hard-component weight multiplier per
    /// temperature step while infeasible.
    pub shifting_penalty_rate: f64,
    /// Estimates `initial_temperature` from a short random sample of
    /// uphill move magnitudes rather than trusting the configured value
    /// ("with-learning").
    pub learning: bool,
    /// Target initial acceptance probability used by `learning`.
    pub learning_target_acceptance: f64,
    /// Cost-history sampling interval.
    pub history_sample_interval: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        SaConfig {
            initial_temperature: 100.0,
            min_temperature: 1e-6,
            cooling: CoolingSchedule::default(),
            iterations_per_temperature: 100,
            max_iterations: 0,
            max_evaluations: 0,
            max_duration: None,
            reheat_after_idle_steps: None,
            reheat_factor: 2.0,
            shifting_penalty: false,
            shifting_penalty_rate: 1.1,
            learning: false,
            learning_target_acceptance: 0.8,
            history_sample_interval: 100,
            seed: None,
        }
    }
}

impl SaConfig {
    /// Sets the initial temperature.
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    /// Sets the minimum temperature.
    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    /// Sets the cooling schedule.
    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    /// Sets iterations per temperature level.
    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    /// Sets the hard iteration cap.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the hard evaluation cap.
    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.max_evaluations = n;
        self
    }

    /// Sets a wall-clock budget.
    pub fn with_max_duration(mut self, d: Duration) -> Self {
        self.max_duration = Some(d);
        self
    }

    /// Enables reheating after `idle_steps` stagnant temperature levels.
    pub fn with_reheating(mut self, idle_steps: usize, factor: f64) -> Self {
        self.reheat_after_idle_steps = Some(idle_steps);
        self.reheat_factor = factor;
        self
    }

    /// Enables the shifting-penalty weighting.
    pub fn with_shifting_penalty(mut self, rate: f64) -> Self {
        self.shifting_penalty = true;
        self.shifting_penalty_rate = rate;
        self
    }

    /// Enables learned initial-temperature estimation.
    pub fn with_learning(mut self, target_acceptance: f64) -> Self {
        self.learning = true;
        self.learning_target_acceptance = target_acceptance;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.initial_temperature <= 0.0 {
            return Err("initial_temperature must be positive".into());
        }
        if self.min_temperature <= 0.0 {
            return Err("min_temperature must be positive".into());
        }
        if self.min_temperature >= self.initial_temperature {
            return Err("min_temperature must be less than initial_temperature".into());
        }
        if let CoolingSchedule::Geometric { alpha } = self.cooling {
            if alpha <= 0.0 || alpha >= 1.0 {
                return Err(format!("geometric alpha must be in (0, 1), got {alpha}"));
            }
        }
        if let CoolingSchedule::LundyMees { beta } = self.cooling {
            if beta <= 0.0 {
                return Err("lundy-mees beta must be positive".into());
            }
        }
        Ok(())
    }
}

/// Executes the simulated annealing family.
pub struct SimulatedAnnealingRunner;

impl SimulatedAnnealingRunner {
    /// Runs to completion (no external cancellation).
    pub fn run<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &SaConfig,
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
        config: &SaConfig,
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
    /// (`spec.md` §6). Starts from a fresh `StateManager::random_state`.
    pub fn run_with_observers<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &SaConfig,
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

    /// Runs to completion from a caller-supplied `start` state rather
    /// than constructing one via `random_state` (`spec.md` §4.3's
    /// `go(in, start)`; the hand-off a token-ring or GRASP solver needs).
    pub fn run_from<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &SaConfig,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_from_with_cancel(sm, ne, input, start, config, CancelToken::none())
    }

    /// Runs from `start` with an external cancellation token.
    pub fn run_from_with_cancel<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &SaConfig,
        cancel: CancelToken,
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        Self::run_from_with_observers(sm, ne, input, start, config, cancel, &[])
    }

    /// Runs from `start` with an external cancellation token, notifying
    /// `observers` of `START`/`STORE_MOVE`/`NEW_BEST`/`END`.
    pub fn run_from_with_observers<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        start: SM::State,
        config: &SaConfig,
        cancel: CancelToken,
        observers: &[&dyn Observer],
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        config.validate().map_err(|reason| Error::incorrect("cooling", reason))?;
        crate::core::observer::notify_all(observers, Event::Start);

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        // Only the shifting-penalty variant replaces `total`'s fixed
        // `HARD_WEIGHT` scaling with a per-component weighted scalar;
        // every other variant lets the governing cost be `total`, so
        // Metropolis sees the full hard-violation weight (`spec.md`
        // §4.5, §8 property 6).
        let mut weights: Vec<f64> = if config.shifting_penalty {
            sm.components().iter().map(|cc| cc.weight()).collect()
        } else {
            Vec::new()
        };
        let initial_cost = sm.cost(input, &start, active_weights(config.shifting_penalty, &weights));

        let mut temperature = if config.learning {
            estimate_initial_temperature(sm, ne, input, &start, &weights, config, &mut rng)
        } else {
            config.initial_temperature
        };

        let mut ctx = RunnerContext::new(
            start,
            initial_cost,
            config.history_sample_interval,
            cancel,
            config.max_duration,
        );

        let linear_steps = compute_linear_steps(config);
        let mut step = 0usize;
        let mut idle_steps = 0usize;

        loop {
            if ctx.should_stop() {
                break;
            }
            if config.max_iterations > 0 && ctx.iteration() >= config.max_iterations {
                break;
            }
            if config.max_evaluations > 0 && ctx.evaluations() >= config.max_evaluations {
                break;
            }
            if temperature <= config.min_temperature {
                break;
            }

            let inner_iters = match config.cooling {
                CoolingSchedule::LundyMees { .. } => 1,
                _ => config.iterations_per_temperature,
            };

            let best_before_step = ctx.best_cost().governing();

            for _ in 0..inner_iters {
                if ctx.should_stop() {
                    break;
                }
                if config.max_evaluations > 0 && ctx.evaluations() >= config.max_evaluations {
                    break;
                }

                if config.shifting_penalty {
                    update_shifting_weights(sm, ctx.current(), input, &mut weights, config);
                }
                let weights_ref = active_weights(config.shifting_penalty, &weights);

                let mv = ne.random_move(input, ctx.current(), &mut rng);
                ctx.count_evaluation();
                let delta = ne.delta_cost(input, ctx.current(), &mv, weights_ref);

                let accept = if delta.governing() < 0.0 {
                    true
                } else if temperature > 0.0 {
                    let probability = (-delta.governing() / temperature).exp();
                    rng.random_range(0.0..1.0) < probability
                } else {
                    false
                };

                if accept {
                    let mut next_state = ctx.current().clone();
                    ne.apply(input, &mut next_state, &mv);
                    let next_cost = ctx.current_cost().clone() + delta;
                    ctx.move_to_observed(next_state, next_cost, observers);
                }

                ctx.advance_iteration();
            }

            if ctx.best_cost().governing() < best_before_step {
                idle_steps = 0;
            } else {
                idle_steps += 1;
            }

            if let Some(threshold) = config.reheat_after_idle_steps {
                if idle_steps >= threshold {
                    temperature = config.initial_temperature * config.reheat_factor;
                    idle_steps = 0;
                    step = 0;
                    continue;
                }
            }

            temperature = cool(temperature, config, step, linear_steps);
            step += 1;
        }

        let cancelled = ctx.was_cancelled();
        crate::core::observer::notify_all(observers, Event::End);
        Ok(ctx.finish(cancelled))
    }
}

/// `Some(weights)` only when the shifting-penalty variant is enabled;
/// every other SA variant lets `cost`/`delta_cost` fall back to `total`
/// (`HARD_WEIGHT * violations + objective`) as the governing scalar.
fn active_weights(shifting_penalty: bool, weights: &[f64]) -> Option<&[f64]> {
    if shifting_penalty && !weights.is_empty() {
        Some(weights)
    } else {
        None
    }
}

fn cool(temperature: f64, config: &SaConfig, step: usize, linear_steps: usize) -> f64 {
    match config.cooling {
        CoolingSchedule::Geometric { alpha } => temperature * alpha,
        CoolingSchedule::Linear => {
            if linear_steps == 0 {
                config.min_temperature
            } else {
                let t = config.initial_temperature
                    - (step + 1) as f64 * (config.initial_temperature - config.min_temperature) / linear_steps as f64;
                t.max(config.min_temperature)
            }
        }
        CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
    }
}

fn compute_linear_steps(config: &SaConfig) -> usize {
    match config.cooling {
        CoolingSchedule::Linear => {
            if config.max_iterations > 0 && config.iterations_per_temperature > 0 {
                config.max_iterations / config.iterations_per_temperature
            } else {
                1000
            }
        }
        _ => 0,
    }
}

/// Samples a handful of random moves from `state` and picks `T0` so
/// that an average uphill move is accepted with roughly
/// `learning_target_acceptance` probability under the Metropolis rule:
/// `T0 = -mean(uphill_delta) / ln(target_acceptance)`.
fn estimate_initial_temperature<SM, NE, R: Rng>(
    _sm: &SM,
    ne: &NE,
    input: &SM::Input,
    state: &SM::State,
    weights: &[f64],
    config: &SaConfig,
    rng: &mut R,
) -> f64
where
    SM: StateManager,
    NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
{
    const SAMPLES: usize = 30;
    let weights_ref = if weights.is_empty() { None } else { Some(weights) };
    let mut uphill_sum = 0.0;
    let mut uphill_count = 0usize;
    for _ in 0..SAMPLES {
        let mv = ne.random_move(input, state, rng);
        let delta = ne.delta_cost(input, state, &mv, weights_ref).governing();
        if delta > 0.0 {
            uphill_sum += delta;
            uphill_count += 1;
        }
    }
    if uphill_count == 0 {
        return config.initial_temperature;
    }
    let mean_uphill = uphill_sum / uphill_count as f64;
    let target = config.learning_target_acceptance.clamp(1e-6, 1.0 - 1e-6);
    (-mean_uphill / target.ln()).max(config.min_temperature * 2.0)
}

/// Scales hard-component weights up while the current state remains
/// infeasible, resetting them to each component's own configured weight
/// once feasibility is restored.
fn update_shifting_weights<SM>(sm: &SM, state: &SM::State, input: &SM::Input, weights: &mut [f64], config: &SaConfig)
where
    SM: StateManager,
{
    let cost = sm.cost(input, state, None);
    let infeasible = cost.violations.to_f64() != 0.0;
    for (i, cc) in sm.components().iter().enumerate() {
        if cc.is_hard() {
            if infeasible {
                weights[i] *= config.shifting_penalty_rate;
            } else {
                weights[i] = cc.weight();
            }
        }
    }
}
