//! Tabu search family (`spec.md` §4.6): basic, first-improvement, and
//! sampled neighborhood scans, all sharing one tabu list and aspiration
//! criterion.
//!
//! Unlike the hill-climbing/SA families this runner does not build on
//! [`NeighborhoodExplorer::select_best`]/`select_first`, which only ever
//! consider improving moves; tabu search must be able to step to a
//! worsening move when every admissible move worsens the current state,
//! so the scan is done directly against `first_move`/`next_move`/`random_move`.

use std::time::Duration;

use rand::Rng;

use super::{CancelToken, RunnerContext, RunnerResult};
use crate::core::cost::CostStructure;
use crate::core::neighborhood::{reservoir_update, EvaluatedMove, Move, NeighborhoodExplorer};
use crate::core::observer::{Event, Observer};
use crate::core::state::StateManager;
use crate::error::{Error, Result};
use crate::rng::create_rng;

/// Which neighborhood scan [`TabuSearchRunner`] performs each iteration.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionStrategy {
    /// Scans the whole neighborhood and moves to the best admissible move.
    Basic,
    /// Moves to the first admissible, improving move found; falls back
    /// to [`SelectionStrategy::Basic`] over the same scan if none improves.
    FirstImprovement,
    /// Draws a fixed number of random moves and keeps the best admissible one.
    Sample {
        /// Number of random moves to draw per iteration.
        size: usize,
    },
}

/// Configuration for [`TabuSearchRunner`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TabuConfig {
    /// Neighborhood scan strategy.
    pub strategy: SelectionStrategy,
    /// Lower bound of the tenure range a move's expiration is drawn
    /// uniformly from at insertion (`spec.md` §4.6/§6).
    pub min_tenure: usize,
    /// Upper bound of that tenure range.
    pub max_tenure: usize,
    /// Whether a tabu move is allowed through when it would beat the
    /// best state found so far.
    pub aspiration: bool,
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

impl Default for TabuConfig {
    fn default() -> Self {
        TabuConfig {
            strategy: SelectionStrategy::Basic,
            min_tenure: 5,
            max_tenure: 10,
            aspiration: true,
            max_iterations: 1000,
            max_idle_iterations: 200,
            max_duration: None,
            history_sample_interval: 100,
            seed: None,
        }
    }
}

impl TabuConfig {
    /// Sets the scan strategy.
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the tabu tenure range, drawn uniformly at each insertion.
    pub fn with_tenure_range(mut self, min_tenure: usize, max_tenure: usize) -> Self {
        self.min_tenure = min_tenure;
        self.max_tenure = max_tenure;
        self
    }

    /// Sets a fixed tabu tenure (`min_tenure == max_tenure == tenure`).
    pub fn with_tabu_tenure(mut self, tenure: usize) -> Self {
        self.min_tenure = tenure;
        self.max_tenure = tenure;
        self
    }

    /// Enables or disables the aspiration criterion.
    pub fn with_aspiration(mut self, aspiration: bool) -> Self {
        self.aspiration = aspiration;
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
        if self.min_tenure == 0 {
            return Err("min_tenure must be positive".into());
        }
        if self.min_tenure > self.max_tenure {
            return Err(format!(
                "min_tenure ({}) must not exceed max_tenure ({})",
                self.min_tenure, self.max_tenure
            ));
        }
        if let SelectionStrategy::Sample { size } = self.strategy {
            if size == 0 {
                return Err("sample size must be positive".into());
            }
        }
        Ok(())
    }
}

struct TabuList<Mv> {
    entries: Vec<(Mv, usize)>,
    min_tenure: usize,
    max_tenure: usize,
}

impl<Mv: Move> TabuList<Mv> {
    fn new(min_tenure: usize, max_tenure: usize) -> Self {
        TabuList {
            entries: Vec::new(),
            min_tenure,
            max_tenure,
        }
    }

    fn is_tabu(&self, mv: &Mv, iteration: usize) -> bool {
        self.entries
            .iter()
            .any(|(tabu_mv, expires_at)| *expires_at > iteration && tabu_mv.inverse(mv))
    }

    fn insert<R: Rng>(&mut self, mv: Mv, iteration: usize, rng: &mut R) {
        self.entries.retain(|(_, expires_at)| *expires_at > iteration);
        let tenure = if self.min_tenure == self.max_tenure {
            self.min_tenure
        } else {
            rng.random_range(self.min_tenure..=self.max_tenure)
        };
        self.entries.push((mv, iteration + tenure));
    }
}

/// Executes the tabu search family.
pub struct TabuSearchRunner;

impl TabuSearchRunner {
    /// Runs to completion (no external cancellation).
    pub fn run<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &TabuConfig,
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
        config: &TabuConfig,
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
        config: &TabuConfig,
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
        config: &TabuConfig,
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
        config: &TabuConfig,
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
        config: &TabuConfig,
        cancel: CancelToken,
        observers: &[&dyn Observer],
    ) -> Result<RunnerResult<SM::State, SM::C>>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        config.validate().map_err(|reason| Error::incorrect("strategy", reason))?;
        crate::core::observer::notify_all(observers, Event::Start);

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let initial_cost = sm.cost(input, &start, None);
        let mut ctx = RunnerContext::new(
            start,
            initial_cost,
            config.history_sample_interval,
            cancel,
            config.max_duration,
        );

        let mut tabu = TabuList::<NE::Move>::new(config.min_tenure, config.max_tenure);
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

            let best_before = ctx.best_cost().clone();
            let found = match config.strategy {
                SelectionStrategy::Basic => scan_best(ne, input, &ctx, &tabu, config.aspiration, &mut rng),
                SelectionStrategy::FirstImprovement => {
                    match scan_first_improving(ne, input, &ctx, &tabu, config.aspiration) {
                        Some(found) => Some(found),
                        None => scan_best(ne, input, &ctx, &tabu, config.aspiration, &mut rng),
                    }
                }
                SelectionStrategy::Sample { size } => {
                    scan_sample(ne, input, &ctx, &tabu, config.aspiration, size, &mut rng)
                }
            };

            match found {
                Some((mv, cost)) => {
                    ctx.count_evaluation();
                    let mut next_state = ctx.current().clone();
                    ne.apply(input, &mut next_state, &mv);
                    let next_cost = ctx.current_cost().clone() + cost;
                    tabu.insert(mv, ctx.iteration(), &mut rng);
                    ctx.move_to_observed(next_state, next_cost, observers);
                }
                None => break,
            }

            if *ctx.best_cost() < best_before {
                idle = 0;
            } else {
                idle += 1;
            }
            ctx.advance_iteration();
        }

        let cancelled = ctx.was_cancelled();
        crate::core::observer::notify_all(observers, Event::End);
        Ok(ctx.finish(cancelled))
    }
}

/// A single candidate's admissibility: not tabu, or tabu but passing
/// aspiration (would improve on the best state found so far).
fn admissible<SM: StateManager>(
    current_cost: &CostStructure<SM::C>,
    best_cost: &CostStructure<SM::C>,
    delta: &CostStructure<SM::C>,
    is_tabu: bool,
    aspiration_enabled: bool,
) -> bool {
    if !is_tabu {
        return true;
    }
    aspiration_enabled && (current_cost.clone() + delta.clone()) < *best_cost
}

fn scan_best<SM, NE, R: Rng>(
    ne: &NE,
    input: &SM::Input,
    ctx: &RunnerContext<SM::State, SM::C>,
    tabu: &TabuList<NE::Move>,
    aspiration: bool,
    rng: &mut R,
) -> Option<(NE::Move, CostStructure<SM::C>)>
where
    SM: StateManager,
    NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
{
    let mut best: Option<EvaluatedMove<NE::Move, SM::C>> = None;
    let mut ties = 0u64;
    let mut current = ne.first_move(input, ctx.current());
    while let Some(mv) = current {
        let delta = ne.delta_cost(input, ctx.current(), &mv, None);
        let is_tabu = tabu.is_tabu(&mv, ctx.iteration());
        if admissible::<SM>(ctx.current_cost(), ctx.best_cost(), &delta, is_tabu, aspiration) {
            best = reservoir_update(best, EvaluatedMove::evaluated(mv.clone(), delta), &mut ties, rng);
        }
        current = ne.next_move(input, ctx.current(), &mv);
    }
    best.map(|em| (em.mv, em.cost))
}

fn scan_first_improving<SM, NE>(
    ne: &NE,
    input: &SM::Input,
    ctx: &RunnerContext<SM::State, SM::C>,
    tabu: &TabuList<NE::Move>,
    aspiration: bool,
) -> Option<(NE::Move, CostStructure<SM::C>)>
where
    SM: StateManager,
    NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
{
    let mut current = ne.first_move(input, ctx.current());
    while let Some(mv) = current {
        let delta = ne.delta_cost(input, ctx.current(), &mv, None);
        let is_tabu = tabu.is_tabu(&mv, ctx.iteration());
        if delta.governing() < 0.0
            && admissible::<SM>(ctx.current_cost(), ctx.best_cost(), &delta, is_tabu, aspiration)
        {
            return Some((mv, delta));
        }
        current = ne.next_move(input, ctx.current(), &mv);
    }
    None
}

fn scan_sample<SM, NE, R: Rng>(
    ne: &NE,
    input: &SM::Input,
    ctx: &RunnerContext<SM::State, SM::C>,
    tabu: &TabuList<NE::Move>,
    aspiration: bool,
    size: usize,
    rng: &mut R,
) -> Option<(NE::Move, CostStructure<SM::C>)>
where
    SM: StateManager,
    NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
{
    let mut best: Option<EvaluatedMove<NE::Move, SM::C>> = None;
    let mut ties = 0u64;
    for _ in 0..size {
        let mv = ne.random_move(input, ctx.current(), rng);
        let delta = ne.delta_cost(input, ctx.current(), &mv, None);
        let is_tabu = tabu.is_tabu(&mv, ctx.iteration());
        if admissible::<SM>(ctx.current_cost(), ctx.best_cost(), &delta, is_tabu, aspiration) {
            best = reservoir_update(best, EvaluatedMove::evaluated(mv.clone(), delta), &mut ties, rng);
        }
    }
    best.map(|em| (em.mv, em.cost))
}
