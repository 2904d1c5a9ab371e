//! Hill-climbing family: steepest descent, first descent, and late
//! acceptance hill climbing (`spec.md` §4.4).

use std::time::Duration;

use rand::Rng;

use super::{CancelToken, RunnerContext, RunnerResult};
use crate::core::cost::{is_improving, is_non_worsening};
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::observer::{Event, Observer};
use crate::core::state::StateManager;
use crate::error::{Error, Result};
use crate::rng::create_rng;

/// Which local-optimum search strategy [`HillClimbingRunner`] executes.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// Scans the whole neighborhood each iteration and moves to the best
    /// move found; stops at the first state with no improving move.
    SteepestDescent,
    /// Moves to the first improving move found in enumeration order;
    /// stops at the first state with no improving move.
    FirstDescent,
    /// Draws one random move per iteration and accepts it whenever it
    /// does not worsen the current cost (`spec.md` §4.4's plain "Hill
    /// Climbing": `random_move` / `move.cost <= 0`); stops after
    /// `max_idle_iterations` consecutive non-improving iterations
    /// rather than at the first local optimum, since a random scan
    /// never certifies one.
    HillClimbing,
    /// Accepts a random move whenever it does not worsen on the cost
    /// seen `history_length` iterations ago (Burke & Bykov's late
    /// acceptance criterion), tolerating temporary worsenings that
    /// strict descent would reject.
    LateAcceptance {
        /// Length of the acceptance-history ring buffer.
        history_length: usize,
    },
}

/// Configuration for [`HillClimbingRunner`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HillClimbingConfig {
    /// Strategy to execute.
    pub strategy: Strategy,
    /// Maximum total iterations. `0` = unbounded.
    pub max_iterations: usize,
    /// Maximum consecutive non-improving iterations before stopping
    /// (only meaningful for [`Strategy::LateAcceptance`]; strict descent
    /// strategies already stop at the first local optimum). `0` = unbounded.
    pub max_idle_iterations: usize,
    /// Interval, in iterations, at which `cost_history` is sampled.
    pub history_sample_interval: usize,
    /// Wall-clock budget. `None` = unbounded.
    pub max_duration: Option<Duration>,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for HillClimbingConfig {
    fn default() -> Self {
        HillClimbingConfig {
            strategy: Strategy::SteepestDescent,
            max_iterations: 0,
            max_idle_iterations: 1000,
            history_sample_interval: 100,
            max_duration: None,
            seed: None,
        }
    }
}

impl HillClimbingConfig {
    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the maximum total iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the maximum consecutive non-improving iterations.
    pub fn with_max_idle_iterations(mut self, n: usize) -> Self {
        self.max_idle_iterations = n;
        self
    }

    /// Sets the cost-history sampling interval.
    pub fn with_history_sample_interval(mut self, n: usize) -> Self {
        self.history_sample_interval = n;
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
        if let Strategy::LateAcceptance { history_length } = self.strategy {
            if history_length == 0 {
                return Err("late acceptance history_length must be positive".into());
            }
        }
        Ok(())
    }
}

/// Executes the hill-climbing family of strategies.
pub struct HillClimbingRunner;

impl HillClimbingRunner {
    /// Runs to completion (no external cancellation).
    pub fn run<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        config: &HillClimbingConfig,
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
        config: &HillClimbingConfig,
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
        config: &HillClimbingConfig,
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
        config: &HillClimbingConfig,
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
        config: &HillClimbingConfig,
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
        config: &HillClimbingConfig,
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
            initial_cost.clone(),
            config.history_sample_interval,
            cancel,
            config.max_duration,
        );

        let mut ring = match config.strategy {
            Strategy::LateAcceptance { history_length } => {
                vec![initial_cost.governing(); history_length]
            }
            _ => Vec::new(),
        };
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

            let improved = match config.strategy {
                Strategy::SteepestDescent => {
                    match ne.select_best(input, ctx.current(), |_, _| true, None, &mut rng) {
                        Ok((em, explored)) => {
                            for _ in 0..explored {
                                ctx.count_evaluation();
                            }
                            if is_improving(&em.cost) {
                                let mut next_state = ctx.current().clone();
                                ne.apply(input, &mut next_state, &em.mv);
                                let next_cost = ctx.current_cost().clone() + em.cost;
                                ctx.move_to_observed(next_state, next_cost, observers);
                                true
                            } else {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                Strategy::FirstDescent => {
                    match ne.select_first(input, ctx.current(), |_, _| true, None) {
                        Ok((em, explored)) => {
                            for _ in 0..explored {
                                ctx.count_evaluation();
                            }
                            let mut next_state = ctx.current().clone();
                            ne.apply(input, &mut next_state, &em.mv);
                            let next_cost = ctx.current_cost().clone() + em.cost;
                            ctx.move_to_observed(next_state, next_cost, observers);
                            true
                        }
                        Err(_) => break,
                    }
                }
                Strategy::HillClimbing => {
                    let mv = ne.random_move(input, ctx.current(), &mut rng);
                    ctx.count_evaluation();
                    let delta = ne.delta_cost(input, ctx.current(), &mv, None);
                    if is_non_worsening(&delta) {
                        let mut next_state = ctx.current().clone();
                        ne.apply(input, &mut next_state, &mv);
                        let next_cost = ctx.current_cost().clone() + delta;
                        let improving = next_cost < *ctx.best_cost();
                        ctx.move_to_observed(next_state, next_cost, observers);
                        improving
                    } else {
                        false
                    }
                }
                Strategy::LateAcceptance { .. } => {
                    let mv = ne.random_move(input, ctx.current(), &mut rng);
                    ctx.count_evaluation();
                    let delta = ne.delta_cost(input, ctx.current(), &mv, None);
                    let candidate_cost = ctx.current_cost().clone() + delta;
                    let slot = ctx.iteration() % ring.len();
                    let accept = candidate_cost.governing() <= ring[slot]
                        || candidate_cost < *ctx.current_cost();
                    // Burke-Bykov: history[slot] is set to the current cost
                    // *after* this iteration's accept/reject decision, every
                    // iteration, not only when a candidate is accepted.
                    let improved = if accept {
                        let mut next_state = ctx.current().clone();
                        ne.apply(input, &mut next_state, &mv);
                        let improving = candidate_cost < *ctx.best_cost();
                        ctx.move_to_observed(next_state, candidate_cost, observers);
                        improving
                    } else {
                        false
                    };
                    ring[slot] = ctx.current_cost().governing();
                    improved
                }
            };

            if improved {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::{CostComponent, ComponentRegistry};
    use crate::core::neighborhood::Move;
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq, Debug)]
    struct Toy(i64);

    #[derive(Clone, Copy, PartialEq, Debug)]
    struct Step(i64);
    impl Move for Step {}

    struct AbsComponent;
    impl CostComponent<(), Toy, i64> for AbsComponent {
        fn name(&self) -> &str {
            "abs"
        }
        fn weight(&self) -> f64 {
            1.0
        }
        fn is_hard(&self) -> bool {
            false
        }
        fn compute(&self, _input: &(), state: &Toy) -> i64 {
            state.0.abs()
        }
    }

    struct ToyManager {
        registry: ComponentRegistry<(), Toy, i64>,
    }

    impl StateManager for ToyManager {
        type Input = ();
        type State = Toy;
        type C = i64;

        fn components(&self) -> &ComponentRegistry<(), Toy, i64> {
            &self.registry
        }

        fn random_state<R: Rng>(&self, _input: &(), rng: &mut R) -> Toy {
            Toy(rng.random_range(-50..50))
        }

        fn check_consistency(&self, _input: &(), _state: &Toy) -> bool {
            true
        }
    }

    struct ToyExplorer {
        sm: ToyManager,
    }

    impl NeighborhoodExplorer for ToyExplorer {
        type Input = ();
        type State = Toy;
        type Move = Step;
        type C = i64;
        type SM = ToyManager;

        fn state_manager(&self) -> &ToyManager {
            &self.sm
        }

        fn delta_components(
            &self,
        ) -> &[Option<Arc<dyn crate::core::cost::DeltaCostComponent<(), Toy, Step, i64>>>] {
            &[]
        }

        fn random_move<R: Rng>(&self, _input: &(), _state: &Toy, rng: &mut R) -> Step {
            Step(if rng.random_bool(0.5) { 1 } else { -1 })
        }

        fn first_move(&self, _input: &(), _state: &Toy) -> Option<Step> {
            Some(Step(1))
        }

        fn next_move(&self, _input: &(), _state: &Toy, current: &Step) -> Option<Step> {
            if current.0 == 1 {
                Some(Step(-1))
            } else {
                None
            }
        }

        fn apply(&self, _input: &(), state: &mut Toy, mv: &Step) {
            state.0 += mv.0;
        }
    }

    fn explorer() -> ToyExplorer {
        let mut registry = ComponentRegistry::new();
        registry.add_cost_component(Arc::new(AbsComponent));
        ToyExplorer {
            sm: ToyManager { registry },
        }
    }

    #[test]
    fn steepest_descent_reaches_zero() {
        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::SteepestDescent)
            .with_seed(1);
        let result = HillClimbingRunner::run(&ex.sm, &ex, &(), &config).unwrap();
        assert_eq!(result.best_cost.total, 0);
        assert!(!result.cancelled);
    }

    #[test]
    fn hill_climbing_reaches_zero_then_idles_out() {
        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::HillClimbing)
            .with_max_idle_iterations(8)
            .with_seed(5);
        let result = HillClimbingRunner::run(&ex.sm, &ex, &(), &config).unwrap();
        assert_eq!(result.best_cost.total, 0);
        assert!(result.iterations >= 8);
    }

    #[test]
    fn first_descent_reaches_zero() {
        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::FirstDescent)
            .with_seed(7);
        let result = HillClimbingRunner::run(&ex.sm, &ex, &(), &config).unwrap();
        assert_eq!(result.best_cost.total, 0);
    }

    #[test]
    fn late_acceptance_finds_optimum_given_enough_budget() {
        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::LateAcceptance { history_length: 5 })
            .with_max_iterations(2000)
            .with_max_idle_iterations(0)
            .with_seed(3);
        let result = HillClimbingRunner::run(&ex.sm, &ex, &(), &config).unwrap();
        assert_eq!(result.best_cost.total, 0);
    }

    #[test]
    fn rejects_zero_history_length() {
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::LateAcceptance { history_length: 0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn observers_see_start_store_move_and_end() {
        use crate::core::observer::Event;
        use std::cell::RefCell;

        struct Recorder {
            seen: RefCell<Vec<Event>>,
        }
        impl Observer for Recorder {
            fn on_event(&self, event: Event) {
                self.seen.borrow_mut().push(event);
            }
        }

        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::SteepestDescent)
            .with_seed(1);
        let recorder = Recorder {
            seen: RefCell::new(Vec::new()),
        };
        let observers: Vec<&dyn Observer> = vec![&recorder];
        let result = HillClimbingRunner::run_with_observers(
            &ex.sm,
            &ex,
            &(),
            &config,
            CancelToken::none(),
            &observers,
        )
        .unwrap();
        assert_eq!(result.best_cost.total, 0);
        let seen = recorder.seen.borrow();
        assert_eq!(seen.first(), Some(&Event::Start));
        assert_eq!(seen.last(), Some(&Event::End));
        assert!(seen.contains(&Event::StoreMove));
        assert!(seen.contains(&Event::NewBest));
    }

    #[test]
    fn respects_external_cancellation() {
        use std::sync::atomic::AtomicBool;
        let ex = explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::LateAcceptance { history_length: 5 })
            .with_max_iterations(0)
            .with_max_idle_iterations(0)
            .with_seed(1);
        let flag = Arc::new(AtomicBool::new(true));
        let result =
            HillClimbingRunner::run_with_cancel(&ex.sm, &ex, &(), &config, CancelToken::from_flag(flag))
                .unwrap();
        assert!(result.cancelled);
    }
}
