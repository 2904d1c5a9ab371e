//! Top-level solvers that orchestrate runners and kickers into a
//! complete optimization run (`spec.md` §4.9): a single local search to
//! convergence, multiple local searches round-robining over a shared
//! state, variable neighborhood descent via a [`Kicker`], and GRASP's
//! greedy-construct-then-improve loop.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::core::cftype::Scalar;
use crate::core::cost::CostStructure;
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::observer::{notify_all, Event, Observer};
use crate::core::state::StateManager;
use crate::error::Result;
use crate::kicker::{Kicker, KickerConfig};
use crate::rng::create_rng;

/// The outcome of any solver in this module: the best state found, its
/// cost, and wall-clock time spent.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "State: serde::Serialize, C: serde::Serialize",
        deserialize = "State: serde::Deserialize<'de>, C: serde::Deserialize<'de>"
    ))
)]
pub struct SolverResult<State: Clone, C: Scalar> {
    /// The best state found.
    pub output: State,
    /// Cost of `output`.
    pub cost: CostStructure<C>,
    /// Wall-clock time spent solving.
    pub running_time: Duration,
}

/// Configuration for [`SimpleLocalSearchSolver`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleLocalSearchConfig {
    /// Number of independent restarts; the best across all is kept.
    pub restarts: usize,
    /// Random seed driving the per-restart seed sequence.
    pub seed: Option<u64>,
}

impl Default for SimpleLocalSearchConfig {
    fn default() -> Self {
        SimpleLocalSearchConfig {
            restarts: 1,
            seed: None,
        }
    }
}

impl SimpleLocalSearchConfig {
    /// Sets the restart count.
    pub fn with_restarts(mut self, n: usize) -> Self {
        self.restarts = n;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Runs a single runner to convergence, optionally from several
/// independent restarts, keeping the best result.
///
/// Deliberately decoupled from any one runner family: `run_once` is
/// whatever a caller's chosen runner (hill climbing, SA, tabu search,
/// great deluge) produces for a given seed, so this solver composes
/// with all of them uniformly.
pub struct SimpleLocalSearchSolver;

impl SimpleLocalSearchSolver {
    /// Runs `run_once` for each restart and keeps the best `(state, cost)`.
    pub fn solve<State: Clone, C: Scalar>(
        config: &SimpleLocalSearchConfig,
        mut run_once: impl FnMut(u64) -> (State, CostStructure<C>),
    ) -> SolverResult<State, C> {
        let start = Instant::now();
        let base_seed = config.seed.unwrap_or_else(rand::random);
        let mut best: Option<(State, CostStructure<C>)> = None;

        for trial in 0..config.restarts.max(1) {
            let (state, cost) = run_once(base_seed.wrapping_add(trial as u64));
            best = match best {
                None => Some((state, cost)),
                Some((best_state, best_cost)) => {
                    if cost < best_cost {
                        Some((state, cost))
                    } else {
                        Some((best_state, best_cost))
                    }
                }
            };
        }

        let (output, cost) = best.expect("restarts is at least 1");
        SolverResult {
            output,
            cost,
            running_time: start.elapsed(),
        }
    }
}

/// Configuration for [`TokenRingSolver`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenRingConfig {
    /// Hard cap on the number of rounds. `0` = unbounded.
    pub max_rounds: usize,
    /// Stop once this many consecutive rounds produce no improvement.
    /// Distinct from `max_rounds`: a run can exhaust its idle budget
    /// long before `max_rounds`, or reach `max_rounds` while still improving.
    pub max_idle_rounds: usize,
    /// Random seed passed to every runner's turn.
    pub seed: Option<u64>,
}

impl Default for TokenRingConfig {
    fn default() -> Self {
        TokenRingConfig {
            max_rounds: 0,
            max_idle_rounds: 10,
            seed: None,
        }
    }
}

impl TokenRingConfig {
    /// Sets the hard round cap.
    pub fn with_max_rounds(mut self, n: usize) -> Self {
        self.max_rounds = n;
        self
    }

    /// Sets the idle-round cap.
    pub fn with_max_idle_rounds(mut self, n: usize) -> Self {
        self.max_idle_rounds = n;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Round-robins a list of runner "turns" over one shared state, passing
/// the token to the next runner after each turn.
///
/// Each turn receives the current state, its cost, and a shared RNG,
/// and returns whatever state it ends on (e.g. a hill-climbing runner
/// seeded to start from that state rather than a fresh random one).
pub struct TokenRingSolver;

impl TokenRingSolver {
    /// Runs the token ring to completion or exhaustion of its budget.
    pub fn solve<State: Clone, C: Scalar>(
        initial_state: State,
        initial_cost: CostStructure<C>,
        config: &TokenRingConfig,
        turns: Vec<Box<dyn FnMut(&State, &CostStructure<C>, &mut rand::rngs::StdRng) -> (State, CostStructure<C>)>>,
    ) -> SolverResult<State, C> {
        Self::solve_with_observers(initial_state, initial_cost, config, turns, &[])
    }

    /// Like [`solve`](Self::solve), notifying `observers` of `ROUND`
    /// after every round of the token ring (`spec.md` §6).
    pub fn solve_with_observers<State: Clone, C: Scalar>(
        initial_state: State,
        initial_cost: CostStructure<C>,
        config: &TokenRingConfig,
        mut turns: Vec<Box<dyn FnMut(&State, &CostStructure<C>, &mut rand::rngs::StdRng) -> (State, CostStructure<C>)>>,
        observers: &[&dyn Observer],
    ) -> SolverResult<State, C> {
        let start = Instant::now();
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let mut state = initial_state;
        let mut cost = initial_cost;
        let mut rounds = 0usize;
        let mut idle_rounds = 0usize;

        if turns.is_empty() {
            return SolverResult {
                output: state,
                cost,
                running_time: start.elapsed(),
            };
        }

        loop {
            if config.max_rounds > 0 && rounds >= config.max_rounds {
                break;
            }
            if idle_rounds >= config.max_idle_rounds.max(1) {
                break;
            }

            let cost_before_round = cost.clone();
            for turn in turns.iter_mut() {
                let (next_state, next_cost) = turn(&state, &cost, &mut rng);
                state = next_state;
                cost = next_cost;
            }

            if cost < cost_before_round {
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
            }
            rounds += 1;
            notify_all(observers, Event::Round);
        }

        SolverResult {
            output: state,
            cost,
            running_time: start.elapsed(),
        }
    }
}

/// Configuration for [`VndSolver`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VndConfig {
    /// Largest kick step length (neighborhood index) to escalate to
    /// before giving up.
    pub max_k: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for VndConfig {
    fn default() -> Self {
        VndConfig { max_k: 3, seed: None }
    }
}

impl VndConfig {
    /// Sets the maximum kick step length.
    pub fn with_max_k(mut self, k: usize) -> Self {
        self.max_k = k;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Variable neighborhood descent: escalates the kick step length `k`
/// from `1` to `max_k`, resetting to `1` on any improving kick and
/// stopping when `k` exceeds `max_k` or the state manager's lower bound
/// is reached (the source's `VariableNeighborhoodDescent::Go`).
pub struct VndSolver;

impl VndSolver {
    /// Runs variable neighborhood descent starting from `initial_state`.
    pub fn solve<SM, NE>(
        sm: &SM,
        ne: &NE,
        input: &SM::Input,
        initial_state: SM::State,
        config: &VndConfig,
    ) -> SolverResult<SM::State, SM::C>
    where
        SM: StateManager,
        NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
    {
        let start = Instant::now();
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let kicker = Kicker::new(ne);
        let mut state = initial_state;
        let mut cost = sm.cost(input, &state, None);
        let mut k = 1usize;

        while k <= config.max_k.max(1) && !sm.lower_bound_reached(&cost) {
            let kick_config = KickerConfig::default()
                .with_step_length(k)
                .with_trials(1)
                .with_seed(rng.random());
            match kicker.select_first(input, &state, &kick_config) {
                Ok(kick) => {
                    for mv in &kick.steps {
                        ne.apply(input, &mut state, mv);
                    }
                    cost = cost + kick.cost;
                    k = 1;
                }
                Err(_) => k += 1,
            }
        }

        SolverResult {
            output: state,
            cost,
            running_time: start.elapsed(),
        }
    }
}

/// Configuration for [`GraspSolver`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraspConfig {
    /// Number of greedy-construct-then-improve trials; the best across
    /// all is kept.
    pub trials: usize,
    /// RCL threshold passed to `StateManager::greedy_state`.
    pub alpha: f64,
    /// RCL size passed to `StateManager::greedy_state`.
    pub rcl_k: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for GraspConfig {
    fn default() -> Self {
        GraspConfig {
            trials: 10,
            alpha: 0.3,
            rcl_k: 5,
            seed: None,
        }
    }
}

impl GraspConfig {
    /// Sets the trial count.
    pub fn with_trials(mut self, n: usize) -> Self {
        self.trials = n;
        self
    }

    /// Sets the RCL threshold.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the RCL size.
    pub fn with_rcl_k(mut self, k: usize) -> Self {
        self.rcl_k = k;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// GRASP: repeatedly builds a state via `StateManager::greedy_state`'s
/// randomized-greedy RCL construction, improves it with a caller-supplied
/// local search, and keeps the best result across trials.
pub struct GraspSolver;

impl GraspSolver {
    /// Runs GRASP, requiring `sm` to implement `greedy_state`.
    pub fn solve<SM>(
        sm: &SM,
        input: &SM::Input,
        config: &GraspConfig,
        mut local_search: impl FnMut(SM::State, &mut rand::rngs::StdRng) -> (SM::State, CostStructure<SM::C>),
    ) -> Result<SolverResult<SM::State, SM::C>>
    where
        SM: StateManager,
    {
        let start = Instant::now();
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let mut best: Option<(SM::State, CostStructure<SM::C>)> = None;
        for _ in 0..config.trials.max(1) {
            let constructed = sm.greedy_state(input, config.alpha, config.rcl_k, &mut rng)?;
            let (state, cost) = local_search(constructed, &mut rng);
            best = match best {
                None => Some((state, cost)),
                Some((best_state, best_cost)) => {
                    if cost < best_cost {
                        Some((state, cost))
                    } else {
                        Some((best_state, best_cost))
                    }
                }
            };
        }

        let (output, cost) = best.expect("trials is at least 1");
        Ok(SolverResult {
            output,
            cost,
            running_time: start.elapsed(),
        })
    }
}
