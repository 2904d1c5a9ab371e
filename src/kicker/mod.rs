//! Kicker: macro-moves composed of a sequence of basic moves, used to
//! perturb a local optimum out of its basin (`spec.md` §4.8).
//!
//! Grounded on the source's `Kicker`/`ParallelKicker`: a "kick" is a
//! fixed-length sequence of steps whose total cost is the sum of each
//! step's delta; `select_best`'s reservoir tie-break (accept the
//! `n`-th equally-best kick with probability `1/n`) mirrors
//! `ParallelKicker::SelectBest`'s `Random::Int(0, number_of_bests) == 0`.

pub mod multi;
#[cfg(feature = "parallel")]
pub mod parallel;

use rand::Rng;

use crate::core::cftype::Scalar;
use crate::core::cost::CostStructure;
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::observer::{notify_all, Event, Observer};
use crate::error::{Error, Result};
use crate::rng::create_rng;

/// A fixed-length sequence of moves from one neighborhood, and its
/// cumulative cost relative to the state it started from.
#[derive(Debug, Clone)]
pub struct Kick<Mv, C: Scalar> {
    /// The steps making up this kick, in application order.
    pub steps: Vec<Mv>,
    /// Sum of every step's delta cost.
    pub cost: CostStructure<C>,
}

/// Configuration for [`Kicker`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KickerConfig {
    /// Number of moves composing one kick.
    pub step_length: usize,
    /// Number of independent kicks to draw when selecting best/random.
    pub trials: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for KickerConfig {
    fn default() -> Self {
        KickerConfig {
            step_length: 2,
            trials: 10,
            seed: None,
        }
    }
}

impl KickerConfig {
    /// Sets the step length.
    pub fn with_step_length(mut self, n: usize) -> Self {
        self.step_length = n;
        self
    }

    /// Sets the number of trial kicks.
    pub fn with_trials(mut self, n: usize) -> Self {
        self.trials = n;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.step_length == 0 {
            return Err("step_length must be positive".into());
        }
        if self.trials == 0 {
            return Err("trials must be positive".into());
        }
        Ok(())
    }
}

/// Draws and evaluates kicks over a single neighborhood.
pub struct Kicker<'a, NE> {
    ne: &'a NE,
}

impl<'a, NE> Kicker<'a, NE>
where
    NE: NeighborhoodExplorer,
{
    /// Wraps a neighborhood explorer for kicking.
    pub fn new(ne: &'a NE) -> Self {
        Kicker { ne }
    }

    fn draw_kick<R: Rng>(
        &self,
        input: &NE::Input,
        state: &NE::State,
        step_length: usize,
        rng: &mut R,
        observers: &[&dyn Observer],
    ) -> Kick<NE::Move, NE::C> {
        let mut steps = Vec::with_capacity(step_length);
        let mut cursor = state.clone();
        let mut total = CostStructure::<NE::C>::zero();
        for _ in 0..step_length {
            let mv = self.ne.random_move(input, &cursor, rng);
            let delta = self.ne.delta_cost(input, &cursor, &mv, None);
            self.ne.apply(input, &mut cursor, &mv);
            total += &delta;
            steps.push(mv);
            notify_all(observers, Event::KickStep);
        }
        Kick { steps, cost: total }
    }

    /// The first kick (among `config.trials` draws) whose cumulative
    /// cost is improving.
    pub fn select_first(
        &self,
        input: &NE::Input,
        state: &NE::State,
        config: &KickerConfig,
    ) -> Result<Kick<NE::Move, NE::C>> {
        self.select_first_with_observers(input, state, config, &[])
    }

    /// Like [`select_first`](Self::select_first), notifying `observers`
    /// of `KICKER_START`/`KICK_STEP`/`KICKER_STOP` (`spec.md` §6).
    pub fn select_first_with_observers(
        &self,
        input: &NE::Input,
        state: &NE::State,
        config: &KickerConfig,
        observers: &[&dyn Observer],
    ) -> Result<Kick<NE::Move, NE::C>> {
        notify_all(observers, Event::KickerStart);
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        let outcome = (|| {
            for _ in 0..config.trials {
                let kick = self.draw_kick(input, state, config.step_length, &mut rng, observers);
                if crate::core::cost::is_improving(&kick.cost) {
                    return Ok(kick);
                }
            }
            Err(Error::EmptyNeighborhood)
        })();
        notify_all(observers, Event::KickerStop);
        outcome
    }

    /// Draws `config.trials` independent kicks and returns the one with
    /// smallest cumulative cost, with uniform reservoir tie-breaking.
    pub fn select_best(&self, input: &NE::Input, state: &NE::State, config: &KickerConfig) -> Result<Kick<NE::Move, NE::C>> {
        self.select_best_with_observers(input, state, config, &[])
    }

    /// Like [`select_best`](Self::select_best), notifying `observers` of
    /// `KICKER_START`/`KICK_STEP`/`KICKER_STOP` (`spec.md` §6).
    pub fn select_best_with_observers(
        &self,
        input: &NE::Input,
        state: &NE::State,
        config: &KickerConfig,
        observers: &[&dyn Observer],
    ) -> Result<Kick<NE::Move, NE::C>> {
        config.validate().map_err(|reason| Error::incorrect("trials", reason))?;
        notify_all(observers, Event::KickerStart);
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let mut best: Option<Kick<NE::Move, NE::C>> = None;
        let mut ties = 0u64;
        for _ in 0..config.trials {
            let kick = self.draw_kick(input, state, config.step_length, &mut rng, observers);
            best = match best {
                None => {
                    ties = 1;
                    Some(kick)
                }
                Some(current) => {
                    if kick.cost < current.cost {
                        ties = 1;
                        Some(kick)
                    } else if kick.cost == current.cost {
                        ties += 1;
                        if rng.random_range(0..ties) == 0 {
                            Some(kick)
                        } else {
                            Some(current)
                        }
                    } else {
                        Some(current)
                    }
                }
            };
        }
        notify_all(observers, Event::KickerStop);
        best.ok_or(Error::EmptyNeighborhood)
    }

    /// One uniformly random kick, unevaluated against any alternative.
    pub fn select_random(&self, input: &NE::Input, state: &NE::State, config: &KickerConfig) -> Kick<NE::Move, NE::C> {
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        self.draw_kick(input, state, config.step_length, &mut rng, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::{CostComponent, ComponentRegistry};
    use crate::core::neighborhood::Move;
    use crate::core::state::StateManager;
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
    fn select_best_never_worse_than_a_single_random_draw() {
        let ex = explorer();
        let kicker = Kicker::new(&ex);
        let config = KickerConfig::default().with_step_length(3).with_trials(20).with_seed(1);
        let best = kicker.select_best(&(), &Toy(5), &config).unwrap();
        let single = kicker.select_random(&(), &Toy(5), &config.clone().with_trials(1).with_seed(2));
        assert!(best.cost <= single.cost);
    }

    #[test]
    fn select_first_returns_an_improving_kick() {
        let ex = explorer();
        let kicker = Kicker::new(&ex);
        let config = KickerConfig::default().with_step_length(1).with_trials(50).with_seed(3);
        let kick = kicker.select_first(&(), &Toy(5), &config).unwrap();
        assert!(crate::core::cost::is_improving(&kick.cost));
    }

    #[test]
    fn rejects_zero_step_length() {
        let config = KickerConfig::default().with_step_length(0);
        assert!(config.validate().is_err());
    }

    proptest::proptest! {
        /// `spec.md` §8 property 9: a kick's cumulative cost equals the
        /// sum of its steps' individual deltas, so applying every step in
        /// order reproduces exactly `cost(apply_kick(st)) - cost(st)`.
        #[test]
        fn kick_cost_equals_sum_of_step_deltas(
            start in -1_000i64..1_000,
            step_length in 1usize..6,
            seed in 0u64..10_000,
        ) {
            let ex = explorer();
            let kicker = Kicker::new(&ex);
            let config = KickerConfig::default().with_step_length(step_length).with_seed(seed);
            let state = Toy(start);
            let kick = kicker.select_random(&(), &state, &config);

            let mut applied = state;
            for mv in &kick.steps {
                ex.apply(&(), &mut applied, mv);
            }
            let pre_cost = ex.state_manager().cost(&(), &state, None);
            let post_cost = ex.state_manager().cost(&(), &applied, None);
            proptest::prop_assert_eq!(kick.cost.total, post_cost.total - pre_cost.total);
        }
    }
}
