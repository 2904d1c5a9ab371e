//! Multi-neighborhood kicker: composes one macro-move step from each of
//! several distinct neighborhoods (`modality() > 1` kicking, as in the
//! source's bimodal/multi-neighborhood kickers).
//!
//! [`NeighborhoodExplorer`] can't be made into a trait object (its
//! methods are generic over `R: Rng`), so a kick across heterogeneous
//! neighborhood types needs an object-safe seam. [`KickNeighborhood`]
//! provides it by fixing the RNG to the crate's one concrete generator
//! ([`StdRng`]) instead of staying generic — every runner in this crate
//! already commits to `StdRng` for reproducibility (`spec.md` §10.3), so
//! this costs no real generality.

use rand::rngs::StdRng;

use crate::core::cftype::Scalar;
use crate::core::cost::CostStructure;
use crate::core::neighborhood::NeighborhoodExplorer;
use crate::core::state::StateManager;

/// One neighborhood a [`MultiKicker`] can draw a step from.
pub trait KickNeighborhood<Input, State, C: Scalar>: Send + Sync {
    /// Draws a random move in this neighborhood, applies it to a clone
    /// of `state`, and returns the resulting state and delta cost.
    fn random_step(&self, input: &Input, state: &State, rng: &mut StdRng) -> (State, CostStructure<C>);
}

/// Adapts a concrete `(StateManager, NeighborhoodExplorer)` pair into
/// an erased [`KickNeighborhood`].
pub struct Adapter<'a, SM, NE> {
    ne: &'a NE,
    _sm: std::marker::PhantomData<&'a SM>,
}

impl<'a, SM, NE> Adapter<'a, SM, NE> {
    /// Wraps a neighborhood explorer for use in a [`MultiKicker`].
    pub fn new(ne: &'a NE) -> Self {
        Adapter {
            ne,
            _sm: std::marker::PhantomData,
        }
    }
}

impl<'a, SM, NE> KickNeighborhood<SM::Input, SM::State, SM::C> for Adapter<'a, SM, NE>
where
    SM: StateManager,
    NE: NeighborhoodExplorer<Input = SM::Input, State = SM::State, C = SM::C>,
{
    fn random_step(
        &self,
        input: &SM::Input,
        state: &SM::State,
        rng: &mut StdRng,
    ) -> (SM::State, CostStructure<SM::C>) {
        let mv = self.ne.random_move(input, state, rng);
        let delta = self.ne.delta_cost(input, state, &mv, None);
        let mut next = state.clone();
        self.ne.apply(input, &mut next, &mv);
        (next, delta)
    }
}

/// A macro-move that draws one step from each registered neighborhood,
/// in order, accumulating cost across all of them.
pub struct MultiKicker<'a, Input, State, C: Scalar> {
    neighborhoods: Vec<&'a dyn KickNeighborhood<Input, State, C>>,
}

impl<'a, Input, State: Clone, C: Scalar> MultiKicker<'a, Input, State, C> {
    /// Builds a kicker over the given ordered list of neighborhoods.
    pub fn new(neighborhoods: Vec<&'a dyn KickNeighborhood<Input, State, C>>) -> Self {
        MultiKicker { neighborhoods }
    }

    /// Number of distinct neighborhoods this kicker draws from.
    pub fn modality(&self) -> usize {
        self.neighborhoods.len()
    }

    /// Draws one step from each neighborhood in turn, applying it to a
    /// running state, and returns the final state and cumulative cost.
    pub fn kick(&self, input: &Input, state: &State, rng: &mut StdRng) -> (State, CostStructure<C>) {
        let mut cursor = state.clone();
        let mut total = CostStructure::<C>::zero();
        for neighborhood in &self.neighborhoods {
            let (next, delta) = neighborhood.random_step(input, &cursor, rng);
            cursor = next;
            total += &delta;
        }
        (cursor, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::{CostComponent, ComponentRegistry};
    use crate::core::neighborhood::Move;
    use crate::rng::create_rng;
    use rand::Rng;
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq, Debug)]
    struct Toy(i64);

    #[derive(Clone, Copy, PartialEq, Debug)]
    struct StepUp;
    impl Move for StepUp {}
    #[derive(Clone, Copy, PartialEq, Debug)]
    struct StepDown;
    impl Move for StepDown {}

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

    struct UpExplorer {
        sm: ToyManager,
    }

    impl NeighborhoodExplorer for UpExplorer {
        type Input = ();
        type State = Toy;
        type Move = StepUp;
        type C = i64;
        type SM = ToyManager;

        fn state_manager(&self) -> &ToyManager {
            &self.sm
        }
        fn delta_components(
            &self,
        ) -> &[Option<Arc<dyn crate::core::cost::DeltaCostComponent<(), Toy, StepUp, i64>>>] {
            &[]
        }
        fn random_move<R: Rng>(&self, _input: &(), _state: &Toy, _rng: &mut R) -> StepUp {
            StepUp
        }
        fn first_move(&self, _input: &(), _state: &Toy) -> Option<StepUp> {
            Some(StepUp)
        }
        fn next_move(&self, _input: &(), _state: &Toy, _current: &StepUp) -> Option<StepUp> {
            None
        }
        fn apply(&self, _input: &(), state: &mut Toy, _mv: &StepUp) {
            state.0 += 1;
        }
    }

    struct DownExplorer {
        sm: ToyManager,
    }

    impl NeighborhoodExplorer for DownExplorer {
        type Input = ();
        type State = Toy;
        type Move = StepDown;
        type C = i64;
        type SM = ToyManager;

        fn state_manager(&self) -> &ToyManager {
            &self.sm
        }
        fn delta_components(
            &self,
        ) -> &[Option<Arc<dyn crate::core::cost::DeltaCostComponent<(), Toy, StepDown, i64>>>] {
            &[]
        }
        fn random_move<R: Rng>(&self, _input: &(), _state: &Toy, _rng: &mut R) -> StepDown {
            StepDown
        }
        fn first_move(&self, _input: &(), _state: &Toy) -> Option<StepDown> {
            Some(StepDown)
        }
        fn next_move(&self, _input: &(), _state: &Toy, _current: &StepDown) -> Option<StepDown> {
            None
        }
        fn apply(&self, _input: &(), state: &mut Toy, _mv: &StepDown) {
            state.0 -= 1;
        }
    }

    #[test]
    fn kick_composes_one_step_per_neighborhood() {
        let mut up_registry = ComponentRegistry::new();
        up_registry.add_cost_component(Arc::new(AbsComponent));
        let up = UpExplorer {
            sm: ToyManager { registry: up_registry },
        };
        let mut down_registry = ComponentRegistry::new();
        down_registry.add_cost_component(Arc::new(AbsComponent));
        let down = DownExplorer {
            sm: ToyManager { registry: down_registry },
        };

        let up_adapter = Adapter::<ToyManager, UpExplorer>::new(&up);
        let down_adapter = Adapter::<ToyManager, DownExplorer>::new(&down);
        let kicker = MultiKicker::new(vec![&up_adapter, &down_adapter]);
        assert_eq!(kicker.modality(), 2);

        let mut rng = create_rng(1);
        let (final_state, _cost) = kicker.kick(&(), &Toy(5), &mut rng);
        // +1 then -1 nets back to the start
        assert_eq!(final_state, Toy(5));
    }
}
