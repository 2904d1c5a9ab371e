//! Criterion benchmarks for the local-search runner families.
//!
//! Uses synthetic problems (a continuous sphere-like descent and a
//! discrete OneMax-style toy) to measure pure algorithm overhead
//! independent of any domain: steepest descent and tabu search over
//! OneMax, simulated annealing over the sphere function.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use local_search_core::core::cost::{ComponentRegistry, CostComponent, DeltaCostComponent};
use local_search_core::core::neighborhood::{Move, NeighborhoodExplorer};
use local_search_core::core::state::StateManager;
use local_search_core::runner::hc::{HillClimbingConfig, HillClimbingRunner, Strategy};
use local_search_core::runner::sa::{CoolingSchedule, SaConfig, SimulatedAnnealingRunner};
use local_search_core::runner::tabu::{TabuConfig, TabuSearchRunner};

// ===========================================================================
// Sphere: minimize sum(x_i^2) over a continuous vector, one-coordinate jitter.
// ===========================================================================

#[derive(Clone, Debug, PartialEq)]
struct Point(Vec<f64>);

#[derive(Clone, Copy, PartialEq, Debug)]
struct Jitter {
    index: usize,
    delta: f64,
}
impl Move for Jitter {}

struct SphereComponent;
impl CostComponent<usize, Point, f64> for SphereComponent {
    fn name(&self) -> &str {
        "sphere"
    }
    fn weight(&self) -> f64 {
        1.0
    }
    fn is_hard(&self) -> bool {
        false
    }
    fn compute(&self, _input: &usize, state: &Point) -> f64 {
        state.0.iter().map(|x| x * x).sum()
    }
}

struct SphereDelta;
impl DeltaCostComponent<usize, Point, Jitter, f64> for SphereDelta {
    fn name(&self) -> &str {
        "sphere"
    }
    fn weight(&self) -> f64 {
        1.0
    }
    fn is_hard(&self) -> bool {
        false
    }
    fn delta(&self, _input: &usize, state: &Point, mv: &Jitter) -> f64 {
        let before = state.0[mv.index] * state.0[mv.index];
        let after_val = state.0[mv.index] + mv.delta;
        after_val * after_val - before
    }
}

struct SphereManager {
    registry: ComponentRegistry<usize, Point, f64>,
}

impl StateManager for SphereManager {
    type Input = usize;
    type State = Point;
    type C = f64;

    fn components(&self) -> &ComponentRegistry<usize, Point, f64> {
        &self.registry
    }

    fn random_state<R: Rng>(&self, input: &usize, rng: &mut R) -> Point {
        Point((0..*input).map(|_| rng.random_range(-5.0..5.0)).collect())
    }

    fn check_consistency(&self, input: &usize, state: &Point) -> bool {
        state.0.len() == *input
    }
}

struct SphereExplorer {
    sm: SphereManager,
    deltas: [Option<Arc<dyn DeltaCostComponent<usize, Point, Jitter, f64>>>; 1],
}

impl NeighborhoodExplorer for SphereExplorer {
    type Input = usize;
    type State = Point;
    type Move = Jitter;
    type C = f64;
    type SM = SphereManager;

    fn state_manager(&self) -> &SphereManager {
        &self.sm
    }

    fn delta_components(&self) -> &[Option<Arc<dyn DeltaCostComponent<usize, Point, Jitter, f64>>>] {
        &self.deltas
    }

    fn random_move<R: Rng>(&self, input: &usize, _state: &Point, rng: &mut R) -> Jitter {
        Jitter {
            index: rng.random_range(0..*input),
            delta: rng.random_range(-0.5..0.5),
        }
    }

    fn first_move(&self, input: &usize, _state: &Point) -> Option<Jitter> {
        if *input == 0 {
            None
        } else {
            Some(Jitter { index: 0, delta: -0.5 })
        }
    }

    fn next_move(&self, input: &usize, _state: &Point, current: &Jitter) -> Option<Jitter> {
        if current.delta < 0.0 {
            Some(Jitter {
                index: current.index,
                delta: 0.5,
            })
        } else if current.index + 1 < *input {
            Some(Jitter {
                index: current.index + 1,
                delta: -0.5,
            })
        } else {
            None
        }
    }

    fn apply(&self, _input: &usize, state: &mut Point, mv: &Jitter) {
        state.0[mv.index] += mv.delta;
    }
}

fn sphere_explorer(dim: usize) -> SphereExplorer {
    let mut registry = ComponentRegistry::new();
    registry.add_cost_component(Arc::new(SphereComponent));
    SphereExplorer {
        sm: SphereManager { registry },
        deltas: [Some(Arc::new(SphereDelta))],
    }
}

// ===========================================================================
// OneMax: maximize number of set bits, expressed as minimizing their deficit.
// ===========================================================================

#[derive(Clone, Debug, PartialEq)]
struct Bits(Vec<bool>);

#[derive(Clone, Copy, PartialEq, Debug)]
struct Flip(usize);
impl Move for Flip {}

struct DeficitComponent;
impl CostComponent<usize, Bits, f64> for DeficitComponent {
    fn name(&self) -> &str {
        "deficit"
    }
    fn weight(&self) -> f64 {
        1.0
    }
    fn is_hard(&self) -> bool {
        false
    }
    fn compute(&self, _input: &usize, state: &Bits) -> f64 {
        state.0.iter().filter(|b| !**b).count() as f64
    }
}

struct BitsManager {
    registry: ComponentRegistry<usize, Bits, f64>,
}

impl StateManager for BitsManager {
    type Input = usize;
    type State = Bits;
    type C = f64;

    fn components(&self) -> &ComponentRegistry<usize, Bits, f64> {
        &self.registry
    }

    fn random_state<R: Rng>(&self, input: &usize, rng: &mut R) -> Bits {
        Bits((0..*input).map(|_| rng.random_bool(0.5)).collect())
    }

    fn check_consistency(&self, input: &usize, state: &Bits) -> bool {
        state.0.len() == *input
    }
}

struct BitsExplorer {
    sm: BitsManager,
}

impl NeighborhoodExplorer for BitsExplorer {
    type Input = usize;
    type State = Bits;
    type Move = Flip;
    type C = f64;
    type SM = BitsManager;

    fn state_manager(&self) -> &BitsManager {
        &self.sm
    }

    fn delta_components(&self) -> &[Option<Arc<dyn DeltaCostComponent<usize, Bits, Flip, f64>>>] {
        &[]
    }

    fn random_move<R: Rng>(&self, input: &usize, _state: &Bits, rng: &mut R) -> Flip {
        Flip(rng.random_range(0..*input))
    }

    fn first_move(&self, input: &usize, _state: &Bits) -> Option<Flip> {
        if *input == 0 {
            None
        } else {
            Some(Flip(0))
        }
    }

    fn next_move(&self, input: &usize, _state: &Bits, current: &Flip) -> Option<Flip> {
        if current.0 + 1 < *input {
            Some(Flip(current.0 + 1))
        } else {
            None
        }
    }

    fn apply(&self, _input: &usize, state: &mut Bits, mv: &Flip) {
        state.0[mv.0] = !state.0[mv.0];
    }
}

fn bits_explorer() -> BitsExplorer {
    let mut registry = ComponentRegistry::new();
    registry.add_cost_component(Arc::new(DeficitComponent));
    BitsExplorer {
        sm: BitsManager { registry },
    }
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_sa_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_sphere");
    group.sample_size(10);

    for &dim in &[10, 50, 100] {
        let ex = sphere_explorer(dim);
        let config = SaConfig::default()
            .with_initial_temperature(10.0)
            .with_min_temperature(0.01)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.9 })
            .with_max_iterations(1000)
            .with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, dim| {
            b.iter(|| {
                let result = SimulatedAnnealingRunner::run(&ex.sm, black_box(&ex), dim, black_box(&config)).unwrap();
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_hc_onemax(c: &mut Criterion) {
    let mut group = c.benchmark_group("hc_onemax");
    group.sample_size(10);

    for &dim in &[20, 50, 100] {
        let ex = bits_explorer();
        let config = HillClimbingConfig::default()
            .with_strategy(Strategy::SteepestDescent)
            .with_max_iterations(500)
            .with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, dim| {
            b.iter(|| {
                let result = HillClimbingRunner::run(&ex.sm, black_box(&ex), dim, black_box(&config)).unwrap();
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_tabu_onemax(c: &mut Criterion) {
    let mut group = c.benchmark_group("tabu_onemax");
    group.sample_size(10);

    for &dim in &[20, 50, 100] {
        let ex = bits_explorer();
        let config = TabuConfig::default()
            .with_tabu_tenure(5)
            .with_max_iterations(500)
            .with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, dim| {
            b.iter(|| {
                let result = TabuSearchRunner::run(&ex.sm, black_box(&ex), dim, black_box(&config)).unwrap();
                black_box(result)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sa_sphere, bench_hc_onemax, bench_tabu_onemax);
criterion_main!(benches);
