//! Aggregated cost structure and the cost-component contracts.
//!
//! See `spec.md` §3 (`CostStructure`, `CostComponent`, `DeltaCostComponent`)
//! and §4.1 (the registry a `StateManager` owns).

use std::cmp::Ordering;
use std::sync::Arc;

use super::cftype::{equal_to, greater_than, less_than, less_than_or_equal, Scalar};

/// Multiplies the violations term in `total = HARD_WEIGHT * violations +
/// objective`. Fixed per `spec.md` §6; promote it into the cost structure
/// itself (rather than a single process-wide constant) if a future
/// embedding needs distinct weights per sub-problem — see Design Note (b).
pub const HARD_WEIGHT: i64 = 1000;

/// Aggregated cost of a state or of a move's delta, broken down into
/// hard-component violations and soft-component objective.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "C: serde::Serialize",
        deserialize = "C: serde::Deserialize<'de>"
    ))
)]
pub struct CostStructure<C: Scalar> {
    /// `HARD_WEIGHT * violations + objective`.
    pub total: C,
    /// Sum over hard components.
    pub violations: C,
    /// Sum over soft components.
    pub objective: C,
    /// One value per registered component, in registration order.
    pub all_components: Vec<C>,
    /// Optional alternate scalar using per-component weights.
    pub weighted: f64,
    /// Selects whether `weighted` (true) or `total` (false) governs ordering.
    pub is_weighted: bool,
}

impl<C: Scalar> Default for CostStructure<C> {
    fn default() -> Self {
        CostStructure {
            total: C::zero(),
            violations: C::zero(),
            objective: C::zero(),
            all_components: Vec::new(),
            weighted: 0.0,
            is_weighted: false,
        }
    }
}

impl<C: Scalar> CostStructure<C> {
    /// The zero cost structure (no components, unweighted).
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds a cost structure from a hard/soft split and a per-component
    /// breakdown, maintaining `total = HARD_WEIGHT * violations + objective`.
    pub fn from_parts(violations: C, objective: C, all_components: Vec<C>) -> Self {
        CostStructure {
            total: violations.scale(HARD_WEIGHT as f64) + objective,
            violations,
            objective,
            all_components,
            weighted: 0.0,
            is_weighted: false,
        }
    }

    /// Attaches a weighted scalar and marks the structure as weighted.
    pub fn with_weighted(mut self, weighted: f64) -> Self {
        self.weighted = weighted;
        self.is_weighted = true;
        self
    }

    /// The scalar that governs ordering: `weighted` if weighted, else `total`.
    pub fn governing(&self) -> f64 {
        if self.is_weighted {
            self.weighted
        } else {
            self.total.to_f64()
        }
    }

    /// `true` iff the governing cost is within tolerance of zero.
    pub fn is_zero(&self) -> bool {
        equal_to(C::from_f64(self.governing()), C::zero())
    }
}

fn pad_to(v: &mut Vec<impl Scalar>, len: usize) {
    if v.len() < len {
        v.resize(len, Scalar::zero());
    }
}

impl<C: Scalar> std::ops::AddAssign<&CostStructure<C>> for CostStructure<C> {
    fn add_assign(&mut self, other: &CostStructure<C>) {
        self.total = self.total + other.total;
        self.violations = self.violations + other.violations;
        self.objective = self.objective + other.objective;
        let len = self.all_components.len().max(other.all_components.len());
        pad_to(&mut self.all_components, len);
        for (i, c) in other.all_components.iter().enumerate() {
            self.all_components[i] = self.all_components[i] + *c;
        }
        if other.is_weighted {
            self.weighted += other.weighted;
            self.is_weighted = true;
        }
    }
}

impl<C: Scalar> std::ops::SubAssign<&CostStructure<C>> for CostStructure<C> {
    fn sub_assign(&mut self, other: &CostStructure<C>) {
        self.total = self.total - other.total;
        self.violations = self.violations - other.violations;
        self.objective = self.objective - other.objective;
        let len = self.all_components.len().max(other.all_components.len());
        pad_to(&mut self.all_components, len);
        for (i, c) in other.all_components.iter().enumerate() {
            self.all_components[i] = self.all_components[i] - *c;
        }
        if other.is_weighted {
            self.weighted -= other.weighted;
            self.is_weighted = true;
        }
    }
}

impl<C: Scalar> std::ops::Add for CostStructure<C> {
    type Output = CostStructure<C>;
    fn add(mut self, rhs: CostStructure<C>) -> CostStructure<C> {
        self += &rhs;
        self
    }
}

impl<C: Scalar> std::ops::Sub for CostStructure<C> {
    type Output = CostStructure<C>;
    fn sub(mut self, rhs: CostStructure<C>) -> CostStructure<C> {
        self -= &rhs;
        self
    }
}

/// Ordering and equality compare `weighted` when both operands are
/// weighted, else `total`, through the scaled-tolerance helpers — never
/// `None` (totality, `spec.md` §8 property 3).
impl<C: Scalar> PartialEq for CostStructure<C> {
    fn eq(&self, other: &Self) -> bool {
        if self.is_weighted && other.is_weighted {
            equal_to(self.weighted, other.weighted)
        } else {
            equal_to(self.total, other.total)
        }
    }
}

impl<C: Scalar> PartialOrd for CostStructure<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let ordering = if self.is_weighted && other.is_weighted {
            if equal_to(self.weighted, other.weighted) {
                Ordering::Equal
            } else if less_than(self.weighted, other.weighted) {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        } else if equal_to(self.total, other.total) {
            Ordering::Equal
        } else if less_than(self.total, other.total) {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        Some(ordering)
    }
}

/// Compares a cost structure's governing scalar against a raw `C` value
/// (e.g. `move_cost.total < aspiration` in tabu search), tolerance-aware.
pub fn governing_less_than<C: Scalar>(cs: &CostStructure<C>, value: C) -> bool {
    less_than(C::from_f64(cs.governing()), value)
}

/// `true` iff the governing scalar is strictly negative (an improving move).
pub fn is_improving<C: Scalar>(cs: &CostStructure<C>) -> bool {
    less_than(C::from_f64(cs.governing()), C::zero())
}

/// `true` iff the governing scalar is non-positive (sideways-or-improving).
pub fn is_non_worsening<C: Scalar>(cs: &CostStructure<C>) -> bool {
    less_than_or_equal(C::from_f64(cs.governing()), C::zero())
}

/// `true` iff the governing scalar is strictly positive (worsening).
pub fn is_worsening<C: Scalar>(cs: &CostStructure<C>) -> bool {
    greater_than(C::from_f64(cs.governing()), C::zero())
}

/// A weighted, hard-or-soft evaluator of `(input, state)`.
///
/// `Cost(in, st) = weight * compute(in, st)`. Components are registered
/// with a [`ComponentRegistry`]; their registration order fixes their
/// index in [`CostStructure::all_components`].
pub trait CostComponent<Input, State, C: Scalar>: Send + Sync {
    /// Component name, used only for diagnostics.
    fn name(&self) -> &str;

    /// Multiplier applied to [`compute`](Self::compute).
    fn weight(&self) -> f64;

    /// `true` for a hard (feasibility) component, `false` for soft.
    fn is_hard(&self) -> bool;

    /// The raw (unweighted) component value.
    fn compute(&self, input: &Input, state: &State) -> C;

    /// `weight * compute(input, state)`.
    fn cost(&self, input: &Input, state: &State) -> C {
        self.compute(input, state).scale(self.weight())
    }
}

/// Incremental companion to a [`CostComponent`].
///
/// Contract: for every `(state, mv)`,
/// `delta(in, state, mv) == compute(in, apply(state, mv)) - compute(in, state)`.
/// This is the central correctness invariant exercised by the test suite
/// (`spec.md` §8 property 1).
pub trait DeltaCostComponent<Input, State, Move, C: Scalar>: Send + Sync {
    /// The raw (unweighted) incremental cost of applying `mv` to `state`.
    fn delta(&self, input: &Input, state: &State, mv: &Move) -> C;

    /// `weight * delta(input, state, mv)`.
    fn delta_cost(&self, input: &Input, state: &State, mv: &Move, weight: f64) -> C {
        self.delta(input, state, mv).scale(weight)
    }
}

/// An append-only, order-stable registry of cost components.
///
/// Owned by a `StateManager` implementation; indices are stable within
/// one registry ("Global registry of cost components", Design Note).
pub struct ComponentRegistry<Input, State, C: Scalar> {
    entries: Vec<Arc<dyn CostComponent<Input, State, C>>>,
}

impl<Input, State, C: Scalar> Default for ComponentRegistry<Input, State, C> {
    fn default() -> Self {
        ComponentRegistry {
            entries: Vec::new(),
        }
    }
}

impl<Input, State, C: Scalar> ComponentRegistry<Input, State, C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component, returning the index it was assigned.
    pub fn add_cost_component(&mut self, cc: Arc<dyn CostComponent<Input, State, C>>) -> usize {
        self.entries.push(cc);
        self.entries.len() - 1
    }

    /// Removes every registered component.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` iff no component is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates registered components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CostComponent<Input, State, C>>> {
        self.entries.iter()
    }

    /// Computes the full `CostStructure` of `state`, iterating every
    /// registered component. `weights`, if present, fills `weighted` and
    /// sets `is_weighted = true` (`spec.md` §4.1).
    pub fn cost(&self, input: &Input, state: &State, weights: Option<&[f64]>) -> CostStructure<C> {
        let mut violations = C::zero();
        let mut objective = C::zero();
        let mut all_components = Vec::with_capacity(self.entries.len());
        let mut weighted_sum = 0.0;

        for (i, cc) in self.entries.iter().enumerate() {
            let value = cc.cost(input, state);
            all_components.push(value);
            if cc.is_hard() {
                violations = violations + value;
            } else {
                objective = objective + value;
            }
            if let Some(w) = weights {
                let override_weight = w.get(i).copied().unwrap_or(cc.weight());
                weighted_sum += cc.compute(input, state).to_f64() * override_weight;
            }
        }

        let mut cs = CostStructure::from_parts(violations, objective, all_components);
        if let Some(_w) = weights {
            cs = cs.with_weighted(weighted_sum);
        }
        cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstComponent {
        weight: f64,
        hard: bool,
        value: i64,
    }

    impl CostComponent<(), (), i64> for ConstComponent {
        fn name(&self) -> &str {
            "const"
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn is_hard(&self) -> bool {
            self.hard
        }
        fn compute(&self, _input: &(), _state: &()) -> i64 {
            self.value
        }
    }

    #[test]
    fn decomposition_invariant_holds() {
        let mut reg = ComponentRegistry::<(), (), i64>::new();
        reg.add_cost_component(Arc::new(ConstComponent {
            weight: 1.0,
            hard: true,
            value: 3,
        }));
        reg.add_cost_component(Arc::new(ConstComponent {
            weight: 2.0,
            hard: false,
            value: 5,
        }));

        let cs = reg.cost(&(), &(), None);
        assert_eq!(cs.violations, 3);
        assert_eq!(cs.objective, 10);
        assert_eq!(cs.total, HARD_WEIGHT * 3 + 10);
        assert_eq!(cs.all_components, vec![3, 10]);
    }

    #[test]
    fn weighted_selects_alternate_scalar() {
        let mut reg = ComponentRegistry::<(), (), f64>::new();
        reg.add_cost_component(Arc::new(ConstComponentF {
            weight: 1.0,
            hard: false,
            value: 2.0,
        }));
        let unweighted = reg.cost(&(), &(), None);
        assert!(!unweighted.is_weighted);

        let weighted = reg.cost(&(), &(), Some(&[5.0]));
        assert!(weighted.is_weighted);
        assert!((weighted.weighted - 10.0).abs() < 1e-9);
        assert!(weighted > unweighted);
    }

    struct ConstComponentF {
        weight: f64,
        hard: bool,
        value: f64,
    }

    impl CostComponent<(), (), f64> for ConstComponentF {
        fn name(&self) -> &str {
            "constf"
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn is_hard(&self) -> bool {
            self.hard
        }
        fn compute(&self, _input: &(), _state: &()) -> f64 {
            self.value
        }
    }

    #[test]
    fn ordering_is_total_and_mutually_consistent() {
        let a = CostStructure::<i64>::from_parts(0, 5, vec![5]);
        let b = CostStructure::<i64>::from_parts(0, 7, vec![7]);
        assert!(a < b);
        assert!(a <= b);
        assert!(b > a);
        assert!(b >= a);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn add_assign_pads_shorter_component_vector() {
        let mut a = CostStructure::<i64>::from_parts(1, 1, vec![1]);
        let b = CostStructure::<i64>::from_parts(1, 1, vec![1, 2, 3]);
        a += &b;
        assert_eq!(a.all_components, vec![2, 2, 3]);
        assert_eq!(a.violations, 2);
    }
}
