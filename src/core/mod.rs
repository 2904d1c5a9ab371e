//! Domain-agnostic search primitives shared by every runner, kicker, and
//! solver: the cost scalar, cost structures and components, the state
//! manager and neighborhood explorer contracts, observers, and
//! validated configuration parameters.

pub mod cftype;
pub mod cost;
pub mod neighborhood;
pub mod observer;
pub mod param;
pub mod state;

pub use cftype::Scalar;
pub use cost::{
    is_improving, is_non_worsening, is_worsening, ComponentRegistry, CostComponent, CostStructure,
    DeltaCostComponent, HARD_WEIGHT,
};
pub use neighborhood::{EvaluatedMove, Move, NeighborhoodExplorer};
pub use observer::{Event, NullObserver, Observer};
pub use param::Parameter;
pub use state::StateManager;
