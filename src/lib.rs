//! A domain-agnostic framework for single-objective local-search
//! metaheuristics: the user supplies a problem's input, state, move,
//! cost components, and neighborhood; this crate supplies the reusable
//! control structure around them.
//!
//! # Architecture
//!
//! - [`core`] — the search-space contracts every algorithm builds on:
//!   the cost scalar ([`core::cftype`]), aggregated cost and cost
//!   components ([`core::cost`]), the state manager
//!   ([`core::state::StateManager`]), and the neighborhood explorer
//!   ([`core::neighborhood::NeighborhoodExplorer`]).
//! - [`runner`] — the metaheuristic search loops: hill climbing and its
//!   descent/late-acceptance variants ([`runner::hc`]), simulated
//!   annealing ([`runner::sa`]), tabu search ([`runner::tabu`]), and
//!   great deluge ([`runner::greatdeluge`]).
//! - [`kicker`] — multi-move macro-neighborhoods used to escape local
//!   optima (composes with [`solver::VndSolver`] for variable
//!   neighborhood descent).
//! - [`solver`] — top-level orchestration: a single runner to
//!   convergence, a token-ring of runners, VND, and GRASP.
//! - [`error`] — the stable error kinds raised at the boundary between
//!   the search core and a user-supplied problem module.
//! - [`rng`] — the seeded-RNG primitives every runner shares.
//!
//! # Usage
//!
//! Implement [`core::state::StateManager`] and
//! [`core::neighborhood::NeighborhoodExplorer`] for your problem, then
//! drive a search with any runner in [`runner`] or orchestrate several
//! with a [`solver`].

pub mod core;
pub mod error;
pub mod kicker;
pub mod rng;
pub mod runner;
pub mod solver;
