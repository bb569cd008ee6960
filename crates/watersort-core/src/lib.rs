//! Water-sort puzzle authoring engine.
//!
//! A deterministic, seedable core that models a bottle-pouring puzzle with
//! gimmick constraints, generates mixed start states that are provably
//! solvable, solves them optimally under a wall-clock budget, and scores
//! their difficulty.
//!
//! The pipeline: a [`Generator`] builds a start [`State`] (from a template,
//! a random deal, or a reverse scramble), validates it through the
//! [`Solver`], and attaches a difficulty score to the emitted [`Generated`]
//! record. All randomness flows through the engine's own [`Rng`]; the same
//! seed always yields the same maps.

mod generator;
mod rng;
mod score;
mod solver;
mod state;
mod types;

pub use generator::{GenOptions, Generated, Generator, InitialDistribution, TemplateError};
pub use rng::Rng;
pub use score::{estimate_difficulty, DifficultyBreakdown};
pub use solver::{SolveResult, Solver};
pub use state::{Locks, State};
pub use types::{
    Bottle, Color, DifficultyLabel, Gimmick, GimmickKind, Move, Params, Slot, MAX_POLICY_COLORS,
    MAX_STORED_COLORS,
};
