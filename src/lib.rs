//! # selfzero
//!
//! An AlphaZero-style self-play learning core for two-player,
//! perfect-information board games.
//!
//! The crate couples a model abstraction (anything that maps a position to
//! a value estimate and an action policy) with a Monte Carlo Tree Search
//! that turns those raw estimates into an improved policy. Around this core
//! it provides composable model wrappers (evaluation caching, request
//! batching), self-play recording into training datasets, and the composite
//! loss that closes the learning loop.
//!
//! ## Basic usage
//!
//! ```
//! use selfzero::games::TicTacToe;
//! use selfzero::model::RolloutModel;
//! use selfzero::{Agent, MctsAgent, SearchConfig};
//!
//! fn main() -> selfzero::Result<()> {
//!     // Seed the process-wide random source for a reproducible run.
//!     selfzero::rng::seed(17);
//!
//!     let config = SearchConfig::default()
//!         .with_power(50)
//!         .with_temperature(0.0);
//!
//!     // Search guided by random playouts; no network required.
//!     let mut agent = MctsAgent::new(RolloutModel::new(), config);
//!     let action = agent.decide(&TicTacToe::new())?;
//!     assert!(action < 9);
//!     Ok(())
//! }
//! ```
//!
//! ## How it fits together
//!
//! 1. A [`Game`](game::Game) implementation supplies rules, a tensor
//!    representation from the side-to-move perspective, and (optionally)
//!    symmetry augmentation.
//! 2. A [`Model`](model::Model) evaluates positions. Baselines
//!    ([`RolloutModel`](model::RolloutModel), [`RandomModel`](model::RandomModel))
//!    work out of the box; [`BaseModel`](model::BaseModel) adapts any
//!    logit-producing network. Wrappers add caching
//!    ([`Cached`](model::Cached)) and request coalescing
//!    ([`Batched`](model::Batched)).
//! 3. [`Search`](mcts::Search) runs PUCT-guided simulations and extracts
//!    the visit-count policy.
//! 4. [`record_selfplay`](selfplay::record_selfplay) harvests search
//!    policies and final outcomes into a [`DataSet`](selfplay::DataSet),
//!    which [`train_step`](loss::train_step) consumes.

pub mod agents;
pub mod config;
pub mod game;
pub mod games;
pub mod loss;
pub mod mcts;
pub mod model;
pub mod rng;
pub mod selfplay;
pub mod stats;
pub mod tree;
pub mod utils;

pub use agents::{pvp, Agent, HumanAgent, IntuitionAgent, MctsAgent, RandomAgent};
pub use config::SearchConfig;
pub use game::{Game, Player, Status};
pub use mcts::{search_policy, Search};
pub use model::{Backend, Evaluation, Model};
pub use selfplay::{record_selfplay, DataSet, Sample};
pub use stats::SearchStatistics;

/// Error kinds surfaced by the engine.
///
/// The enum is `Clone` because the batching wrapper replicates a single
/// inner-model failure to every request waiting on that batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The action is outside the legal set of the current position
    #[error("action {0} is not legal in this position")]
    IllegalAction(usize),

    /// A game-progress operation was called on a decided position
    #[error("the game is already decided")]
    GameOver,

    /// A model was applied to an incompatible representation
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Feature output was requested through a wrapper that cannot provide it
    #[error("features are unavailable here: {0}")]
    FeatureUnsupported(String),

    /// Model deserialization failed
    #[error("failed to load model: {0}")]
    Load(String),

    /// The operation was abandoned by its owner or the collector went away
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Rejected search or wrapper parameters
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An underlying I/O operation failed
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
