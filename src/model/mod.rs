//! The model contract and its composable implementations.
//!
//! A model maps a position to a scalar value estimate in `[-1, 1]`, a
//! full-length action policy, and optional auxiliary feature outputs. All
//! of it is expressed from the side-to-move perspective of the evaluated
//! position. Wrappers ([`Cached`], [`Batched`]) preserve the contract
//! while adding memoization and request coalescing.

pub mod base;
pub mod baseline;
pub mod batch;
pub mod cache;
pub mod persist;

pub use base::{BaseModel, LinearNet, LogitNet};
pub use baseline::{DummyModel, RandomModel, RolloutModel};
pub use batch::Batched;
pub use cache::Cached;
pub use persist::{load_saved, save_model, LayerDescriptor, SavedModel};

use std::sync::Arc;

use crate::game::{Game, Status};
use crate::Result;

/// Computational backend a model lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}

/// Output of one model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Value estimate in `[-1, 1]` from the side-to-move perspective.
    pub value: f32,

    /// Full-length policy. Entries on illegal actions are unconstrained
    /// until the caller masks them.
    pub policy: Vec<f32>,

    /// Concatenated auxiliary feature outputs, head order.
    pub features: Vec<f32>,
}

/// An auxiliary prediction head: its shape, its loss weight, and the
/// training target it assigns to a recorded position.
pub trait FeatureHead<G: Game>: Send + Sync {
    fn name(&self) -> &str;

    /// Number of output entries this head contributes.
    fn len(&self) -> usize;

    /// Weight of this head's loss term.
    fn weight(&self) -> f32 {
        1.0
    }

    /// Training target for a position recorded in a game that ended with
    /// `outcome`.
    fn target(&self, game: &G, outcome: Status) -> Vec<f32>;
}

/// A position evaluator.
///
/// Implementations are type-narrowed to one game; the trait is object safe
/// so wrappers and agents can hold models behind `Box<dyn Model<G>>`.
pub trait Model<G: Game>: Send + Sync {
    fn apply(&self, game: &G) -> Result<Evaluation>;

    /// Evaluates a slice of positions. The default maps elementwise;
    /// wrappers and network-backed models override it for efficiency.
    fn apply_batch(&self, games: &[G]) -> Result<Vec<Evaluation>> {
        games.iter().map(|game| self.apply(game)).collect()
    }

    /// Deep copy with independent state.
    fn clone_model(&self) -> Box<dyn Model<G>>;

    /// Equivalent model on the other backend.
    ///
    /// Backend-free models return a plain copy; wrappers whose state
    /// cannot migrate log a warning and return themselves unchanged.
    fn swap(&self) -> Result<Box<dyn Model<G>>> {
        Ok(self.clone_model())
    }

    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    /// Whether the model carries trainable parameters.
    fn trainable(&self) -> bool {
        false
    }

    /// How many evaluation requests the model wants in flight at once.
    /// The search keeps this many traversals running concurrently.
    fn ntasks(&self) -> usize {
        1
    }

    /// Auxiliary feature heads this model produces.
    fn features(&self) -> Vec<Arc<dyn FeatureHead<G>>> {
        Vec::new()
    }

    /// Feature outputs for one position.
    fn feature_output(&self, game: &G) -> Result<Vec<f32>> {
        Ok(self.apply(game)?.features)
    }

    /// The model below all wrappers; `None` when `self` is not a wrapper.
    fn base_model(&self) -> Option<&dyn Model<G>> {
        None
    }

    /// The model to use for match play.
    fn playing_model(&self) -> &dyn Model<G>;

    /// The innermost model with trainable parameters, if any.
    fn training_model(&self) -> Option<&dyn Model<G>> {
        None
    }

    /// Sum of squared parameters flagged as regularizable.
    fn l2_norm(&self) -> f32 {
        0.0
    }
}

impl<G: Game> Model<G> for Box<dyn Model<G>> {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        (**self).apply(game)
    }

    fn apply_batch(&self, games: &[G]) -> Result<Vec<Evaluation>> {
        (**self).apply_batch(games)
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        (**self).clone_model()
    }

    fn swap(&self) -> Result<Box<dyn Model<G>>> {
        (**self).swap()
    }

    fn backend(&self) -> Backend {
        (**self).backend()
    }

    fn trainable(&self) -> bool {
        (**self).trainable()
    }

    fn ntasks(&self) -> usize {
        (**self).ntasks()
    }

    fn features(&self) -> Vec<Arc<dyn FeatureHead<G>>> {
        (**self).features()
    }

    fn feature_output(&self, game: &G) -> Result<Vec<f32>> {
        (**self).feature_output(game)
    }

    fn base_model(&self) -> Option<&dyn Model<G>> {
        (**self).base_model()
    }

    fn playing_model(&self) -> &dyn Model<G> {
        (**self).playing_model()
    }

    fn training_model(&self) -> Option<&dyn Model<G>> {
        (**self).training_model()
    }

    fn l2_norm(&self) -> f32 {
        (**self).l2_norm()
    }
}
