//! Parameter-free baseline models.

use crate::game::Game;
use crate::model::{Evaluation, Model};
use crate::{utils, Error, Result};

/// Uniform prior over legal actions with a neutral value estimate.
///
/// The weakest usable search guide, handy as an opponent baseline and in
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomModel;

impl RandomModel {
    pub fn new() -> Self {
        RandomModel
    }
}

impl<G: Game> Model<G> for RandomModel {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        if game.status().is_over() {
            return Err(Error::GameOver);
        }
        Ok(Evaluation {
            value: 0.0,
            policy: utils::uniform_over(G::POLICY_LENGTH, &game.legal_actions()),
            features: Vec::new(),
        })
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        Box::new(*self)
    }

    fn playing_model(&self) -> &dyn Model<G> {
        self
    }
}

/// Estimates a position by playing one uniformly random game to the end.
///
/// The playout outcome, expressed from the evaluated position's
/// side-to-move perspective, becomes the value; the prior stays uniform
/// over legal actions. A noisy but unbiased search guide when no network
/// is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolloutModel;

impl RolloutModel {
    pub fn new() -> Self {
        RolloutModel
    }
}

impl<G: Game> Model<G> for RolloutModel {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        if game.status().is_over() {
            return Err(Error::GameOver);
        }
        let outcome = game.random_playout()?;
        Ok(Evaluation {
            value: outcome.value_for(game.current_player()),
            policy: utils::uniform_over(G::POLICY_LENGTH, &game.legal_actions()),
            features: Vec::new(),
        })
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        Box::new(*self)
    }

    fn playing_model(&self) -> &dyn Model<G> {
        self
    }
}

/// Deterministic constant output for tests.
#[derive(Debug, Clone, Copy)]
pub struct DummyModel {
    value: f32,
}

impl DummyModel {
    /// A model that answers every position with `value` and a uniform
    /// full-length policy.
    pub fn new(value: f32) -> Self {
        DummyModel { value }
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<G: Game> Model<G> for DummyModel {
    fn apply(&self, _game: &G) -> Result<Evaluation> {
        Ok(Evaluation {
            value: self.value,
            policy: vec![1.0 / G::POLICY_LENGTH as f32; G::POLICY_LENGTH],
            features: Vec::new(),
        })
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        Box::new(*self)
    }

    fn playing_model(&self) -> &dyn Model<G> {
        self
    }
}
