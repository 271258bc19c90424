//! The game contract every playable game satisfies.
//!
//! A game is a position in a two-player, perfect-information, finite,
//! deterministic board game. Actions are plain indices into the game's
//! fixed-length policy vector; the engine, the models and the improved
//! policy all address actions by that index.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::seq::SliceRandom;

use crate::{rng, Error, Result};

/// One of the two sides of a game.
///
/// `One` always denotes the side that moves first from the initial
/// position; its numeric sign is `+1.0`, its opponent's `-1.0`. Values and
/// outcomes are expressed relative to these signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Numeric sign of this side: `+1.0` for `One`, `-1.0` for `Two`.
    pub fn sign(self) -> f32 {
        match self {
            Player::One => 1.0,
            Player::Two => -1.0,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// Termination status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Undecided,
    Draw,
    Won(Player),
}

impl Status {
    pub fn is_over(self) -> bool {
        !matches!(self, Status::Undecided)
    }

    /// Outcome from `player`'s perspective: `+1.0` win, `-1.0` loss,
    /// `0.0` for a draw or an undecided position.
    pub fn value_for(self, player: Player) -> f32 {
        match self {
            Status::Won(winner) if winner == player => 1.0,
            Status::Won(_) => -1.0,
            _ => 0.0,
        }
    }
}

/// Contract for a playable game.
///
/// Invariants every implementation upholds:
///
/// - a position is either decided or has at least one legal action;
/// - `legal_actions` returns indices below [`POLICY_LENGTH`](Game::POLICY_LENGTH);
/// - `apply_action` succeeds exactly for legal actions on undecided
///   positions and advances the turn;
/// - `representation` encodes the position from the side-to-move
///   perspective, matching the sign convention of model value heads.
pub trait Game: Clone + PartialEq + Eq + Hash + Send + Sync + 'static {
    /// Stable tag identifying the game type (used in model serialization).
    const NAME: &'static str;

    /// Representation tensor shape `(height, width, channels)`.
    const SHAPE: (usize, usize, usize);

    /// Number of distinct actions; the length of every policy vector.
    const POLICY_LENGTH: usize;

    fn status(&self) -> Status;

    /// Side to move. Only defined while the position is undecided.
    fn current_player(&self) -> Player;

    /// Legal action indices. Non-empty iff the position is undecided.
    fn legal_actions(&self) -> Vec<usize>;

    fn is_action_legal(&self, action: usize) -> bool {
        self.legal_actions().contains(&action)
    }

    /// Successor position after playing `action`.
    ///
    /// Fails with [`Error::GameOver`] on decided positions and
    /// [`Error::IllegalAction`] for actions outside the legal set.
    fn apply_action(&self, action: usize) -> Result<Self>;

    /// Flattened `height * width * channels` tensor from the side-to-move
    /// perspective.
    fn representation(&self) -> Vec<f32>;

    /// Symmetry-equivalent `(position, policy)` pairs, identity included.
    ///
    /// The default is the identity singleton for games without exploitable
    /// symmetries.
    fn augment(&self, policy: &[f32]) -> Vec<(Self, Vec<f32>)> {
        vec![(self.clone(), policy.to_vec())]
    }

    /// Plays one uniformly random legal action.
    fn random_turn(&self) -> Result<Self> {
        if self.status().is_over() {
            return Err(Error::GameOver);
        }
        let actions = self.legal_actions();
        let action = rng::with(|r| {
            *actions
                .choose(r)
                .expect("undecided position with no legal actions")
        });
        self.apply_action(action)
    }

    /// Plays uniformly random legal actions until the game is decided.
    fn random_playout(&self) -> Result<Status> {
        let mut game = self.clone();
        while !game.status().is_over() {
            game = game.random_turn()?;
        }
        Ok(game.status())
    }

    /// Position hash, stable within one process run. Used as a cache key.
    fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
