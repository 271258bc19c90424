//! Decision makers and the match driver.
//!
//! An agent turns positions into action distributions. The spectrum runs
//! from uniformly random, through the model's raw intuition, to a full
//! search; a human on stdin fits the same interface.

use std::io::{self, BufRead, BufReader, Stdin};
use std::marker::PhantomData;

use crate::config::SearchConfig;
use crate::game::{Game, Player, Status};
use crate::mcts;
use crate::model::Model;
use crate::{utils, Error, Result};

/// A decision maker for one game type.
pub trait Agent<G: Game> {
    /// Full-length action distribution for the given position.
    fn think(&mut self, game: &G) -> Result<Vec<f32>>;

    /// Samples a concrete action from [`think`](Agent::think).
    fn decide(&mut self, game: &G) -> Result<usize> {
        let policy = self.think(game)?;
        Ok(utils::sample(&policy))
    }
}

/// Plays uniformly random legal actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAgent;

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent
    }
}

impl<G: Game> Agent<G> for RandomAgent {
    fn think(&mut self, game: &G) -> Result<Vec<f32>> {
        if game.status().is_over() {
            return Err(Error::GameOver);
        }
        Ok(utils::uniform_over(G::POLICY_LENGTH, &game.legal_actions()))
    }
}

/// Plays the model's raw policy without any lookahead.
///
/// The policy is masked to the legal actions and cooled by `temperature`;
/// zero temperature collapses to the argmax.
pub struct IntuitionAgent<G: Game, M: Model<G>> {
    model: M,
    temperature: f32,
    _game: PhantomData<G>,
}

impl<G: Game, M: Model<G>> IntuitionAgent<G, M> {
    pub fn new(model: M, temperature: f32) -> Self {
        IntuitionAgent {
            model,
            temperature,
            _game: PhantomData,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<G: Game, M: Model<G>> Agent<G> for IntuitionAgent<G, M> {
    fn think(&mut self, game: &G) -> Result<Vec<f32>> {
        if game.status().is_over() {
            return Err(Error::GameOver);
        }
        let evaluation = self.model.apply(game)?;
        let mut policy = utils::masked_policy(&evaluation.policy, &game.legal_actions());
        utils::apply_temperature(&mut policy, self.temperature);
        Ok(policy)
    }
}

/// Plays the improved policy of a full search.
pub struct MctsAgent<G: Game, M: Model<G>> {
    model: M,
    config: SearchConfig,
    _game: PhantomData<G>,
}

impl<G: Game, M: Model<G> + 'static> MctsAgent<G, M> {
    pub fn new(model: M, config: SearchConfig) -> Self {
        MctsAgent {
            model,
            config,
            _game: PhantomData,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

impl<G: Game, M: Model<G> + 'static> Agent<G> for MctsAgent<G, M> {
    fn think(&mut self, game: &G) -> Result<Vec<f32>> {
        mcts::search_policy(game, &self.model, &self.config)
    }
}

/// Reads action indices from an input source, one decimal number per line.
///
/// Unparseable or illegal input prints a diagnostic and re-prompts; the
/// agent never fails the match over bad input.
pub struct HumanAgent<R: BufRead> {
    input: R,
}

impl HumanAgent<BufReader<Stdin>> {
    pub fn new() -> Self {
        HumanAgent {
            input: BufReader::new(io::stdin()),
        }
    }
}

impl Default for HumanAgent<BufReader<Stdin>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> HumanAgent<R> {
    /// Reads from an arbitrary source instead of stdin.
    pub fn from_reader(input: R) -> Self {
        HumanAgent { input }
    }
}

impl<G: Game, R: BufRead> Agent<G> for HumanAgent<R> {
    fn think(&mut self, game: &G) -> Result<Vec<f32>> {
        if game.status().is_over() {
            return Err(Error::GameOver);
        }
        let legal = game.legal_actions();
        loop {
            println!("your move {:?}: ", legal);
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(Error::Cancelled("input source closed".into()));
            }
            match line.trim().parse::<usize>() {
                Ok(action) if game.is_action_legal(action) => {
                    let mut policy = vec![0.0; G::POLICY_LENGTH];
                    policy[action] = 1.0;
                    return Ok(policy);
                }
                Ok(action) => println!("action {} is not legal here", action),
                Err(_) => println!("could not parse an action index from {:?}", line.trim()),
            }
        }
    }
}

/// Plays `one` against `two` from `start` and returns the terminal status.
///
/// `one` moves for [`Player::One`], `two` for [`Player::Two`]; the
/// returned status is therefore already from player one's perspective.
/// `on_move` runs after every applied move with the new position and the
/// action that produced it.
pub fn pvp<G: Game>(
    one: &mut dyn Agent<G>,
    two: &mut dyn Agent<G>,
    start: &G,
    mut on_move: impl FnMut(&G, usize),
) -> Result<Status> {
    let mut game = start.clone();
    while !game.status().is_over() {
        let action = match game.current_player() {
            Player::One => one.decide(&game)?,
            Player::Two => two.decide(&game)?,
        };
        game = game.apply_action(action)?;
        on_move(&game, action);
    }
    Ok(game.status())
}
