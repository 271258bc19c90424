//! Self-play recording into training datasets.
//!
//! Every non-terminal position of a self-play game contributes one record:
//! its representation, the search's improved policy, a value that is
//! filled in with the final outcome once the game ends, and the feature
//! targets of the model's auxiliary heads. Symmetry augmentation then
//! multiplies each record across the game's symmetry group.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::game::Game;
use crate::mcts;
use crate::model::{FeatureHead, Model};
use crate::{utils, Result};

/// One training record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Flattened position representation, side-to-move perspective.
    pub state: Vec<f32>,

    /// Full-length target policy.
    pub policy: Vec<f32>,

    /// Final outcome from this position's side-to-move perspective.
    pub value: f32,

    /// Concatenated feature targets, head order.
    pub features: Vec<f32>,
}

/// An ordered collection of training records for one game type.
pub struct DataSet<G: Game> {
    samples: Vec<Sample>,
    features: Vec<Arc<dyn FeatureHead<G>>>,
}

impl<G: Game> DataSet<G> {
    /// An empty dataset whose records carry targets for `features`.
    pub fn new(features: Vec<Arc<dyn FeatureHead<G>>>) -> Self {
        DataSet {
            samples: Vec::new(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The feature heads whose targets the records carry.
    pub fn features(&self) -> &[Arc<dyn FeatureHead<G>>] {
        &self.features
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Appends all records of `other`.
    pub fn extend(&mut self, other: DataSet<G>) {
        self.samples.extend(other.samples);
    }

    /// Consecutive minibatches of at most `size` records.
    pub fn minibatches(&self, size: usize) -> impl Iterator<Item = &[Sample]> {
        self.samples.chunks(size.max(1))
    }
}

impl<G: Game> Clone for DataSet<G> {
    fn clone(&self) -> Self {
        DataSet {
            samples: self.samples.clone(),
            features: self.features.clone(),
        }
    }
}

/// Outcome of a recording run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfPlayReport {
    /// Games recorded completely
    pub games: usize,

    /// Games discarded after a mid-game failure
    pub failed: usize,

    /// Total moves across the recorded games, before augmentation
    pub moves: usize,
}

/// Records `count` games of the model playing itself via search.
///
/// A failure inside one game discards that game's partial record and the
/// run continues with the next game; the report counts the casualties.
pub fn record_selfplay<G: Game, M: Model<G>>(
    model: &M,
    start: &G,
    count: usize,
    config: &SearchConfig,
) -> (DataSet<G>, SelfPlayReport) {
    let heads = model.features();
    let mut dataset = DataSet::new(heads.clone());
    let mut report = SelfPlayReport::default();
    for _ in 0..count {
        match record_game(model, start, config, &heads) {
            Ok((samples, moves)) => {
                report.games += 1;
                report.moves += moves;
                dataset.samples.extend(samples);
            }
            Err(error) => {
                log::warn!("discarding a self-play game after an error: {}", error);
                report.failed += 1;
            }
        }
    }
    (dataset, report)
}

fn record_game<G: Game, M: Model<G>>(
    model: &M,
    start: &G,
    config: &SearchConfig,
    heads: &[Arc<dyn FeatureHead<G>>],
) -> Result<(Vec<Sample>, usize)> {
    let mut game = start.clone();
    let mut recorded: Vec<(G, Vec<f32>)> = Vec::new();
    while !game.status().is_over() {
        let policy = mcts::search_policy(&game, model, config)?;
        recorded.push((game.clone(), policy.clone()));
        let action = utils::sample(&policy);
        game = game.apply_action(action)?;
    }

    let outcome = game.status();
    let moves = recorded.len();
    let mut samples = Vec::new();
    for (position, policy) in recorded {
        let value = outcome.value_for(position.current_player());
        let features: Vec<f32> = heads
            .iter()
            .flat_map(|head| head.target(&position, outcome))
            .collect();
        for (mirrored, mirrored_policy) in position.augment(&policy) {
            samples.push(Sample {
                state: mirrored.representation(),
                policy: mirrored_policy,
                value,
                features: features.clone(),
            });
        }
    }
    Ok((samples, moves))
}
