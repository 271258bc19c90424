use std::sync::Arc;

use selfzero::games::TicTacToe;
use selfzero::model::{BaseModel, Evaluation, FeatureHead, LinearNet, Model, RolloutModel};
use selfzero::{record_selfplay, Error, Game, Result, Sample, SearchConfig, Status};

/// Every evaluation fails; used to exercise per-game recovery.
#[derive(Clone, Copy)]
struct BrokenModel;

impl Model<TicTacToe> for BrokenModel {
    fn apply(&self, _game: &TicTacToe) -> Result<Evaluation> {
        Err(Error::Io("backend unavailable".into()))
    }

    fn clone_model(&self) -> Box<dyn Model<TicTacToe>> {
        Box::new(*self)
    }

    fn playing_model(&self) -> &dyn Model<TicTacToe> {
        self
    }
}

/// Share of open cells; a feature target that is cheap to verify.
struct OpenCells;

impl FeatureHead<TicTacToe> for OpenCells {
    fn name(&self) -> &str {
        "open-cells"
    }

    fn len(&self) -> usize {
        1
    }

    fn target(&self, game: &TicTacToe, _outcome: Status) -> Vec<f32> {
        vec![game.legal_actions().len() as f32 / 9.0]
    }
}

#[test]
fn selfplay_amplifies_every_move_by_the_symmetry_count() {
    selfzero::rng::seed(21);
    let config = SearchConfig::default().with_power(25);
    let (dataset, report) =
        record_selfplay(&RolloutModel::new(), &TicTacToe::new(), 5, &config);

    assert_eq!(report.games, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(dataset.len(), report.moves * 8);

    for sample in dataset.samples() {
        assert_eq!(sample.state.len(), 9);
        assert_eq!(sample.policy.len(), 9);
        assert!((sample.policy.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!([-1.0, 0.0, 1.0].contains(&sample.value));
        assert!(sample.features.is_empty());
    }
}

#[test]
fn target_values_are_the_outcome_from_the_movers_perspective() {
    selfzero::rng::seed(33);
    let config = SearchConfig::default().with_power(25);
    let (dataset, report) = record_selfplay(&RolloutModel::new(), &TicTacToe::new(), 1, &config);
    assert_eq!(report.games, 1);

    // The last decision point belongs to whoever ended the game: its value
    // is +1 after a win and 0 after a draw.
    let last = &dataset.samples()[(report.moves - 1) * 8];
    assert!(last.value == 1.0 || last.value == 0.0);

    // Perspectives alternate ply by ply.
    if last.value == 1.0 && report.moves >= 2 {
        let previous = &dataset.samples()[(report.moves - 2) * 8];
        assert_eq!(previous.value, -1.0);
    }
}

#[test]
fn failing_games_are_discarded_and_counted() {
    let (dataset, report) =
        record_selfplay(&BrokenModel, &TicTacToe::new(), 3, &SearchConfig::default());

    assert_eq!(report.games, 0);
    assert_eq!(report.failed, 3);
    assert_eq!(report.moves, 0);
    assert!(dataset.is_empty());
}

#[test]
fn recorded_samples_carry_feature_targets() {
    selfzero::rng::seed(3);
    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH + 1);
    let model =
        BaseModel::<TicTacToe>::with_features(Box::new(net), vec![Arc::new(OpenCells)]).unwrap();

    let config = SearchConfig::default().with_power(10);
    let (dataset, report) = record_selfplay(&model, &TicTacToe::new(), 1, &config);

    assert_eq!(report.failed, 0);
    assert_eq!(dataset.features().len(), 1);
    for sample in dataset.samples() {
        assert_eq!(sample.features.len(), 1);
        assert!(sample.features[0] > 0.0 && sample.features[0] <= 1.0);
    }
}

#[test]
fn minibatches_cover_the_dataset_in_order() {
    selfzero::rng::seed(12);
    let config = SearchConfig::default().with_power(10);
    let (dataset, _) = record_selfplay(&RolloutModel::new(), &TicTacToe::new(), 1, &config);

    let collected: Vec<&Sample> = dataset.minibatches(4).flatten().collect();
    assert_eq!(collected.len(), dataset.len());
    for (collected, original) in collected.iter().zip(dataset.samples()) {
        assert_eq!(**collected, *original);
    }
    for batch in dataset.minibatches(4) {
        assert!(batch.len() <= 4);
    }
}
