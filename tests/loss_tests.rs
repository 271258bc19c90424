use std::sync::Arc;

use selfzero::games::TicTacToe;
use selfzero::loss::{
    evaluate_loss, policy_crossentropy, train_step, value_mse, LossConfig, LossTerms, Sgd,
};
use selfzero::model::{BaseModel, FeatureHead, LinearNet, LogitNet, Model};
use selfzero::{Game, Sample, Status};

struct OpenCells;

impl FeatureHead<TicTacToe> for OpenCells {
    fn name(&self) -> &str {
        "open-cells"
    }

    fn len(&self) -> usize {
        1
    }

    fn weight(&self) -> f32 {
        0.5
    }

    fn target(&self, game: &TicTacToe, _outcome: Status) -> Vec<f32> {
        vec![game.legal_actions().len() as f32 / 9.0]
    }
}

fn one_hot(action: usize) -> Vec<f32> {
    let mut policy = vec![0.0; 9];
    policy[action] = 1.0;
    policy
}

#[test]
fn elementary_losses_match_their_definitions() {
    assert_eq!(value_mse(0.5, 1.0), 0.25);
    assert_eq!(value_mse(-1.0, 1.0), 4.0);

    let uniform = vec![1.0 / 4.0; 4];
    let target = vec![0.0, 1.0, 0.0, 0.0];
    assert!((policy_crossentropy(&uniform, &target) - (4.0f32).ln()).abs() < 1e-4);
}

#[test]
fn the_zero_model_loss_matches_the_closed_form() {
    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH);
    let model = BaseModel::<TicTacToe>::new(Box::new(net)).unwrap();
    let sample = Sample {
        state: TicTacToe::new().representation(),
        policy: one_hot(4),
        value: 1.0,
        features: Vec::new(),
    };

    let terms = evaluate_loss(&model, &[sample], &LossConfig::default()).unwrap();
    // tanh(0) = 0 against a target of 1, and a uniform policy against a
    // one-hot: MSE 1 and CE ln 9.
    assert!((terms.value - 1.0).abs() < 1e-5);
    assert!((terms.policy - (9.0f32).ln()).abs() < 1e-4);
    assert_eq!(terms.features, 0.0);
    assert_eq!(terms.regularization, 0.0);
    assert!((terms.total() - (1.0 + (9.0f32).ln())).abs() < 1e-4);
}

#[test]
fn regularization_sums_only_flagged_tensors() {
    selfzero::rng::seed(19);
    let net = LinearNet::randomized(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH, 0.5);
    let expected_norm = net.l2_norm();
    let model = BaseModel::<TicTacToe>::new(Box::new(net)).unwrap();

    let config = LossConfig::default().with_l2(0.01);
    let sample = Sample {
        state: TicTacToe::new().representation(),
        policy: one_hot(0),
        value: 0.0,
        features: Vec::new(),
    };
    let terms = evaluate_loss(&model, &[sample], &config).unwrap();
    assert!((terms.regularization - 0.01 * expected_norm).abs() < 1e-5);
    assert!(expected_norm > 0.0);
}

#[test]
fn feature_heads_contribute_their_weighted_term() {
    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH + 1);
    let model =
        BaseModel::<TicTacToe>::with_features(Box::new(net), vec![Arc::new(OpenCells)]).unwrap();
    let sample = Sample {
        state: TicTacToe::new().representation(),
        policy: one_hot(0),
        value: 0.0,
        features: vec![1.0],
    };

    let terms = evaluate_loss(&model, &[sample], &LossConfig::default()).unwrap();
    // The zero net predicts 0 against a target of 1, halved by the head
    // weight.
    assert!((terms.features - 0.5).abs() < 1e-5);
}

#[test]
fn empty_batches_cost_nothing() {
    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH);
    let mut model = BaseModel::<TicTacToe>::new(Box::new(net)).unwrap();
    let config = LossConfig::default();
    let mut optimizer = Sgd::new(0.1);

    assert_eq!(
        evaluate_loss(&model, &[], &config).unwrap(),
        LossTerms::default()
    );
    assert_eq!(
        train_step(&mut model, &[], &config, &mut optimizer).unwrap(),
        LossTerms::default()
    );
}

#[test]
fn gradient_descent_reduces_the_loss() {
    selfzero::rng::seed(8);
    let net = LinearNet::randomized(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH, 0.1);
    let mut model = BaseModel::<TicTacToe>::new(Box::new(net)).unwrap();

    let board = TicTacToe::new();
    let center = board.apply_action(4).unwrap();
    let samples = vec![
        Sample {
            state: board.representation(),
            policy: one_hot(4),
            value: 0.0,
            features: Vec::new(),
        },
        Sample {
            state: center.representation(),
            policy: one_hot(0),
            value: 0.0,
            features: Vec::new(),
        },
    ];

    let config = LossConfig::default().with_l2(1e-4);
    let mut optimizer = Sgd::new(0.1);
    let before = evaluate_loss(&model, &samples, &config).unwrap().total();
    for _ in 0..50 {
        train_step(&mut model, &samples, &config, &mut optimizer).unwrap();
    }
    let after = evaluate_loss(&model, &samples, &config).unwrap().total();

    assert!(after < before, "loss went from {} to {}", before, after);
}

#[test]
fn training_moves_the_policy_toward_its_target() {
    selfzero::rng::seed(27);
    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH);
    let mut model = BaseModel::<TicTacToe>::new(Box::new(net)).unwrap();

    let center = TicTacToe::new().apply_action(4).unwrap();
    let sample = Sample {
        state: center.representation(),
        policy: one_hot(0),
        value: -1.0,
        features: Vec::new(),
    };

    let config = LossConfig::default();
    let mut optimizer = Sgd::new(0.5);
    for _ in 0..100 {
        train_step(&mut model, std::slice::from_ref(&sample), &config, &mut optimizer).unwrap();
    }

    let evaluation = model.apply(&center).unwrap();
    assert!(evaluation.policy[0] > 0.5);
    assert!(evaluation.value < -0.5);
}
