use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use selfzero::games::TicTacToe;
use selfzero::model::{DummyModel, Evaluation, Model, RolloutModel};
use selfzero::{search_policy, Error, Game, Player, Result, Search, SearchConfig, Status};

fn play(actions: &[usize]) -> TicTacToe {
    let mut game = TicTacToe::new();
    for &action in actions {
        game = game.apply_action(action).unwrap();
    }
    game
}

/// Answers with a fixed policy and value.
#[derive(Clone)]
struct FixedModel {
    value: f32,
    policy: Vec<f32>,
}

impl Model<TicTacToe> for FixedModel {
    fn apply(&self, _game: &TicTacToe) -> Result<Evaluation> {
        Ok(Evaluation {
            value: self.value,
            policy: self.policy.clone(),
            features: Vec::new(),
        })
    }

    fn clone_model(&self) -> Box<dyn Model<TicTacToe>> {
        Box::new(self.clone())
    }

    fn playing_model(&self) -> &dyn Model<TicTacToe> {
        self
    }
}

/// Uniform constant model that counts evaluations and may ask for
/// concurrent traversals.
#[derive(Clone)]
struct ProbeModel {
    evaluations: Arc<AtomicUsize>,
    ntasks: usize,
}

impl ProbeModel {
    fn new(ntasks: usize) -> Self {
        ProbeModel {
            evaluations: Arc::new(AtomicUsize::new(0)),
            ntasks,
        }
    }
}

impl Model<TicTacToe> for ProbeModel {
    fn apply(&self, _game: &TicTacToe) -> Result<Evaluation> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        Ok(Evaluation {
            value: 0.0,
            policy: vec![1.0 / 9.0; 9],
            features: Vec::new(),
        })
    }

    fn clone_model(&self) -> Box<dyn Model<TicTacToe>> {
        Box::new(self.clone())
    }

    fn ntasks(&self) -> usize {
        self.ntasks
    }

    fn playing_model(&self) -> &dyn Model<TicTacToe> {
        self
    }
}

#[test]
fn improved_policy_is_a_distribution_over_legal_actions() {
    selfzero::rng::seed(2);
    let game = play(&[4]);
    let config = SearchConfig::default().with_power(50);
    let policy = search_policy(&game, &DummyModel::new(0.0), &config).unwrap();

    assert_eq!(policy.len(), 9);
    assert_eq!(policy[4], 0.0);
    assert!((policy.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    for (action, &p) in policy.iter().enumerate() {
        if p > 0.0 {
            assert!(game.is_action_legal(action));
        }
    }
}

#[test]
fn a_single_simulation_visits_one_root_child() {
    let model = DummyModel::new(0.0);
    let config = SearchConfig::default().with_power(1);
    let mut search = Search::new(TicTacToe::new(), &model, config).unwrap();
    search.run().unwrap();

    let policy = search.improved_policy();
    assert_eq!(policy.iter().filter(|&&p| p > 0.0).count(), 1);
    assert_eq!(policy.iter().sum::<f32>(), 1.0);
    assert_eq!(search.statistics().simulations, 1);
}

#[test]
fn zero_temperature_finds_the_immediate_win() {
    selfzero::rng::seed(9);
    // X to move with the top row open at 2.
    let game = play(&[0, 3, 1, 7]);
    let config = SearchConfig::default().with_power(50).with_temperature(0.0);
    let policy = search_policy(&game, &RolloutModel::new(), &config).unwrap();

    assert_eq!(policy[2], 1.0);
    assert_eq!(policy.iter().sum::<f32>(), 1.0);
}

#[test]
fn full_dilution_makes_the_root_prior_uniform() {
    // The model is certain about one action; full dilution must erase that.
    let mut policy = vec![0.0; 9];
    policy[8] = 1.0;
    let model = FixedModel { value: 0.0, policy };
    let config = SearchConfig::default().with_power(9).with_dilution(1.0);
    let mut search = Search::new(TicTacToe::new(), &model, config).unwrap();
    search.run().unwrap();

    let root = search.tree().root();
    assert_eq!(root.edges.len(), 9);
    for edge in &root.edges {
        assert!((edge.prior - 1.0 / 9.0).abs() < 1e-6);
    }
}

#[test]
fn a_forked_defender_still_picks_a_reproducible_move() {
    selfzero::rng::seed(13);
    // X holds 0, 4, 5 and threatens both 8 and 3; O loses whatever it
    // plays.
    let game = play(&[0, 1, 4, 2, 5]);
    assert_eq!(game.current_player(), Player::Two);

    let config = SearchConfig::default().with_power(200).with_temperature(0.0);
    let policy = search_policy(&game, &RolloutModel::new(), &config).unwrap();
    assert_eq!(policy.iter().filter(|&&p| p > 0.0).count(), 1);

    // After the best defence, optimal play by X still wins.
    let defence = policy.iter().position(|&p| p == 1.0).unwrap();
    let mut game = game.apply_action(defence).unwrap();
    while !game.status().is_over() {
        let reply = search_policy(&game, &RolloutModel::new(), &config).unwrap();
        game = game.apply_action(reply.iter().position(|&p| p == 1.0).unwrap()).unwrap();
    }
    assert_eq!(game.status(), Status::Won(Player::One));
    assert_eq!(game.status().value_for(Player::Two), -1.0);
}

#[test]
fn decided_and_forced_roots_short_circuit() {
    let finished = play(&[0, 3, 1, 4, 2]);
    assert_eq!(
        search_policy(&finished, &DummyModel::new(0.0), &SearchConfig::default()),
        Err(Error::GameOver)
    );

    // One open cell left: the one-hot comes back without consulting the
    // model at all.
    let forced = play(&[0, 3, 1, 5, 4, 7, 6, 8]);
    let probe = ProbeModel::new(1);
    let policy = search_policy(&forced, &probe, &SearchConfig::default()).unwrap();
    assert_eq!(policy[2], 1.0);
    assert_eq!(probe.evaluations.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_traversals_settle_cleanly() {
    let model = ProbeModel::new(4);
    let config = SearchConfig::default().with_power(40);
    let mut search = Search::new(TicTacToe::new(), &model, config).unwrap();
    search.run().unwrap();

    assert_eq!(search.statistics().simulations, 40);
    let root = search.tree().root();
    assert_eq!(root.visit_total(), 40);
    for edge in &root.edges {
        assert_eq!(edge.virtual_visits, 0);
    }
}

#[test]
fn the_deadline_ends_the_search_early() {
    let model = DummyModel::new(0.0);
    let config = SearchConfig::default()
        .with_power(1_000_000)
        .with_max_time(Duration::ZERO);
    let mut search = Search::new(TicTacToe::new(), &model, config).unwrap();
    search.run().unwrap();

    assert!(search.statistics().stopped_early);
    assert!(search.statistics().simulations < 1_000_000);
}

#[test]
fn nonsense_configurations_are_rejected() {
    assert!(SearchConfig::default().with_power(0).validate().is_err());
    assert!(SearchConfig::default().with_dilution(1.5).validate().is_err());
    assert!(SearchConfig::default()
        .with_temperature(-1.0)
        .validate()
        .is_err());

    let model = DummyModel::new(0.0);
    assert!(matches!(
        Search::new(TicTacToe::new(), &model, SearchConfig::default().with_power(0)),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn model_failures_abort_the_search() {
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

    let model = BrokenModel;
    let mut search = Search::new(TicTacToe::new(), &model, SearchConfig::default()).unwrap();
    assert_eq!(search.run(), Err(Error::Io("backend unavailable".into())));
}
