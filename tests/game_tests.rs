use selfzero::games::TicTacToe;
use selfzero::{Error, Game, Player, Status};

/// Applies a sequence of actions, panicking on the first illegal one.
fn play(actions: &[usize]) -> TicTacToe {
    let mut game = TicTacToe::new();
    for &action in actions {
        game = game.apply_action(action).unwrap();
    }
    game
}

#[test]
fn fresh_board_invariants() {
    let game = TicTacToe::new();
    assert_eq!(game.status(), Status::Undecided);
    assert_eq!(game.current_player(), Player::One);

    let legal = game.legal_actions();
    assert_eq!(legal, (0..9).collect::<Vec<_>>());
    for &action in &legal {
        assert!(game.is_action_legal(action));
        assert!(game.apply_action(action).is_ok());
    }
}

#[test]
fn turns_alternate() {
    let game = play(&[4]);
    assert_eq!(game.current_player(), Player::Two);
    let game = game.apply_action(0).unwrap();
    assert_eq!(game.current_player(), Player::One);
}

#[test]
fn illegal_and_finished_moves_fail() {
    let game = TicTacToe::new();
    assert_eq!(game.apply_action(9), Err(Error::IllegalAction(9)));

    let occupied = game.apply_action(4).unwrap();
    assert_eq!(occupied.apply_action(4), Err(Error::IllegalAction(4)));

    // X takes the top row.
    let won = play(&[0, 3, 1, 4, 2]);
    assert_eq!(won.status(), Status::Won(Player::One));
    assert!(won.legal_actions().is_empty());
    assert_eq!(won.apply_action(5), Err(Error::GameOver));
    assert_eq!(won.random_turn().map(|_| ()), Err(Error::GameOver));
}

#[test]
fn outcome_values_are_signed_by_perspective() {
    let won = play(&[0, 3, 1, 4, 2]);
    assert_eq!(won.status().value_for(Player::One), 1.0);
    assert_eq!(won.status().value_for(Player::Two), -1.0);
    assert_eq!(Status::Draw.value_for(Player::One), 0.0);
}

#[test]
fn representation_follows_the_side_to_move() {
    let game = play(&[4]); // X in the center, O to move
    let representation = game.representation();
    assert_eq!(representation.len(), 9);
    assert_eq!(representation[4], -1.0);
    assert_eq!(representation.iter().filter(|&&x| x != 0.0).count(), 1);

    // From X's perspective the same stone is its own.
    let game = game.apply_action(0).unwrap();
    assert_eq!(game.representation()[4], 1.0);
    assert_eq!(game.representation()[0], -1.0);
}

#[test]
fn random_playouts_terminate() {
    selfzero::rng::seed(11);
    for _ in 0..200 {
        let status = TicTacToe::new().random_playout().unwrap();
        assert!(status.is_over());
    }
}

#[test]
fn augment_spans_the_symmetry_group() {
    let game = play(&[0, 4]);
    let mut policy = vec![0.0; 9];
    policy[2] = 0.75;
    policy[6] = 0.25;

    let augmented = game.augment(&policy);
    assert_eq!(augmented.len(), 8);

    // The identity comes first.
    assert_eq!(augmented[0].0, game);
    assert_eq!(augmented[0].1, policy);

    for (mirrored, mirrored_policy) in &augmented {
        assert_eq!(mirrored.status(), game.status());
        assert_eq!(mirrored.current_player(), game.current_player());

        // Probability mass is moved, never created or lost.
        let mut values = mirrored_policy.clone();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut original = policy.clone();
        original.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, original);

        // Each symmetry's inverse is in the group, so augmenting the
        // transformed pair recovers the original pair.
        let back = mirrored.augment(mirrored_policy);
        assert!(back.iter().any(|(g, p)| g == &game && p == &policy));
    }
}

#[test]
fn state_hashes_are_stable_and_discriminating() {
    let a = play(&[0, 4]);
    let b = play(&[0, 4]);
    assert_eq!(a.state_hash(), b.state_hash());
    assert_ne!(a.state_hash(), play(&[4, 0]).state_hash());
}
