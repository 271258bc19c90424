//! Interactive Tic-Tac-Toe against the search.
//!
//! You play X (player one) from stdin; the engine answers with a
//! rollout-guided search.

use selfzero::games::TicTacToe;
use selfzero::model::RolloutModel;
use selfzero::{pvp, HumanAgent, MctsAgent, Player, SearchConfig, Status};

fn main() -> selfzero::Result<()> {
    env_logger::init();

    println!("Tic-Tac-Toe");
    println!("===========");
    println!("enter a cell index 0-8 (row-major) to move");
    println!();

    let game = TicTacToe::new();
    println!("{}", game);

    let config = SearchConfig::default()
        .with_power(1_000)
        .with_temperature(0.0);

    let mut human = HumanAgent::new();
    let mut engine = MctsAgent::new(RolloutModel::new(), config);

    let status = pvp(&mut human, &mut engine, &game, |position, action| {
        println!("played {}", action);
        println!("{}", position);
    })?;

    match status {
        Status::Won(Player::One) => println!("you win!"),
        Status::Won(Player::Two) => println!("the engine wins!"),
        _ => println!("draw"),
    }
    Ok(())
}
