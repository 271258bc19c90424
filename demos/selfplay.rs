//! Records self-play games and trains the built-in linear model on them.
//!
//! A toy end-to-end run of the learning loop: search-guided self-play,
//! symmetry-amplified dataset, a few epochs of SGD on the composite loss.

use selfzero::games::TicTacToe;
use selfzero::loss::{evaluate_loss, train_step, LossConfig, Sgd};
use selfzero::model::{BaseModel, LinearNet};
use selfzero::{record_selfplay, Game, SearchConfig};

fn main() -> selfzero::Result<()> {
    env_logger::init();
    selfzero::rng::seed(42);

    let net = LinearNet::new(TicTacToe::SHAPE, 1 + TicTacToe::POLICY_LENGTH);
    let mut model = BaseModel::<TicTacToe>::new(Box::new(net))?;

    let search = SearchConfig::default().with_power(50).with_dilution(0.25);
    let (dataset, report) = record_selfplay(&model, &TicTacToe::new(), 20, &search);
    println!(
        "recorded {} games ({} moves, {} samples, {} failed)",
        report.games,
        report.moves,
        dataset.len(),
        report.failed
    );

    let loss = LossConfig::default().with_l2(1e-4);
    let mut optimizer = Sgd::new(0.05);

    let before = evaluate_loss(&model, dataset.samples(), &loss)?;
    println!("loss before training: {:.4}", before.total());

    for epoch in 0..10 {
        let mut epoch_loss = 0.0;
        let mut batches = 0;
        for batch in dataset.minibatches(32) {
            epoch_loss += train_step(&mut model, batch, &loss, &mut optimizer)?.total();
            batches += 1;
        }
        println!("epoch {:2}: loss {:.4}", epoch, epoch_loss / batches as f32);
    }

    let after = evaluate_loss(&model, dataset.samples(), &loss)?;
    println!("loss after training: {:.4}", after.total());
    Ok(())
}
