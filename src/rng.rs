//! Process-wide random source with explicit seeding support.
//!
//! Every random draw in the crate (playouts, random agents, action
//! sampling from softened distributions) goes through this module, so a
//! single [`seed`] call makes a whole run reproducible in single-task
//! search mode; batched evaluation is inherently order-dependent.

use std::sync::{Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::SeedableRng;

static SOURCE: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn source() -> &'static Mutex<StdRng> {
    SOURCE.get_or_init(|| Mutex::new(StdRng::from_entropy()))
}

/// Reseeds the process-wide generator.
pub fn seed(seed: u64) {
    *source().lock().unwrap() = StdRng::seed_from_u64(seed);
}

/// Runs `f` with exclusive access to the process-wide generator.
///
/// Keep the closure short; it holds the generator lock.
pub fn with<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    let mut rng = source().lock().unwrap();
    f(&mut rng)
}
