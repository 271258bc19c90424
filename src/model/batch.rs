//! Request-coalescing wrapper.
//!
//! Network backends pay a fixed cost per invocation, so evaluating one
//! position at a time wastes most of their throughput. [`Batched`] funnels
//! concurrently issued single-position requests through a bounded queue
//! into a collector thread, which assembles them into one batched call on
//! the inner model and delivers the results back in request order.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::game::Game;
use crate::model::{Backend, Evaluation, FeatureHead, Model};
use crate::{Error, Result};

struct Request<G: Game> {
    game: G,
    slot: mpsc::Sender<Result<Evaluation>>,
}

/// Batching wrapper around a model.
///
/// A batch is flushed when `max_batchsize` requests have accumulated or
/// `max_wait` has elapsed since the first queued request, whichever comes
/// first. [`ntasks`](Model::ntasks) advertises `max_batchsize` so the
/// search keeps that many traversals in flight.
///
/// Callers block inside [`apply`](Model::apply) until their slot is
/// filled. A caller that gives up simply drops its receiver; the collector
/// still evaluates the request and discards the result. When the inner
/// model fails, the same error is replicated to every request in that
/// batch and the collector keeps accepting new work.
pub struct Batched<G: Game> {
    inner: Arc<dyn Model<G>>,
    queue: mpsc::SyncSender<Request<G>>,
    max_batchsize: usize,
    max_wait: Duration,
}

impl<G: Game> Batched<G> {
    pub fn new<M: Model<G> + 'static>(
        inner: M,
        max_batchsize: usize,
        max_wait: Duration,
    ) -> Result<Self> {
        if max_batchsize == 0 {
            return Err(Error::InvalidConfiguration(
                "max_batchsize must be at least 1".into(),
            ));
        }
        let inner: Arc<dyn Model<G>> = Arc::new(inner);
        Ok(Self::from_arc(inner, max_batchsize, max_wait))
    }

    fn from_arc(inner: Arc<dyn Model<G>>, max_batchsize: usize, max_wait: Duration) -> Self {
        let queue = spawn_collector(inner.clone(), max_batchsize, max_wait);
        Batched {
            inner,
            queue,
            max_batchsize,
            max_wait,
        }
    }

    fn enqueue(&self, game: &G) -> Result<mpsc::Receiver<Result<Evaluation>>> {
        let (slot, result) = mpsc::channel();
        self.queue
            .send(Request {
                game: game.clone(),
                slot,
            })
            .map_err(|_| Error::Cancelled("the evaluation collector is gone".into()))?;
        Ok(result)
    }
}

impl<G: Game> Clone for Batched<G> {
    /// Shallow copy sharing the collector and the inner model; use
    /// [`clone_model`](Model::clone_model) for an independent deep copy.
    fn clone(&self) -> Self {
        Batched {
            inner: self.inner.clone(),
            queue: self.queue.clone(),
            max_batchsize: self.max_batchsize,
            max_wait: self.max_wait,
        }
    }
}

/// The collector owns the queue: it drains requests into batches, runs the
/// inner model once per batch, and fills the completion slots in queue
/// order. It exits when every handle to the wrapper has been dropped.
fn spawn_collector<G: Game>(
    inner: Arc<dyn Model<G>>,
    max_batchsize: usize,
    max_wait: Duration,
) -> mpsc::SyncSender<Request<G>> {
    let (queue, requests) = mpsc::sync_channel::<Request<G>>(2 * max_batchsize);
    thread::spawn(move || {
        while let Ok(first) = requests.recv() {
            let mut batch = vec![first];
            let deadline = Instant::now() + max_wait;
            while batch.len() < max_batchsize {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                match requests.recv_timeout(left) {
                    Ok(request) => batch.push(request),
                    Err(_) => break,
                }
            }
            log::debug!("evaluating a batch of {}", batch.len());
            let games: Vec<G> = batch.iter().map(|request| request.game.clone()).collect();
            match inner.apply_batch(&games) {
                Ok(evaluations) => {
                    for (request, evaluation) in batch.into_iter().zip(evaluations) {
                        // A closed slot means the caller gave up; the
                        // result is discarded.
                        let _ = request.slot.send(Ok(evaluation));
                    }
                }
                Err(error) => {
                    for request in batch {
                        let _ = request.slot.send(Err(error.clone()));
                    }
                }
            }
        }
    });
    queue
}

impl<G: Game> Model<G> for Batched<G> {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        self.enqueue(game)?
            .recv()
            .map_err(|_| Error::Cancelled("the evaluation collector dropped the request".into()))?
    }

    fn apply_batch(&self, games: &[G]) -> Result<Vec<Evaluation>> {
        // Enqueue everything before waiting so the whole slice can share
        // collector batches.
        let slots = games
            .iter()
            .map(|game| self.enqueue(game))
            .collect::<Result<Vec<_>>>()?;
        slots
            .into_iter()
            .map(|slot| {
                slot.recv().map_err(|_| {
                    Error::Cancelled("the evaluation collector dropped the request".into())
                })?
            })
            .collect()
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        let inner = self.inner.clone_model();
        Box::new(Self::from_arc(
            Arc::from(inner),
            self.max_batchsize,
            self.max_wait,
        ))
    }

    fn swap(&self) -> Result<Box<dyn Model<G>>> {
        log::warn!("swap is not supported through a batching wrapper; returning the wrapper unchanged");
        Ok(Box::new(self.clone()))
    }

    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn trainable(&self) -> bool {
        self.inner.trainable()
    }

    fn ntasks(&self) -> usize {
        self.max_batchsize
    }

    fn features(&self) -> Vec<Arc<dyn FeatureHead<G>>> {
        self.inner.features()
    }

    fn base_model(&self) -> Option<&dyn Model<G>> {
        Some(self.inner.base_model().unwrap_or(&*self.inner))
    }

    fn playing_model(&self) -> &dyn Model<G> {
        self
    }

    fn training_model(&self) -> Option<&dyn Model<G>> {
        self.inner.training_model()
    }

    fn l2_norm(&self) -> f32 {
        self.inner.l2_norm()
    }
}
