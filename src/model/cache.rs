//! Evaluation cache keyed by position hash.
//!
//! Short-horizon games revisit positions constantly through transpositions;
//! memoizing `(value, policy)` pairs spares the inner model those repeat
//! evaluations. The cache uses bounded admission: once full, new entries
//! are computed but not inserted, and nothing is ever evicted.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::game::Game;
use crate::model::{Backend, Evaluation, Model};
use crate::{Error, Result};

/// Memoizing wrapper around a model.
///
/// Only value and policy are cached; feature output is refused with
/// [`Error::FeatureUnsupported`] because replaying it through the cache
/// would defeat the point of the wrapper.
pub struct Cached<G: Game, M: Model<G>> {
    inner: M,
    entries: Mutex<HashMap<u64, (f32, Vec<f32>)>>,
    max_cachesize: usize,
    calls_cached: AtomicU64,
    calls_uncached: AtomicU64,
    _game: PhantomData<G>,
}

impl<G: Game, M: Model<G>> Cached<G, M> {
    /// Wraps `inner` with a cache of at most `max_cachesize` entries.
    pub fn new(inner: M, max_cachesize: usize) -> Self {
        Cached {
            inner,
            entries: Mutex::new(HashMap::new()),
            max_cachesize,
            calls_cached: AtomicU64::new(0),
            calls_uncached: AtomicU64::new(0),
            _game: PhantomData,
        }
    }

    /// Number of calls answered from the cache.
    pub fn calls_cached(&self) -> u64 {
        self.calls_cached.load(Ordering::Relaxed)
    }

    /// Number of calls delegated to the inner model.
    pub fn calls_uncached(&self) -> u64 {
        self.calls_uncached.load(Ordering::Relaxed)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries and resets the counters.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        self.calls_cached.store(0, Ordering::Relaxed);
        self.calls_uncached.store(0, Ordering::Relaxed);
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<G: Game, M: Model<G> + Clone> Clone for Cached<G, M> {
    fn clone(&self) -> Self {
        Cached {
            inner: self.inner.clone(),
            entries: Mutex::new(self.entries.lock().unwrap().clone()),
            max_cachesize: self.max_cachesize,
            calls_cached: AtomicU64::new(self.calls_cached()),
            calls_uncached: AtomicU64::new(self.calls_uncached()),
            _game: PhantomData,
        }
    }
}

impl<G: Game, M: Model<G> + Clone + 'static> Model<G> for Cached<G, M> {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        let key = game.state_hash();
        if let Some((value, policy)) = self.entries.lock().unwrap().get(&key) {
            self.calls_cached.fetch_add(1, Ordering::Relaxed);
            return Ok(Evaluation {
                value: *value,
                policy: policy.clone(),
                features: Vec::new(),
            });
        }
        let evaluation = self.inner.apply(game)?;
        self.calls_uncached.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap();
        if entries.len() < self.max_cachesize {
            entries.insert(key, (evaluation.value, evaluation.policy.clone()));
        }
        Ok(Evaluation {
            features: Vec::new(),
            ..evaluation
        })
    }

    // The default elementwise apply_batch is exactly the sequential
    // delegation the cache supports; batched use is discouraged anyway.

    fn clone_model(&self) -> Box<dyn Model<G>> {
        Box::new(self.clone())
    }

    fn swap(&self) -> Result<Box<dyn Model<G>>> {
        log::warn!("swap is not supported through an evaluation cache; returning the wrapper unchanged");
        Ok(self.clone_model())
    }

    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn trainable(&self) -> bool {
        self.inner.trainable()
    }

    fn ntasks(&self) -> usize {
        self.inner.ntasks()
    }

    fn feature_output(&self, _game: &G) -> Result<Vec<f32>> {
        Err(Error::FeatureUnsupported(
            "feature output is disabled through an evaluation cache".into(),
        ))
    }

    fn base_model(&self) -> Option<&dyn Model<G>> {
        Some(self.inner.base_model().unwrap_or(&self.inner))
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
