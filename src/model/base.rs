//! Trainable model assembled from a logit-producing network.
//!
//! The engine never differentiates anything itself: it consumes a network
//! through the [`LogitNet`] trait, which exposes a forward pass, parameter
//! tensors, layer descriptors for persistence, and analytic parameter
//! gradients for given output-logit gradients. [`BaseModel`] turns such a
//! network into a [`Model`] by applying `tanh` to the first logit and a
//! softmax over the next `POLICY_LENGTH` logits; any remaining logits are
//! raw feature outputs.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::game::Game;
use crate::model::persist::{LayerDescriptor, SavedModel};
use crate::model::{Backend, Evaluation, FeatureHead, Model};
use crate::{rng, utils, Error, Result};

/// A differentiable producer of raw output logits.
///
/// Networks implement this outside the crate; [`LinearNet`] is the one
/// built-in producer, just deep enough to exercise training and
/// persistence end to end.
pub trait LogitNet: Send + Sync {
    /// Expected input tensor shape `(height, width, channels)`.
    fn input_shape(&self) -> (usize, usize, usize);

    /// Number of output logits.
    fn output_len(&self) -> usize;

    fn forward(&self, input: &[f32]) -> Vec<f32>;

    fn forward_batch(&self, inputs: &[Vec<f32>]) -> Vec<Vec<f32>> {
        inputs.iter().map(|input| self.forward(input)).collect()
    }

    /// Parameter tensors in layer order.
    fn tensors(&self) -> Vec<Vec<f32>>;

    fn tensors_mut(&mut self) -> Vec<&mut Vec<f32>>;

    /// Replaces all parameter tensors. Fails on a layout mismatch.
    fn load_tensors(&mut self, tensors: &[Vec<f32>]) -> Result<()>;

    /// One descriptor per parameter tensor, in layer order.
    fn layers(&self) -> Vec<LayerDescriptor>;

    /// Mean parameter gradients over a batch, given per-sample gradients
    /// with respect to the output logits. One gradient tensor per
    /// parameter tensor, in layer order.
    fn gradient(&self, inputs: &[Vec<f32>], output_grads: &[Vec<f32>]) -> Vec<Vec<f32>>;

    /// Sum of squared parameters over regularizable tensors.
    fn l2_norm(&self) -> f32;

    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    /// Equivalent network on the other backend.
    fn swap(&self) -> Result<Box<dyn LogitNet>>;

    fn clone_net(&self) -> Box<dyn LogitNet>;
}

/// Single affine map from the flattened representation to the logits.
///
/// Weights are regularizable, the bias is not.
#[derive(Debug, Clone)]
pub struct LinearNet {
    input_shape: (usize, usize, usize),
    outputs: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearNet {
    /// Zero-initialized map: uniform policy, neutral value.
    pub fn new(input_shape: (usize, usize, usize), outputs: usize) -> Self {
        let inputs = input_shape.0 * input_shape.1 * input_shape.2;
        LinearNet {
            input_shape,
            outputs,
            weights: vec![0.0; outputs * inputs],
            bias: vec![0.0; outputs],
        }
    }

    /// Weights drawn uniformly from `[-scale, scale]`, zero bias.
    pub fn randomized(input_shape: (usize, usize, usize), outputs: usize, scale: f32) -> Self {
        let mut net = Self::new(input_shape, outputs);
        rng::with(|r| {
            use rand::Rng;
            for weight in net.weights.iter_mut() {
                *weight = r.gen_range(-scale..=scale);
            }
        });
        net
    }

    /// Rebuilds the map from a deserialized model.
    pub fn from_saved(saved: &SavedModel) -> Result<Self> {
        let layers = saved.layers.as_slice();
        let [dense, bias] = layers else {
            return Err(Error::Load(format!(
                "expected a dense and a bias layer, found {} layers",
                layers.len()
            )));
        };
        if dense.kind != "dense" || bias.kind != "bias" || dense.shape.len() != 4 {
            return Err(Error::Load("layer table does not describe an affine map".into()));
        }
        let input_shape = (dense.shape[1], dense.shape[2], dense.shape[3]);
        let mut net = Self::new(input_shape, dense.shape[0]);
        net.load_tensors(&saved.tensors)?;
        Ok(net)
    }

    fn inputs(&self) -> usize {
        self.input_shape.0 * self.input_shape.1 * self.input_shape.2
    }
}

impl LogitNet for LinearNet {
    fn input_shape(&self) -> (usize, usize, usize) {
        self.input_shape
    }

    fn output_len(&self) -> usize {
        self.outputs
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let inputs = self.inputs();
        (0..self.outputs)
            .map(|o| {
                let row = &self.weights[o * inputs..(o + 1) * inputs];
                self.bias[o] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>()
            })
            .collect()
    }

    fn tensors(&self) -> Vec<Vec<f32>> {
        vec![self.weights.clone(), self.bias.clone()]
    }

    fn tensors_mut(&mut self) -> Vec<&mut Vec<f32>> {
        vec![&mut self.weights, &mut self.bias]
    }

    fn load_tensors(&mut self, tensors: &[Vec<f32>]) -> Result<()> {
        let [weights, bias] = tensors else {
            return Err(Error::Load(format!(
                "expected 2 parameter tensors, found {}",
                tensors.len()
            )));
        };
        if weights.len() != self.weights.len() || bias.len() != self.bias.len() {
            return Err(Error::Load("parameter tensor sizes do not match".into()));
        }
        self.weights.copy_from_slice(weights);
        self.bias.copy_from_slice(bias);
        Ok(())
    }

    fn layers(&self) -> Vec<LayerDescriptor> {
        vec![
            LayerDescriptor {
                kind: "dense".into(),
                shape: vec![
                    self.outputs,
                    self.input_shape.0,
                    self.input_shape.1,
                    self.input_shape.2,
                ],
                regularize: true,
            },
            LayerDescriptor {
                kind: "bias".into(),
                shape: vec![self.outputs],
                regularize: false,
            },
        ]
    }

    fn gradient(&self, inputs: &[Vec<f32>], output_grads: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let width = self.inputs();
        let mut weight_grad = vec![0.0; self.weights.len()];
        let mut bias_grad = vec![0.0; self.bias.len()];
        let scale = 1.0 / inputs.len().max(1) as f32;
        for (input, grads) in inputs.iter().zip(output_grads) {
            for (o, &g) in grads.iter().enumerate() {
                bias_grad[o] += g * scale;
                let row = &mut weight_grad[o * width..(o + 1) * width];
                for (slot, &x) in row.iter_mut().zip(input) {
                    *slot += g * x * scale;
                }
            }
        }
        vec![weight_grad, bias_grad]
    }

    fn l2_norm(&self) -> f32 {
        self.weights.iter().map(|w| w * w).sum()
    }

    fn swap(&self) -> Result<Box<dyn LogitNet>> {
        // There is no device counterpart for the built-in map.
        Ok(self.clone_net())
    }

    fn clone_net(&self) -> Box<dyn LogitNet> {
        Box::new(self.clone())
    }
}

/// A trainable [`Model`] wrapping a [`LogitNet`].
///
/// The network must emit `1 + POLICY_LENGTH + Σ feature lengths` logits
/// for inputs of the game's representation shape; both are checked at
/// construction.
pub struct BaseModel<G: Game> {
    net: Box<dyn LogitNet>,
    heads: Vec<Arc<dyn FeatureHead<G>>>,
    feature_len: usize,
    _game: PhantomData<G>,
}

impl<G: Game> BaseModel<G> {
    pub fn new(net: Box<dyn LogitNet>) -> Result<Self> {
        Self::with_features(net, Vec::new())
    }

    pub fn with_features(
        net: Box<dyn LogitNet>,
        heads: Vec<Arc<dyn FeatureHead<G>>>,
    ) -> Result<Self> {
        if net.input_shape() != G::SHAPE {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", G::SHAPE),
                actual: format!("{:?}", net.input_shape()),
            });
        }
        let feature_len: usize = heads.iter().map(|head| head.len()).sum();
        let expected = 1 + G::POLICY_LENGTH + feature_len;
        if net.output_len() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{} logits", expected),
                actual: format!("{} logits", net.output_len()),
            });
        }
        Ok(BaseModel {
            net,
            heads,
            feature_len,
            _game: PhantomData,
        })
    }

    /// Rebuilds a model from a deserialized header and tensors.
    ///
    /// The caller supplies a network of the right architecture; feature
    /// heads are not persisted and can be re-attached with
    /// [`with_features`](BaseModel::with_features).
    pub fn restore(mut net: Box<dyn LogitNet>, saved: &SavedModel) -> Result<Self> {
        if saved.game != G::NAME {
            return Err(Error::Load(format!(
                "model was saved for game '{}', expected '{}'",
                saved.game,
                G::NAME
            )));
        }
        if net.layers() != saved.layers {
            return Err(Error::Load(
                "network layers do not match the saved descriptors".into(),
            ));
        }
        net.load_tensors(&saved.tensors)?;
        BaseModel::new(net)
    }

    pub fn net(&self) -> &dyn LogitNet {
        &*self.net
    }

    pub fn net_mut(&mut self) -> &mut dyn LogitNet {
        &mut *self.net
    }

    /// Total feature output length across all heads.
    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    /// Forward pass on a raw representation, bypassing the game.
    ///
    /// Used by the loss, which works on recorded representations.
    pub fn evaluate_state(&self, state: &[f32]) -> Result<Evaluation> {
        let (h, w, c) = self.net.input_shape();
        if state.len() != h * w * c {
            return Err(Error::ShapeMismatch {
                expected: format!("{} entries", h * w * c),
                actual: format!("{} entries", state.len()),
            });
        }
        Ok(self.split(self.net.forward(state)))
    }

    fn split(&self, logits: Vec<f32>) -> Evaluation {
        let policy_end = 1 + G::POLICY_LENGTH;
        Evaluation {
            value: logits[0].tanh(),
            policy: utils::softmax(&logits[1..policy_end]),
            features: logits[policy_end..].to_vec(),
        }
    }
}

impl<G: Game> Clone for BaseModel<G> {
    fn clone(&self) -> Self {
        BaseModel {
            net: self.net.clone_net(),
            heads: self.heads.clone(),
            feature_len: self.feature_len,
            _game: PhantomData,
        }
    }
}

impl<G: Game> Model<G> for BaseModel<G> {
    fn apply(&self, game: &G) -> Result<Evaluation> {
        self.evaluate_state(&game.representation())
    }

    fn apply_batch(&self, games: &[G]) -> Result<Vec<Evaluation>> {
        let inputs: Vec<Vec<f32>> = games.iter().map(|game| game.representation()).collect();
        let (h, w, c) = self.net.input_shape();
        if let Some(bad) = inputs.iter().find(|input| input.len() != h * w * c) {
            return Err(Error::ShapeMismatch {
                expected: format!("{} entries", h * w * c),
                actual: format!("{} entries", bad.len()),
            });
        }
        Ok(self
            .net
            .forward_batch(&inputs)
            .into_iter()
            .map(|logits| self.split(logits))
            .collect())
    }

    fn clone_model(&self) -> Box<dyn Model<G>> {
        Box::new(self.clone())
    }

    fn swap(&self) -> Result<Box<dyn Model<G>>> {
        let swapped = BaseModel {
            net: self.net.swap()?,
            heads: self.heads.clone(),
            feature_len: self.feature_len,
            _game: PhantomData,
        };
        Ok(Box::new(swapped))
    }

    fn backend(&self) -> Backend {
        self.net.backend()
    }

    fn trainable(&self) -> bool {
        true
    }

    fn features(&self) -> Vec<Arc<dyn FeatureHead<G>>> {
        self.heads.clone()
    }

    fn playing_model(&self) -> &dyn Model<G> {
        self
    }

    fn training_model(&self) -> Option<&dyn Model<G>> {
        Some(self)
    }

    fn l2_norm(&self) -> f32 {
        self.net.l2_norm()
    }
}
