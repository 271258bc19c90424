//! Loss formulation and the training step.
//!
//! The composite loss is a value MSE plus a policy cross-entropy plus
//! weighted feature MSEs plus L2 regularization over the parameters
//! flagged regularizable:
//!
//! ```text
//! L = w_v * MSE(v, v*) + w_p * CE(pi, pi*) + sum_f w_f * MSE(f, f*) + l2 * |theta|^2
//! ```
//!
//! Head gradients are analytic (tanh-MSE and softmax-CE have closed
//! forms); parameter gradients are delegated to the network behind the
//! [`LogitNet`](crate::model::LogitNet) seam.

use std::sync::Arc;

use crate::game::Game;
use crate::model::base::BaseModel;
use crate::model::{FeatureHead, Model};
use crate::selfplay::Sample;
use crate::{Error, Result};

/// Guard inside the cross-entropy logarithm.
pub const EPSILON: f32 = 1e-7;

/// Weights of the loss terms. Per-head feature weights live on the heads
/// themselves.
#[derive(Debug, Clone)]
pub struct LossConfig {
    pub value_weight: f32,
    pub policy_weight: f32,

    /// L2 regularization strength over regularizable parameters.
    pub l2: f32,
}

impl Default for LossConfig {
    fn default() -> Self {
        LossConfig {
            value_weight: 1.0,
            policy_weight: 1.0,
            l2: 0.0,
        }
    }
}

impl LossConfig {
    pub fn with_value_weight(mut self, weight: f32) -> Self {
        self.value_weight = weight;
        self
    }

    pub fn with_policy_weight(mut self, weight: f32) -> Self {
        self.policy_weight = weight;
        self
    }

    pub fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }
}

/// The weighted loss terms of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossTerms {
    pub value: f32,
    pub policy: f32,
    pub features: f32,
    pub regularization: f32,
}

impl LossTerms {
    pub fn total(&self) -> f32 {
        self.value + self.policy + self.features + self.regularization
    }
}

/// Squared error of the value head.
pub fn value_mse(predicted: f32, target: f32) -> f32 {
    let diff = predicted - target;
    diff * diff
}

/// Cross-entropy of a full-length policy against a full-length target.
/// Zero target entries (illegal actions) contribute nothing.
pub fn policy_crossentropy(predicted: &[f32], target: &[f32]) -> f32 {
    -target
        .iter()
        .zip(predicted)
        .map(|(t, p)| t * (p + EPSILON).ln())
        .sum::<f32>()
}

/// An optimizer applies one update per parameter tensor.
///
/// The core ships plain SGD; anything fancier implements this trait
/// outside the crate.
pub trait Optimizer: Send {
    fn step(&mut self, parameters: &mut [f32], gradients: &[f32]);
}

/// Steepest descent with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        for (parameter, gradient) in parameters.iter_mut().zip(gradients) {
            *parameter -= self.learning_rate * gradient;
        }
    }
}

/// Mean loss of `model` over `batch`, forward pass only.
pub fn evaluate_loss<G: Game>(
    model: &BaseModel<G>,
    batch: &[Sample],
    config: &LossConfig,
) -> Result<LossTerms> {
    let mut terms = LossTerms::default();
    if batch.is_empty() {
        return Ok(terms);
    }
    let heads = model.features();
    for sample in batch {
        let evaluation = model.evaluate_state(&sample.state)?;
        terms.value += config.value_weight * value_mse(evaluation.value, sample.value);
        terms.policy += config.policy_weight * policy_crossentropy(&evaluation.policy, &sample.policy);
        terms.features += feature_mse(&heads, &evaluation.features, &sample.features)?;
    }
    let scale = 1.0 / batch.len() as f32;
    terms.value *= scale;
    terms.policy *= scale;
    terms.features *= scale;
    terms.regularization = config.l2 * model.l2_norm();
    Ok(terms)
}

/// One optimizer application on one minibatch.
///
/// Computes the analytic head gradients, asks the network for the matching
/// parameter gradients, adds the L2 terms on regularizable tensors, and
/// steps the optimizer once. Returns the pre-update loss.
pub fn train_step<G: Game>(
    model: &mut BaseModel<G>,
    batch: &[Sample],
    config: &LossConfig,
    optimizer: &mut dyn Optimizer,
) -> Result<LossTerms> {
    let mut terms = LossTerms::default();
    if batch.is_empty() {
        return Ok(terms);
    }
    let heads = model.features();
    let policy_len = G::POLICY_LENGTH;
    let output_len = 1 + policy_len + model.feature_len();

    let mut inputs = Vec::with_capacity(batch.len());
    let mut output_grads = Vec::with_capacity(batch.len());
    for sample in batch {
        let evaluation = model.evaluate_state(&sample.state)?;
        terms.value += config.value_weight * value_mse(evaluation.value, sample.value);
        terms.policy += config.policy_weight * policy_crossentropy(&evaluation.policy, &sample.policy);
        terms.features += feature_mse(&heads, &evaluation.features, &sample.features)?;

        let mut grad = vec![0.0; output_len];
        // d MSE(tanh z, t) / dz = 2 (v - t)(1 - v^2)
        grad[0] = config.value_weight
            * 2.0
            * (evaluation.value - sample.value)
            * (1.0 - evaluation.value * evaluation.value);
        // d CE(softmax z, t) / dz = p - t
        for action in 0..policy_len {
            grad[1 + action] =
                config.policy_weight * (evaluation.policy[action] - sample.policy[action]);
        }
        // d MSE(f, t) / df = 2 (f - t) / len, per head
        let mut offset = 0;
        for head in &heads {
            let len = head.len();
            for i in 0..len {
                let predicted = evaluation.features[offset + i];
                let target = sample.features[offset + i];
                grad[1 + policy_len + offset + i] =
                    head.weight() * 2.0 * (predicted - target) / len as f32;
            }
            offset += len;
        }
        inputs.push(sample.state.clone());
        output_grads.push(grad);
    }
    let scale = 1.0 / batch.len() as f32;
    terms.value *= scale;
    terms.policy *= scale;
    terms.features *= scale;
    terms.regularization = config.l2 * model.l2_norm();

    let mut gradients = model.net().gradient(&inputs, &output_grads);
    if config.l2 > 0.0 {
        let descriptors = model.net().layers();
        let tensors = model.net().tensors();
        for ((gradient, descriptor), tensor) in
            gradients.iter_mut().zip(&descriptors).zip(&tensors)
        {
            if descriptor.regularize {
                for (g, parameter) in gradient.iter_mut().zip(tensor) {
                    *g += 2.0 * config.l2 * parameter;
                }
            }
        }
    }
    for (parameters, gradient) in model.net_mut().tensors_mut().into_iter().zip(&gradients) {
        optimizer.step(parameters, gradient);
    }
    Ok(terms)
}

fn feature_mse<G: Game>(
    heads: &[Arc<dyn FeatureHead<G>>],
    predicted: &[f32],
    target: &[f32],
) -> Result<f32> {
    if predicted.len() != target.len() {
        return Err(Error::ShapeMismatch {
            expected: format!("{} feature entries", predicted.len()),
            actual: format!("{} feature entries", target.len()),
        });
    }
    let mut total = 0.0;
    let mut offset = 0;
    for head in heads {
        let len = head.len();
        let mut head_loss = 0.0;
        for i in 0..len {
            let diff = predicted[offset + i] - target[offset + i];
            head_loss += diff * diff;
        }
        total += head.weight() * head_loss / len.max(1) as f32;
        offset += len;
    }
    Ok(total)
}
