//! Distribution helpers shared by the search and the agents.

use rand::distributions::{Distribution, WeightedIndex};

use crate::rng;

/// Index of the largest entry; the lowest index wins ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = index;
        }
    }
    best
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Uniform distribution over `legal` indices in a vector of length `len`.
pub fn uniform_over(len: usize, legal: &[usize]) -> Vec<f32> {
    let mut out = vec![0.0; len];
    if legal.is_empty() {
        return out;
    }
    let weight = 1.0 / legal.len() as f32;
    for &action in legal {
        out[action] = weight;
    }
    out
}

/// Restricts a full-length policy to `legal` indices and renormalizes.
///
/// Falls back to uniform over `legal` when the masked mass vanishes, so a
/// model that puts all of its weight on illegal actions still yields a
/// usable prior.
pub fn masked_policy(policy: &[f32], legal: &[usize]) -> Vec<f32> {
    let mut out = vec![0.0; policy.len()];
    let mass: f32 = legal.iter().map(|&a| policy[a].max(0.0)).sum();
    if mass > 0.0 {
        for &action in legal {
            out[action] = policy[action].max(0.0) / mass;
        }
    } else if !legal.is_empty() {
        let weight = 1.0 / legal.len() as f32;
        for &action in legal {
            out[action] = weight;
        }
    }
    out
}

/// Cools or sharpens a distribution in place.
///
/// `temperature == 0` collapses to a one-hot on the argmax (lowest index
/// wins ties); `temperature == 1` only renormalizes; other values raise
/// each positive entry to the power `1 / temperature`.
pub fn apply_temperature(dist: &mut [f32], temperature: f32) {
    let total: f32 = dist.iter().sum();
    if total <= 0.0 {
        return;
    }
    if temperature == 0.0 {
        let best = argmax(dist);
        for x in dist.iter_mut() {
            *x = 0.0;
        }
        dist[best] = 1.0;
        return;
    }
    if (temperature - 1.0).abs() > f32::EPSILON {
        // Scale by the maximum first so small temperatures cannot overflow.
        let max = dist.iter().cloned().fold(0.0f32, f32::max);
        let inv = 1.0 / temperature;
        for x in dist.iter_mut() {
            if *x > 0.0 {
                *x = (*x / max).powf(inv);
            }
        }
    }
    let total: f32 = dist.iter().sum();
    for x in dist.iter_mut() {
        *x /= total;
    }
}

/// Draws an index from a weighted distribution via the process-wide
/// generator. Degenerate weights fall back to the argmax.
pub fn sample(dist: &[f32]) -> usize {
    match WeightedIndex::new(dist.iter().copied()) {
        Ok(index) => rng::with(|r| index.sample(r)),
        Err(_) => argmax(dist),
    }
}
