use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use crate::matrix::{ops, Matrix};

/// Adam hyperparameters, shared by every weight in a network.
///
/// Implements: m_t = β₁m_{t-1} + (1-β₁)g_t
///             v_t = β₂v_{t-1} + (1-β₂)g_t²
///             θ_t = θ_{t-1} - α * m̂_t / (√v̂_t + ε)
/// where m̂_t and v̂_t are bias-corrected estimates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub alpha: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig::with_params(0.001, 0.9, 0.999, 1e-8)
    }
}

impl AdamConfig {
    pub fn new(alpha: f32) -> Self {
        AdamConfig { alpha, ..AdamConfig::default() }
    }

    pub fn with_params(alpha: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        AdamConfig { alpha, beta1, beta2, epsilon }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(LstmError::InvalidConfig(format!("alpha must be positive, got {}", self.alpha)));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(LstmError::InvalidConfig(format!("{} must be in [0, 1), got {}", name, beta)));
            }
        }
        if !(self.epsilon > 0.0) {
            return Err(LstmError::InvalidConfig(format!("epsilon must be positive, got {}", self.epsilon)));
        }
        Ok(())
    }
}

/// One Adam step on `param`, updating both moment buffers in place.
///
/// `t` is the 1-based step count used for bias correction.
pub fn adam_update(
    config: &AdamConfig,
    t: u32,
    param: &mut Matrix,
    gradient: &Matrix,
    moment: &mut Matrix,
    infinity_norm: &mut Matrix,
) -> Result<()> {
    if t == 0 {
        return Err(LstmError::InvalidConfig("Adam timestep starts at 1".to_string()));
    }
    let exponent = i32::try_from(t).unwrap_or(i32::MAX);

    // Update biased moment estimates
    moment.multiply_scalar(config.beta1);
    moment.add(&ops::multiply_scalar(gradient, 1.0 - config.beta1))?;

    let mut squared = ops::hadamard(gradient, gradient)?;
    squared.multiply_scalar(1.0 - config.beta2);
    infinity_norm.multiply_scalar(config.beta2);
    infinity_norm.add(&squared)?;

    // Bias correction
    let m_hat = ops::multiply_scalar(moment, 1.0 / (1.0 - config.beta1.powi(exponent)));
    let mut v_hat = ops::multiply_scalar(infinity_norm, 1.0 / (1.0 - config.beta2.powi(exponent)));

    v_hat.sqrt();
    v_hat.add_scalar(config.epsilon);
    let mut update = ops::divide(&m_hat, &v_hat)?;
    update.multiply_scalar(config.alpha);
    param.subtract(&update)
}
