//! Scalar activation functions with flat-region clipping.
//!
//! Outside `|x| > 4` tanh saturates to exactly ±1 and its derivative to 0;
//! outside `|x| > 6` sigmoid saturates to exactly 1/0 and its derivative to 0.
//! These thresholds keep long unrolls free of NaN and must not be changed
//! without retraining every stored model.

pub const TANH_LIMIT: f32 = 4.0;
pub const SIGMOID_LIMIT: f32 = 6.0;

/// Hyperbolic tangent, clamped to ±1 beyond `TANH_LIMIT`.
pub fn tanh(x: f32) -> f32 {
    if x > TANH_LIMIT {
        1.0
    } else if x < -TANH_LIMIT {
        -1.0
    } else {
        x.tanh()
    }
}

/// Derivative of tanh with respect to its argument: 1 - tanh²(x).
pub fn dtanh(x: f32) -> f32 {
    if !(-TANH_LIMIT..=TANH_LIMIT).contains(&x) {
        return 0.0;
    }
    let t = x.tanh();
    1.0 - t * t
}

/// Sigmoid activation function: σ(x) = 1 / (1 + e^(-x))
pub fn sigmoid(x: f32) -> f32 {
    if x > SIGMOID_LIMIT {
        1.0
    } else if x < -SIGMOID_LIMIT {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

/// Derivative of sigmoid with respect to its argument: σ(x)(1 - σ(x)).
pub fn dsigmoid(x: f32) -> f32 {
    if !(-SIGMOID_LIMIT..=SIGMOID_LIMIT).contains(&x) {
        return 0.0;
    }
    let s = 1.0 / (1.0 + (-x).exp());
    s * (1.0 - s)
}
