//! Copy-returning twins of the in-place [`Matrix`] methods.
//!
//! Each function clones its first operand, applies the in-place method and
//! returns the independent result. The inputs are never modified.

use super::Matrix;
use crate::error::Result;

fn with_copy<F: FnOnce(&mut Matrix)>(m: &Matrix, f: F) -> Matrix {
    let mut out = m.clone();
    f(&mut out);
    out
}

fn try_with_copy<F: FnOnce(&mut Matrix) -> Result<()>>(m: &Matrix, f: F) -> Result<Matrix> {
    let mut out = m.clone();
    f(&mut out)?;
    Ok(out)
}

pub fn add(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.add(b))
}

pub fn add_scalar(a: &Matrix, value: f32) -> Matrix {
    with_copy(a, |m| m.add_scalar(value))
}

pub fn subtract(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.subtract(b))
}

pub fn subtract_scalar(a: &Matrix, value: f32) -> Matrix {
    with_copy(a, |m| m.subtract_scalar(value))
}

pub fn add_row_vector(a: &Matrix, row: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.add_row_vector(row))
}

/// Matrix product `a · b`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.multiply(b))
}

pub fn multiply_scalar(a: &Matrix, value: f32) -> Matrix {
    with_copy(a, |m| m.multiply_scalar(value))
}

pub fn hadamard(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.hadamard(b))
}

pub fn divide(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.divide(b))
}

pub fn transpose(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::transpose)
}

pub fn reshape(a: &Matrix, rows: usize, columns: usize) -> Result<Matrix> {
    try_with_copy(a, |m| m.reshape(rows, columns))
}

pub fn hstack(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.hstack(b))
}

pub fn vstack(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    try_with_copy(a, |m| m.vstack(b))
}

/// Stacks `1 × n` rows (or any equally wide matrices) top to bottom.
pub fn vstack_all(parts: &[Matrix]) -> Result<Matrix> {
    let mut iter = parts.iter();
    let mut out = match iter.next() {
        Some(first) => first.clone(),
        None => return Ok(Matrix::zeros(0, 0)),
    };
    for part in iter {
        out.vstack(part)?;
    }
    Ok(out)
}

pub fn clamp(a: &Matrix, min: f32, max: f32) -> Matrix {
    with_copy(a, |m| m.clamp(min, max))
}

pub fn map<F: Fn(f32) -> f32>(a: &Matrix, f: F) -> Matrix {
    with_copy(a, |m| m.apply(f))
}

pub fn tanh(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::tanh)
}

pub fn dtanh(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::dtanh)
}

pub fn sigmoid(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::sigmoid)
}

pub fn dsigmoid(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::dsigmoid)
}

pub fn sqrt(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::sqrt)
}

pub fn exp(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::exp)
}

pub fn power(a: &Matrix, exponent: f32) -> Matrix {
    with_copy(a, |m| m.power(exponent))
}

pub fn ln(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::ln)
}

pub fn log(a: &Matrix, base: f32) -> Matrix {
    with_copy(a, |m| m.log(base))
}

pub fn softmax(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::softmax)
}

pub fn one_hot_rows(a: &Matrix) -> Matrix {
    with_copy(a, Matrix::one_hot_rows)
}
