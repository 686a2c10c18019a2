//! Dense row-major `f32` matrix used throughout the network.
//!
//! Instance methods mutate in place. Every shape-changing method
//! (`multiply`, `transpose`, `reshape`, `hstack`, `vstack`) builds the new
//! buffer first and swaps it in, so a failed call leaves the old contents
//! untouched. Copy-returning twins of every method live in [`ops`].

use std::fmt;
use std::ops::{Index, IndexMut};

use ndarray::{concatenate, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::{LstmError, Result};
use crate::utils;

pub mod ops;
mod slice;

pub use slice::{AxisRange, SliceSpec};

/// A rectangular `rows × columns` buffer of 32-bit floats.
///
/// `PartialEq` compares contents element by element. Use
/// [`Matrix::same_instance`] when identity is what you need.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Array2<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Matrix { data: Array2::zeros((rows, columns)) }
    }

    pub fn ones(rows: usize, columns: usize) -> Self {
        Self::filled(rows, columns, 1.0)
    }

    pub fn filled(rows: usize, columns: usize, value: f32) -> Self {
        Matrix { data: Array2::from_elem((rows, columns), value) }
    }

    /// Builds a matrix from row-major data.
    pub fn from_vec(rows: usize, columns: usize, data: Vec<f32>) -> Result<Self> {
        let len = data.len();
        Array2::from_shape_vec((rows, columns), data)
            .map(|data| Matrix { data })
            .map_err(|_| LstmError::InvalidShape { from: (len, 1), to: (rows, columns) })
    }

    /// Builds a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let columns = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().find(|r| r.len() != columns) {
            return Err(LstmError::shape_mismatch("from_rows", (1, columns), (1, bad.len())));
        }
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        Self::from_vec(rows.len(), columns, data)
    }

    pub fn from_array(data: Array2<f32>) -> Self {
        Matrix { data }
    }

    /// Uniform random matrix in `(-range, range)`. A range that is not a
    /// positive finite number yields zeros.
    pub fn random<R: Rng + ?Sized>(rows: usize, columns: usize, range: f32, rng: &mut R) -> Self {
        if !(range > 0.0 && range.is_finite()) {
            return Self::zeros(rows, columns);
        }
        let dist = Uniform::new(-range, range);
        Matrix { data: Array2::random_using((rows, columns), dist, rng) }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        self.data.get((row, column)).copied()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// Elements in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.data.iter()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Copy of row `index` as a `1 × columns` matrix.
    pub fn row(&self, index: usize) -> Option<Matrix> {
        if index >= self.rows() {
            return None;
        }
        let row = self.data.row(index).to_owned().insert_axis(Axis(0));
        Some(Matrix { data: row })
    }

    fn require_same_shape(&self, other: &Matrix, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(LstmError::shape_mismatch(operation, self.shape(), other.shape()));
        }
        Ok(())
    }

    pub fn add(&mut self, other: &Matrix) -> Result<()> {
        self.require_same_shape(other, "add")?;
        self.data += &other.data;
        Ok(())
    }

    pub fn add_scalar(&mut self, value: f32) {
        self.data += value;
    }

    pub fn subtract(&mut self, other: &Matrix) -> Result<()> {
        self.require_same_shape(other, "subtract")?;
        self.data -= &other.data;
        Ok(())
    }

    pub fn subtract_scalar(&mut self, value: f32) {
        self.data -= value;
    }

    /// Adds a `1 × columns` row to every row.
    pub fn add_row_vector(&mut self, row: &Matrix) -> Result<()> {
        if row.rows() != 1 || row.columns() != self.columns() {
            return Err(LstmError::shape_mismatch("add_row_vector", self.shape(), row.shape()));
        }
        self.data += &row.data;
        Ok(())
    }

    /// Matrix product `self · other`, replacing `self` with the
    /// `(self.rows, other.columns)` result.
    pub fn multiply(&mut self, other: &Matrix) -> Result<()> {
        if self.columns() != other.rows() {
            return Err(LstmError::shape_mismatch("multiply", self.shape(), other.shape()));
        }
        self.data = self.data.dot(&other.data);
        Ok(())
    }

    pub fn multiply_scalar(&mut self, value: f32) {
        self.data *= value;
    }

    /// Element-wise product.
    pub fn hadamard(&mut self, other: &Matrix) -> Result<()> {
        self.require_same_shape(other, "hadamard")?;
        self.data *= &other.data;
        Ok(())
    }

    /// Element-wise quotient.
    pub fn divide(&mut self, other: &Matrix) -> Result<()> {
        self.require_same_shape(other, "divide")?;
        self.data /= &other.data;
        Ok(())
    }

    pub fn transpose(&mut self) {
        self.data = self.data.t().to_owned();
    }

    /// Row-major flatten then refill into `rows × columns`.
    pub fn reshape(&mut self, rows: usize, columns: usize) -> Result<()> {
        if rows.checked_mul(columns) != Some(self.len()) {
            return Err(LstmError::InvalidShape { from: self.shape(), to: (rows, columns) });
        }
        let flat = self.to_vec();
        self.data = Array2::from_shape_vec((rows, columns), flat)
            .map_err(|_| LstmError::InvalidShape { from: self.shape(), to: (rows, columns) })?;
        Ok(())
    }

    /// Appends the columns of `other`; row counts must match.
    pub fn hstack(&mut self, other: &Matrix) -> Result<()> {
        if self.rows() != other.rows() {
            return Err(LstmError::shape_mismatch("hstack", self.shape(), other.shape()));
        }
        self.data = concatenate(Axis(1), &[self.data.view(), other.data.view()])
            .map_err(|_| LstmError::shape_mismatch("hstack", self.shape(), other.shape()))?;
        Ok(())
    }

    /// Appends the rows of `other`; column counts must match.
    pub fn vstack(&mut self, other: &Matrix) -> Result<()> {
        if self.columns() != other.columns() {
            return Err(LstmError::shape_mismatch("vstack", self.shape(), other.shape()));
        }
        self.data = concatenate(Axis(0), &[self.data.view(), other.data.view()])
            .map_err(|_| LstmError::shape_mismatch("vstack", self.shape(), other.shape()))?;
        Ok(())
    }

    /// Bounds every element to `[min, max]`.
    pub fn clamp(&mut self, min: f32, max: f32) {
        self.apply(|x| x.max(min).min(max));
    }

    pub fn apply<F: Fn(f32) -> f32>(&mut self, f: F) {
        self.data.mapv_inplace(f);
    }

    pub fn tanh(&mut self) {
        self.apply(utils::tanh);
    }

    pub fn dtanh(&mut self) {
        self.apply(utils::dtanh);
    }

    pub fn sigmoid(&mut self) {
        self.apply(utils::sigmoid);
    }

    pub fn dsigmoid(&mut self) {
        self.apply(utils::dsigmoid);
    }

    pub fn sqrt(&mut self) {
        self.apply(f32::sqrt);
    }

    pub fn exp(&mut self) {
        self.apply(f32::exp);
    }

    pub fn power(&mut self, exponent: f32) {
        self.apply(|x| x.powf(exponent));
    }

    /// Natural logarithm.
    pub fn ln(&mut self) {
        self.apply(f32::ln);
    }

    pub fn log(&mut self, base: f32) {
        self.apply(|x| x.log(base));
    }

    /// Row-wise softmax. Each row is shifted by its maximum before
    /// exponentiation, which leaves the result unchanged.
    pub fn softmax(&mut self) {
        for mut row in self.data.rows_mut() {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|x| (x - max).exp());
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
    }

    /// Replaces every row with a one-hot vector at that row's argmax.
    pub fn one_hot_rows(&mut self) {
        let winners = self.argmax_rows();
        self.data.fill(0.0);
        for (r, c) in winners.into_iter().enumerate() {
            if let Some(cell) = self.data.get_mut((r, c)) {
                *cell = 1.0;
            }
        }
    }

    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// Column index of each row's maximum; ties go to the first one seen.
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.data
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (i, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = i;
                    }
                }
                best
            })
            .collect()
    }

    /// Copies out the region selected by `"rowStart:rowEnd,colStart:colEnd"`.
    pub fn slice(&self, expression: &str) -> Result<Matrix> {
        let spec = SliceSpec::parse(expression)?;
        let (r0, r1) = spec.rows.resolve(self.rows(), expression)?;
        let (c0, c1) = spec.columns.resolve(self.columns(), expression)?;
        let view = self.data.slice(ndarray::s![r0..r1, c0..c1]);
        Ok(Matrix { data: view.to_owned() })
    }

    /// True when shapes agree and every pair of elements differs by at most `tolerance`.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f32) -> bool {
        self.shape() == other.shape()
            && self.data.iter().zip(other.data.iter()).all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Identity comparison: true only when both references point at the same matrix.
    pub fn same_instance(&self, other: &Matrix) -> bool {
        std::ptr::eq(self, other)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl From<Array2<f32>> for Matrix {
    fn from(data: Array2<f32>) -> Self {
        Matrix { data }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, index: (usize, usize)) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f32 {
        &mut self.data[index]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.rows() {
            let cells: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[f32]]) -> Matrix {
        Matrix::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_matrix_product_fixture() {
        let mut a = m(&[&[1.0, -2.0], &[3.0, 4.0]]);
        let b = m(&[&[-3.0], &[2.0]]);
        a.multiply(&b).unwrap();
        assert_eq!(a, m(&[&[-7.0], &[-1.0]]));
    }

    #[test]
    fn test_multiply_shape_mismatch() {
        let mut a = Matrix::zeros(2, 3);
        let err = a.multiply(&Matrix::zeros(2, 3)).unwrap_err();
        assert!(matches!(err, LstmError::ShapeMismatch { operation: "multiply", .. }));
        assert_eq!(a.shape(), (2, 3));
    }

    #[test]
    fn test_add_requires_same_shape() {
        let mut a = Matrix::ones(2, 2);
        assert!(a.add(&Matrix::ones(2, 3)).is_err());
        a.add(&Matrix::ones(2, 2)).unwrap();
        assert_eq!(a, Matrix::filled(2, 2, 2.0));
    }

    #[test]
    fn test_reshape_is_row_major() {
        let mut a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        a.reshape(3, 2).unwrap();
        assert_eq!(a, m(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]));
        assert!(matches!(a.reshape(4, 2), Err(LstmError::InvalidShape { .. })));
        assert!(matches!(a.reshape(usize::MAX, 2), Err(LstmError::InvalidShape { .. })));
        assert_eq!(a.shape(), (3, 2));
    }

    #[test]
    fn test_transpose_swaps_axes() {
        let mut a = m(&[&[1.0, 2.0, 3.0]]);
        a.transpose();
        assert_eq!(a.shape(), (3, 1));
        assert_eq!(a[(2, 0)], 3.0);
    }

    #[test]
    fn test_stacking() {
        let mut a = m(&[&[1.0], &[2.0]]);
        a.hstack(&m(&[&[3.0], &[4.0]])).unwrap();
        assert_eq!(a, m(&[&[1.0, 3.0], &[2.0, 4.0]]));

        a.vstack(&m(&[&[5.0, 6.0]])).unwrap();
        assert_eq!(a.shape(), (3, 2));
        assert!(a.vstack(&Matrix::zeros(1, 3)).is_err());
        assert!(a.hstack(&Matrix::zeros(2, 1)).is_err());
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut a = m(&[&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]]);
        a.softmax();
        for r in 0..2 {
            let row = a.row(r).unwrap();
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!((a[(1, 0)] - 1.0 / 3.0).abs() < 1e-6);
        assert!(a[(0, 2)] > a[(0, 1)]);
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        let a = m(&[&[0.2, 0.4, 0.4], &[0.9, 0.05, 0.05]]);
        assert_eq!(a.argmax_rows(), vec![1, 0]);

        let mut b = a.clone();
        b.one_hot_rows();
        assert_eq!(b, m(&[&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0]]));
    }

    #[test]
    fn test_clamp_bounds_every_element() {
        let mut a = m(&[&[-5.0, 0.5, 5.0]]);
        a.clamp(-1.0, 1.0);
        assert_eq!(a, m(&[&[-1.0, 0.5, 1.0]]));
    }

    #[test]
    fn test_content_equality_is_not_identity() {
        let a = Matrix::ones(2, 2);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a));
    }

    #[test]
    fn test_log_with_base() {
        let mut a = m(&[&[8.0, 1.0]]);
        a.log(2.0);
        assert!(a.approx_eq(&m(&[&[3.0, 0.0]]), 1e-6));
    }

    #[test]
    fn test_add_row_vector_broadcasts() {
        let mut a = Matrix::zeros(3, 2);
        a.add_row_vector(&m(&[&[1.0, 2.0]])).unwrap();
        assert_eq!(a.row(2).unwrap(), m(&[&[1.0, 2.0]]));
        assert!(a.add_row_vector(&Matrix::zeros(2, 2)).is_err());
    }

    #[test]
    fn test_random_with_unusable_range_is_zero() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(4);
        for range in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert_eq!(Matrix::random(2, 3, range, &mut rng), Matrix::zeros(2, 3));
        }
        let random = Matrix::random(2, 3, 0.5, &mut rng);
        assert!(random.iter().all(|v| v.abs() <= 0.5));
    }
}
