use approx::assert_abs_diff_eq;
use rust_lstm_symbols::matrix::ops;
use rust_lstm_symbols::{LstmError, Matrix};

fn sample(rows: usize, columns: usize, offset: f32) -> Matrix {
    let data = (0..rows * columns).map(|i| (i as f32 * 0.37 + offset).sin() * 3.0).collect();
    Matrix::from_vec(rows, columns, data).unwrap()
}

#[test]
fn test_product_shapes() {
    for (m, n, p) in [(1, 1, 1), (2, 3, 4), (5, 1, 2), (3, 3, 3)] {
        let a = sample(m, n, 0.1);
        let b = sample(n, p, 0.7);
        assert_eq!(ops::multiply(&a, &b).unwrap().shape(), (m, p));
    }
}

#[test]
fn test_product_against_hand_computed_fixture() {
    let a = Matrix::from_rows(&[vec![1.0, -2.0], vec![3.0, 4.0]]).unwrap();
    let b = Matrix::from_rows(&[vec![-3.0], vec![2.0]]).unwrap();
    let product = ops::multiply(&a, &b).unwrap();
    assert_eq!(product, Matrix::from_rows(&[vec![-7.0], vec![-1.0]]).unwrap());

    // The inputs are independent of the result.
    assert_eq!(a.shape(), (2, 2));
}

#[test]
fn test_algebraic_identities() {
    for (rows, columns) in [(1, 4), (3, 2), (4, 4)] {
        let a = sample(rows, columns, 0.0);
        let b = sample(rows, columns, 1.3);

        assert_eq!(ops::transpose(&ops::transpose(&a)), a);
        assert_eq!(ops::add(&a, &b).unwrap(), ops::add(&b, &a).unwrap());

        let forward = ops::subtract(&a, &b).unwrap();
        let backward = ops::subtract(&b, &a).unwrap();
        for (x, y) in forward.iter().zip(backward.iter()) {
            assert_abs_diff_eq!(*x, -*y, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_shape_errors_are_reported() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(3, 2);
    assert!(matches!(ops::add(&a, &b), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::subtract(&a, &b), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::hadamard(&a, &b), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::multiply(&a, &a), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::hstack(&a, &b), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::vstack(&a, &b), Err(LstmError::ShapeMismatch { .. })));
    assert!(matches!(ops::reshape(&a, 4, 2), Err(LstmError::InvalidShape { .. })));
}

#[test]
fn test_activation_clipping_through_matrices() {
    let input = Matrix::from_vec(1, 6, vec![-10.0, -5.0, -3.0, 3.0, 5.0, 10.0]).unwrap();

    let t = ops::tanh(&input);
    assert_eq!(t[(0, 0)], -1.0);
    assert_eq!(t[(0, 1)], -1.0);
    assert_abs_diff_eq!(t[(0, 3)], 0.995_054_75, epsilon = 1e-6);
    assert_eq!(t[(0, 4)], 1.0);

    let dt = ops::dtanh(&input);
    assert_eq!(dt[(0, 1)], 0.0);
    assert_eq!(dt[(0, 4)], 0.0);
    assert!(dt[(0, 3)] > 0.0);

    let s = ops::sigmoid(&input);
    assert_eq!(s[(0, 0)], 0.0);
    assert_eq!(s[(0, 5)], 1.0);
    assert!(s[(0, 4)] < 1.0);

    let ds = ops::dsigmoid(&input);
    assert_eq!(ds[(0, 0)], 0.0);
    assert_eq!(ds[(0, 5)], 0.0);
    assert!(ds[(0, 4)] > 0.0);
}

#[test]
fn test_slicing() {
    let m = Matrix::from_vec(3, 3, (0..9).map(|v| v as f32).collect()).unwrap();

    let tail = m.slice("1:,:").unwrap();
    assert_eq!(tail.shape(), (2, 3));
    assert_eq!(tail.to_vec(), vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

    let corner = m.slice(":2,1:").unwrap();
    assert_eq!(corner.to_vec(), vec![1.0, 2.0, 4.0, 5.0]);

    assert!(matches!(m.slice("1:1,:"), Err(LstmError::InvalidSlice { .. })));
    assert!(matches!(m.slice("0:9,:"), Err(LstmError::InvalidSlice { .. })));
}

#[test]
fn test_elementwise_math() {
    let m = Matrix::from_vec(1, 3, vec![1.0, 4.0, 9.0]).unwrap();
    assert_eq!(ops::sqrt(&m).to_vec(), vec![1.0, 2.0, 3.0]);
    assert_eq!(ops::power(&m, 2.0).to_vec(), vec![1.0, 16.0, 81.0]);
    assert_abs_diff_eq!(ops::ln(&ops::exp(&m))[(0, 1)], 4.0, epsilon = 1e-5);
    assert_abs_diff_eq!(ops::log(&m, 3.0)[(0, 2)], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(m.sum(), 14.0);
    assert_eq!(ops::clamp(&m, 2.0, 5.0).to_vec(), vec![2.0, 4.0, 5.0]);
}
