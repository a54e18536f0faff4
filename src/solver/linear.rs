//! Dense linear algebra: matrix storage and Gaussian elimination.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_complex::Complex64;

use crate::error::{NodalError, Result};

/// Field element the dense solver can work with.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    const ZERO: Self;
    const ONE: Self;

    /// Magnitude used for pivot selection (absolute value or modulus).
    fn magnitude(self) -> f64;
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn magnitude(self) -> f64 {
        self.abs()
    }
}

impl Scalar for Complex64 {
    const ZERO: Self = Complex64 { re: 0.0, im: 0.0 };
    const ONE: Self = Complex64 { re: 1.0, im: 0.0 };

    fn magnitude(self) -> f64 {
        self.norm()
    }
}

/// Row-major dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Scalar> DenseMatrix<T> {
    /// Create a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::ZERO; rows * cols],
        }
    }

    /// Build a matrix from rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(NodalError::DimensionMismatch {
                rows: rows.len(),
                cols,
                rhs: bad.len(),
            });
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] += value;
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.set(j, i, self.get(i, j));
            }
        }
        t
    }

    /// Copy `block` into this matrix with its top-left corner at (row, col).
    pub fn place(&mut self, row: usize, col: usize, block: &Self) {
        for i in 0..block.rows {
            for j in 0..block.cols {
                self.set(row + i, col + j, block.get(i, j));
            }
        }
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// The pivot for each column is the remaining row with the largest
/// magnitude entry; ties keep the topmost row. A pivot below `tolerance`
/// makes the system singular and no solution is returned. On success the
/// solution has exactly as many entries as `a` has rows.
pub fn gaussian_elimination<T: Scalar>(
    a: &DenseMatrix<T>,
    b: &[T],
    tolerance: f64,
) -> Result<Vec<T>> {
    let n = a.rows;
    if a.cols != n || b.len() != n {
        return Err(NodalError::DimensionMismatch {
            rows: a.rows,
            cols: a.cols,
            rhs: b.len(),
        });
    }

    let mut m = a.data.clone();
    let mut rhs = b.to_vec();

    for k in 0..n {
        // Find pivot
        let mut max_val = m[k * n + k].magnitude();
        let mut max_row = k;
        for i in (k + 1)..n {
            let val = m[i * n + k].magnitude();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }

        if max_val < tolerance {
            return Err(NodalError::SingularMatrix { row: k });
        }

        // Swap rows if needed
        if max_row != k {
            for j in 0..n {
                m.swap(k * n + j, max_row * n + j);
            }
            rhs.swap(k, max_row);
        }

        // Eliminate below the pivot
        let pivot = m[k * n + k];
        for i in (k + 1)..n {
            let factor = m[i * n + k] / pivot;
            if factor == T::ZERO {
                continue;
            }
            for j in k..n {
                let upper = m[k * n + j];
                m[i * n + j] -= factor * upper;
            }
            let upper = rhs[k];
            rhs[i] -= factor * upper;
        }
    }

    // Back substitution
    let mut x = vec![T::ZERO; n];
    for i in (0..n).rev() {
        let mut acc = rhs[i];
        for j in (i + 1)..n {
            acc -= m[i * n + j] * x[j];
        }
        x[i] = acc / m[i * n + i];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_solves_small_real_system() {
        let a = DenseMatrix::from_rows(vec![
            vec![2.0, 1.0, -1.0],
            vec![-3.0, -1.0, 2.0],
            vec![-2.0, 1.0, 2.0],
        ])
        .unwrap();
        let x = gaussian_elimination(&a, &[8.0, -11.0, -3.0], TOL).unwrap();
        assert_eq!(x.len(), 3);
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_needs_pivoting() {
        // Zero on the leading diagonal
        let a = DenseMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let x = gaussian_elimination(&a, &[3.0, 4.0], TOL).unwrap();
        assert_relative_eq!(x[0], 4.0);
        assert_relative_eq!(x[1], 3.0);
    }

    #[test]
    fn test_singular_matrix() {
        let a = DenseMatrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(matches!(
            gaussian_elimination(&a, &[1.0, 2.0], TOL),
            Err(NodalError::SingularMatrix { row: 1 })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = DenseMatrix::<f64>::zeros(2, 2);
        assert!(matches!(
            gaussian_elimination(&a, &[1.0], TOL),
            Err(NodalError::DimensionMismatch { rhs: 1, .. })
        ));
        let rect = DenseMatrix::<f64>::zeros(2, 3);
        assert!(gaussian_elimination(&rect, &[1.0, 1.0], TOL).is_err());
    }

    #[test]
    fn test_empty_system() {
        let a = DenseMatrix::<f64>::zeros(0, 0);
        assert_eq!(gaussian_elimination(&a, &[], TOL).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_complex_system() {
        let j = Complex64::new(0.0, 1.0);
        let one = Complex64::ONE;
        // [ j  1 ] x = [ 1 + j ]
        // [ 1  j ]     [ 1 + j ]
        let a = DenseMatrix::from_rows(vec![vec![j, one], vec![one, j]]).unwrap();
        let b = [one + j, one + j];
        let x = gaussian_elimination(&a, &b, TOL).unwrap();
        assert_relative_eq!(x[0].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[0].im, 0.0, epsilon = 1e-12);
        assert_relative_eq!(x[1].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transpose_and_place() {
        let m = DenseMatrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 1));
        assert_eq!(t.get(2, 0), 3.0);

        let mut big = DenseMatrix::zeros(2, 4);
        big.place(1, 1, &m);
        assert_eq!(big.row(1), &[0.0, 1.0, 2.0, 3.0]);
    }
}
