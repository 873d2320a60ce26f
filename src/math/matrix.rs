use serde::{Serialize, Deserialize};

/// Dense row-major matrix. Vectors are carried as `1 × n` row matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Builds a `rows × cols` matrix by calling `fill(row, col)` for every cell.
    pub fn from_fn<F>(rows: usize, cols: usize, mut fill: F) -> Matrix
    where
        F: FnMut(usize, usize) -> f64,
    {
        let data = (0..rows)
            .map(|i| (0..cols).map(|j| fill(i, j)).collect())
            .collect();
        Matrix { rows, cols, data }
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let cols = data.first().map_or(0, |row| row.len());
        Matrix {
            rows: data.len(),
            cols,
            data
        }
    }

    /// Wraps a vector as a `1 × n` row matrix.
    pub fn from_row(row: Vec<f64>) -> Matrix {
        Matrix { rows: 1, cols: row.len(), data: vec![row] }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// First row of the matrix; the vector view of a `1 × n` matrix.
    pub fn row(&self) -> &[f64] {
        self.data.first().map_or(&[], |row| row.as_slice())
    }

    /// `self[i][j] += rhs[i][j]` for every cell.
    pub fn add_assign(&mut self, rhs: &Matrix) {
        assert_eq!(self.shape(), rhs.shape(), "Matrices are of incorrect sizes");
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data.iter()) {
            for (x, y) in row.iter_mut().zip(rhs_row.iter()) {
                *x += y;
            }
        }
    }

    /// `self[i][j] += factor * rhs[i][j]` for every cell.
    pub fn add_scaled(&mut self, rhs: &Matrix, factor: f64) {
        assert_eq!(self.shape(), rhs.shape(), "Matrices are of incorrect sizes");
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data.iter()) {
            for (x, y) in row.iter_mut().zip(rhs_row.iter()) {
                *x += factor * y;
            }
        }
    }

    pub fn scale_in_place(&mut self, factor: f64) {
        for x in self.data.iter_mut().flatten() {
            *x *= factor;
        }
    }

    /// Sum of squared elements (the squared Frobenius norm).
    pub fn squared_norm(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().flatten().all(|x| x.is_finite())
    }

    /// Outer product of a column vector `a` and a row vector `b`: `a^T · b`.
    pub fn outer(a: &[f64], b: &[f64]) -> Matrix {
        Matrix::from_fn(a.len(), b.len(), |i, j| a[i] * b[j])
    }

    /// Row vector times matrix: `v (1 × rows) · self (rows × cols)`.
    pub fn vec_mul(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.rows, "Matrices are of incorrect sizes");
        let mut out = vec![0.0; self.cols];
        for (x, row) in v.iter().zip(self.data.iter()) {
            if *x == 0.0 {
                continue;
            }
            for (acc, w) in out.iter_mut().zip(row.iter()) {
                *acc += x * w;
            }
        }
        out
    }

    /// Matrix times column vector: `self (rows × cols) · v (cols)`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.cols, "Matrices are of incorrect sizes");
        self.data
            .iter()
            .map(|row| row.iter().zip(v.iter()).map(|(w, x)| w * x).sum())
            .collect()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
