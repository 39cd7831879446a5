use std::error::Error;
use std::fmt;
use std::ops::{Index, IndexMut, Mul, MulAssign, Neg};
use std::slice;

use serde::{Deserialize, Serialize};

use super::Value;

/// A dense, row-major matrix whose shape is fixed at construction.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    columns: usize,
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    columns: usize,
    values: Vec<Value>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = MatrixError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Self::from_values(raw.rows, raw.columns, raw.values)
    }
}

impl Matrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            values: vec![0.0; rows * columns],
        }
    }

    pub fn from_values(
        rows: usize,
        columns: usize,
        values: Vec<Value>,
    ) -> Result<Self, MatrixError> {
        if values.len() != rows * columns {
            return Err(MatrixError::Size {
                shape: (rows, columns),
                len: values.len(),
            });
        }

        Ok(Self {
            rows,
            columns,
            values,
        })
    }

    /// Builds an `n × 1` column vector.
    pub fn column(values: &[Value]) -> Self {
        Self {
            rows: values.len(),
            columns: 1,
            values: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn values(&self) -> slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> slice::IterMut<'_, Value> {
        self.values.iter_mut()
    }

    fn offset(&self, row: usize, column: usize) -> Result<usize, MatrixError> {
        if row < self.rows && column < self.columns {
            Ok(row * self.columns + column)
        } else {
            Err(MatrixError::OutOfRange {
                row,
                column,
                shape: self.shape(),
            })
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Result<Value, MatrixError> {
        self.offset(row, column).map(|i| self.values[i])
    }

    pub fn get_mut(&mut self, row: usize, column: usize) -> Result<&mut Value, MatrixError> {
        let i = self.offset(row, column)?;
        Ok(&mut self.values[i])
    }

    pub fn set(&mut self, row: usize, column: usize, value: Value) -> Result<(), MatrixError> {
        *self.get_mut(row, column)? = value;
        Ok(())
    }

    fn check_same_shape(&self, other: &Matrix) -> Result<(), MatrixError> {
        if self.shape() != other.shape() {
            return Err(MatrixError::DimensionMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    /// Elementwise sum.
    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        let mut result = self.clone();
        result.add_assign(other)?;
        Ok(result)
    }

    pub fn add_assign(&mut self, other: &Matrix) -> Result<(), MatrixError> {
        self.check_same_shape(other)?;
        self.values
            .iter_mut()
            .zip(&other.values)
            .for_each(|(x, y)| *x += y);
        Ok(())
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        self.add(&other.scale(-1.0))
    }

    pub fn scale(&self, scalar: Value) -> Matrix {
        self * scalar
    }

    pub fn negate(&self) -> Matrix {
        self.scale(-1.0)
    }

    /// Standard matrix product; `self.columns` must equal `other.rows`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        if self.columns != other.rows {
            return Err(MatrixError::DimensionMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }

        let mut result = Matrix::zeros(self.rows, other.columns);
        for row in 0..self.rows {
            for column in 0..other.columns {
                let mut sum = 0.0;
                for k in 0..self.columns {
                    sum += self[(row, k)] * other[(k, column)];
                }
                result[(row, column)] = sum;
            }
        }
        Ok(result)
    }

    /// Elementwise product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        self.check_same_shape(other)?;

        let mut result = self.clone();
        result
            .values
            .iter_mut()
            .zip(&other.values)
            .for_each(|(x, y)| *x *= y);
        Ok(result)
    }

    pub fn transpose(&self) -> Matrix {
        let mut result = Matrix::zeros(self.columns, self.rows);
        for row in 0..self.rows {
            for column in 0..self.columns {
                result[(column, row)] = self[(row, column)];
            }
        }
        result
    }

    /// Replaces every element with `f(element)`, in storage order.
    pub fn map_in_place(&mut self, mut f: impl FnMut(Value) -> Value) {
        self.values.iter_mut().for_each(|x| *x = f(*x));
    }

    pub fn map(&self, f: impl FnMut(Value) -> Value) -> Matrix {
        let mut result = self.clone();
        result.map_in_place(f);
        result
    }
}

impl Mul<Value> for Matrix {
    type Output = Matrix;

    fn mul(mut self, rhs: Value) -> Self::Output {
        self *= rhs;
        self
    }
}

impl Mul<Value> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Value) -> Self::Output {
        self.clone() * rhs
    }
}

impl MulAssign<Value> for Matrix {
    fn mul_assign(&mut self, rhs: Value) {
        self.values.iter_mut().for_each(|x| *x *= rhs);
    }
}

impl Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Value;

    fn index(&self, (row, column): (usize, usize)) -> &Self::Output {
        match self.offset(row, column) {
            Ok(i) => &self.values[i],
            Err(err) => panic!("{err}"),
        }
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut Self::Output {
        match self.offset(row, column) {
            Ok(i) => &mut self.values[i],
            Err(err) => panic!("{err}"),
        }
    }
}

impl<const R: usize, const C: usize> From<[[Value; C]; R]> for Matrix {
    fn from(values: [[Value; C]; R]) -> Self {
        Self {
            rows: R,
            columns: C,
            values: values.into_iter().flatten().collect(),
        }
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows == 0 {
            return write!(f, "[]");
        }

        for row in 0..self.rows {
            write!(f, "{}", if row == 0 { "[" } else { " " })?;
            for column in 0..self.columns {
                fmt::Debug::fmt(&self[(row, column)], f)?;
                if column + 1 < self.columns {
                    write!(f, " ")?;
                }
            }
            write!(f, "{}", if row + 1 < self.rows { "\n" } else { "]" })?;
        }
        Ok(())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for column in 0..self.columns {
                write!(f, "{} ", self[(row, column)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatrixError {
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    OutOfRange {
        row: usize,
        column: usize,
        shape: (usize, usize),
    },
    Size {
        shape: (usize, usize),
        len: usize,
    },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { left, right } => write!(
                f,
                "mismatched dimensions: {}x{} and {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Self::OutOfRange { row, column, shape } => write!(
                f,
                "cell ({row}, {column}) is out of range for a {}x{} matrix",
                shape.0, shape.1
            ),
            Self::Size { shape, len } => write!(
                f,
                "{len} values cannot fill a {}x{} matrix",
                shape.0, shape.1
            ),
        }
    }
}

impl Error for MatrixError {}
