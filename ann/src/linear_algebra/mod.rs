pub use self::matrix::{Matrix, MatrixError};

mod matrix;

pub type Value = f32;
