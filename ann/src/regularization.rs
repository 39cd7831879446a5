use serde::{Deserialize, Serialize};

use crate::linear_algebra::{Matrix, Value};

/// A penalty on the size of the weights, where `n` is the number of output nodes and
/// `lambda` the regularization coefficient.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularization {
    /// Weight decay: `(lambda / 2n) * sum(w^2)`.
    #[default]
    L2,
    None,
}

impl Regularization {
    /// The penalty over every weight of every layer.
    pub fn value(self, weights: &[Matrix], n: usize, lambda: Value) -> Value {
        match self {
            Self::L2 => l2(weights, n, lambda),
            Self::None => 0.0,
        }
    }

    /// The penalty's derivative with respect to a single weight.
    pub fn derivative(self, weight: Value, n: usize, lambda: Value) -> Value {
        match self {
            Self::L2 => l2_prime(weight, n, lambda),
            Self::None => 0.0,
        }
    }
}

pub fn l2(weights: &[Matrix], n: usize, lambda: Value) -> Value {
    let weight_sum: Value = weights.iter().flat_map(Matrix::values).map(|w| w * w).sum();

    (lambda / (2.0 * n as Value)) * weight_sum
}

pub fn l2_prime(weight: Value, n: usize, lambda: Value) -> Value {
    (lambda / n as Value) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_value() {
        let weights: Vec<Matrix> = vec![[[1.0, -2.0]].into(), [[3.0], [0.0]].into()];

        // (0.5 / 4) * (1 + 4 + 9)
        assert_eq!(Regularization::L2.value(&weights, 2, 0.5), 1.75);
        assert_eq!(Regularization::None.value(&weights, 2, 0.5), 0.0);
    }

    #[test]
    fn l2_derivative() {
        assert_eq!(Regularization::L2.derivative(3.0, 2, 0.5), 0.75);
        assert_eq!(Regularization::L2.derivative(-1.0, 1, 0.1), -0.1);
        assert_eq!(Regularization::None.derivative(3.0, 2, 0.5), 0.0);
    }
}
