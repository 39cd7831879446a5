use serde::{Deserialize, Serialize};

use crate::linear_algebra::Value;

/// The error of one output node against its target, averaged over the `n` output nodes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    #[default]
    MeanSquared,
}

impl Loss {
    pub fn value(self, output: Value, target: Value, n: usize) -> Value {
        match self {
            Self::MeanSquared => mse(output, target, n),
        }
    }

    pub fn derivative(self, output: Value, target: Value, n: usize) -> Value {
        match self {
            Self::MeanSquared => mse_prime(output, target, n),
        }
    }
}

/// Calculates the Mean Squared Error contribution of a single output.
pub fn mse(output: Value, target: Value, n: usize) -> Value {
    (1.0 / n as Value) * (output - target).powi(2)
}

/// Calculates the derivative of the Mean Squared Error with respect to the output.
pub fn mse_prime(output: Value, target: Value, n: usize) -> Value {
    (1.0 / n as Value) * 2.0 * (output - target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_squared() {
        assert_eq!(Loss::MeanSquared.value(0.5, 1.0, 1), 0.25);
        assert_eq!(Loss::MeanSquared.value(3.0, 1.0, 2), 2.0);
        assert_eq!(Loss::MeanSquared.value(1.0, 1.0, 4), 0.0);
    }

    #[test]
    fn mean_squared_prime() {
        assert_eq!(Loss::MeanSquared.derivative(0.5, 1.0, 1), -1.0);
        assert_eq!(Loss::MeanSquared.derivative(3.0, 1.0, 2), 2.0);
    }
}
