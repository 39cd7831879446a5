use crate::linear_algebra::{Matrix, MatrixError, Value};

/// Gradient accumulators shaped exactly like a network's weights and biases.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub weights: Vec<Matrix>,
    pub biases: Vec<Matrix>,
}

impl Gradients {
    /// Zeroed accumulators for a network of the given layer sizes.
    pub fn zeros(shape: &[usize]) -> Self {
        let (weights, biases): (Vec<_>, Vec<_>) = shape
            .windows(2)
            .map(|layer| (Matrix::zeros(layer[1], layer[0]), Matrix::zeros(layer[1], 1)))
            .unzip();

        Self { weights, biases }
    }
}

/// Plain gradient descent over accumulated gradients:
/// `parameter += gradient * (-rate / batch_size)`.
pub fn descend(
    weights: &mut [Matrix],
    biases: &mut [Matrix],
    gradients: &Gradients,
    rate: Value,
    batch_size: usize,
) -> Result<(), MatrixError> {
    let step = -rate * (1.0 / batch_size as Value);

    for (weights, weight_gradients) in weights.iter_mut().zip(&gradients.weights) {
        weights.add_assign(&weight_gradients.scale(step))?;
    }

    for (biases, bias_gradients) in biases.iter_mut().zip(&gradients.biases) {
        biases.add_assign(&bias_gradients.scale(step))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_shape() {
        let gradients = Gradients::zeros(&[4, 3, 2]);

        let weight_shapes: Vec<_> = gradients.weights.iter().map(Matrix::shape).collect();
        let bias_shapes: Vec<_> = gradients.biases.iter().map(Matrix::shape).collect();

        assert_eq!(weight_shapes, vec![(3, 4), (2, 3)]);
        assert_eq!(bias_shapes, vec![(3, 1), (2, 1)]);
    }

    #[test]
    fn averages_over_batch() {
        let mut weights = vec![Matrix::from([[1.0, 1.0]])];
        let mut biases = vec![Matrix::from([[0.0]])];
        let gradients = Gradients {
            weights: vec![[[4.0, -2.0]].into()],
            biases: vec![[[8.0]].into()],
        };

        descend(&mut weights, &mut biases, &gradients, 0.5, 4).unwrap();

        assert_eq!(weights[0], Matrix::from([[0.5, 1.25]]));
        assert_eq!(biases[0], Matrix::from([[-1.0]]));
    }

    #[test]
    fn shape_mismatch() {
        let mut weights = vec![Matrix::zeros(2, 2)];
        let mut biases = vec![Matrix::zeros(2, 1)];
        let gradients = Gradients::zeros(&[3, 2]);

        assert!(descend(&mut weights, &mut biases, &gradients, 0.1, 1).is_err());
    }

    #[test]
    fn find_minimum() {
        // Derivative of x^2 - 2x + 1
        fn f_prime(x: Value) -> Value {
            2.0 * x - 2.0
        }

        let mut w = vec![Matrix::zeros(1, 1)];
        let mut b = vec![Matrix::zeros(1, 1)];

        for _ in 0..500 {
            let gradients = Gradients {
                weights: vec![w[0].map(f_prime)],
                biases: vec![Matrix::zeros(1, 1)],
            };

            descend(&mut w, &mut b, &gradients, 0.01, 1).unwrap();
        }

        // Minimum is at 1.0.
        assert!((w[0][(0, 0)] - 1.0).abs() < 0.0001);
    }
}
