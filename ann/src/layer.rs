use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::linear_algebra::{Matrix, MatrixError, Value};

/// Affine transform of one fully-connected layer: `weights * inputs + biases`.
pub fn fully_connected_forward(
    inputs: &Matrix,
    weights: &Matrix,
    biases: &Matrix,
) -> Result<Matrix, MatrixError> {
    weights.multiply(inputs)?.add(biases)
}

/// Given the gradients of a layer's affine outputs, returns the gradients of its
/// weights, of its biases, and of its inputs, in that order.
pub fn fully_connected_backward(
    inputs: &Matrix,
    output_gradients: &Matrix,
    weights: &Matrix,
) -> Result<(Matrix, Matrix, Matrix), MatrixError> {
    let weight_gradients = output_gradients.multiply(&inputs.transpose())?;

    let bias_gradients = output_gradients.clone();

    let input_gradients = weights.transpose().multiply(output_gradients)?;

    Ok((weight_gradients, bias_gradients, input_gradients))
}

pub fn activation_forward(inputs: &Matrix, activation: Activation) -> Matrix {
    inputs.map(|x| activation.value(x))
}

pub fn activation_backward(
    inputs: &Matrix,
    output_gradients: &Matrix,
    activation: Activation,
) -> Result<Matrix, MatrixError> {
    output_gradients.hadamard(&inputs.map(|x| activation.derivative(x)))
}

/// How a layer's parameters are drawn when a network is built.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    /// Weights and biases uniform in [-1, 1].
    #[default]
    Uniform,
    /// He-normal weights and zero biases.
    He,
    /// Glorot-uniform weights and zero biases.
    Glorot,
}

impl Initialization {
    /// Fills `weights` (`outputs × inputs`) and `biases` (`outputs × 1`).
    pub fn initialize<R: Rng + ?Sized>(self, weights: &mut Matrix, biases: &mut Matrix, rng: &mut R) {
        let (outputs, inputs) = weights.shape();

        match self {
            Self::Uniform => {
                let distribution = Uniform::<Value>::new_inclusive(-1.0, 1.0);
                biases
                    .values_mut()
                    .for_each(|x| *x = distribution.sample(rng));
                weights
                    .values_mut()
                    .for_each(|x| *x = distribution.sample(rng));
            }
            Self::He => {
                let normal_distribution = Normal::new(0.0, (2.0 / inputs as Value).sqrt())
                    .expect("He deviation is finite for a non-empty layer");
                weights
                    .values_mut()
                    .for_each(|x| *x = normal_distribution.sample(rng));
                biases.map_in_place(|_| 0.0);
            }
            Self::Glorot => {
                let range = 6.0f32.sqrt() / (inputs as Value + outputs as Value).sqrt();
                let uniform_distribution = Uniform::<Value>::new_inclusive(-range, range);
                weights
                    .values_mut()
                    .for_each(|x| *x = uniform_distribution.sample(rng));
                biases.map_in_place(|_| 0.0);
            }
        }
    }
}
