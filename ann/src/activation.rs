use serde::{Deserialize, Serialize};

use crate::linear_algebra::Value;

/// The elementwise nonlinearity applied to every layer's affine output.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
}

impl Activation {
    pub fn value(self, x: Value) -> Value {
        match self {
            Self::Sigmoid => sigmoid(x),
            Self::Tanh => tanh(x),
            Self::Relu => relu(x),
        }
    }

    pub fn derivative(self, x: Value) -> Value {
        match self {
            Self::Sigmoid => sigmoid_prime(x),
            Self::Tanh => tanh_prime(x),
            Self::Relu => relu_prime(x),
        }
    }
}

pub fn sigmoid(x: Value) -> Value {
    1.0 / (1.0 + (-x).exp())
}

/// `e^-x / (1 + e^-x)^2`, evaluated as `s(x) * (1 - s(x))` so that it stays finite
/// once `e^-x` overflows.
pub fn sigmoid_prime(x: Value) -> Value {
    let s = sigmoid(x);
    s * (1.0 - s)
}

pub fn relu(x: Value) -> Value {
    x.max(0.0)
}

pub fn relu_prime(x: Value) -> Value {
    match x > 0.0 {
        true => 1.0,
        false => 0.0,
    }
}

pub fn tanh(x: Value) -> Value {
    x.tanh()
}

pub fn tanh_prime(x: Value) -> Value {
    let x_tanh = x.tanh();
    1.0 - x_tanh * x_tanh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_values() {
        assert_eq!(Activation::Sigmoid.value(0.0), 0.5);
        assert_eq!(Activation::Sigmoid.derivative(0.0), 0.25);

        let x = 1.3;
        let expected = (-x as Value).exp() / (1.0 + (-x as Value).exp()).powi(2);
        assert!((Activation::Sigmoid.derivative(x) - expected).abs() < 1e-6);
    }

    #[test]
    fn sigmoid_saturates() {
        assert!(Activation::Sigmoid.value(100.0) <= 1.0);
        assert!(Activation::Sigmoid.value(-100.0) >= 0.0);
        assert_eq!(Activation::Sigmoid.derivative(-100.0), 0.0);
        assert!(Activation::Sigmoid.derivative(-100.0).is_finite());
    }

    #[test]
    fn relu_values() {
        assert_eq!(Activation::Relu.value(-2.0), 0.0);
        assert_eq!(Activation::Relu.value(3.0), 3.0);
        assert_eq!(Activation::Relu.derivative(-2.0), 0.0);
        assert_eq!(Activation::Relu.derivative(3.0), 1.0);
    }

    #[test]
    fn tanh_values() {
        assert_eq!(Activation::Tanh.value(0.0), 0.0);
        assert_eq!(Activation::Tanh.derivative(0.0), 1.0);
        assert!(Activation::Tanh.derivative(5.0) < 0.001);
    }

    #[test]
    fn names() {
        let activation: Activation = serde_json::from_str("\"tanh\"").unwrap();
        assert_eq!(activation, Activation::Tanh);
        assert_eq!(serde_json::to_string(&Activation::Sigmoid).unwrap(), "\"sigmoid\"");
    }
}
