use std::borrow::Borrow;
use std::error::Error;
use std::fmt;
use std::mem;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::activation::Activation;
use crate::gradient_descent::{descend, Gradients};
use crate::layer::{
    activation_backward, activation_forward, fully_connected_backward, fully_connected_forward,
    Initialization,
};
use crate::linear_algebra::{Matrix, MatrixError, Value};
use crate::loss::Loss;
use crate::regularization::Regularization;

/// Everything needed to build a [`Network`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Layer sizes, input layer first.
    pub shape: Vec<usize>,
    pub learning_rate: Value,
    pub activation: Activation,
    pub loss: Loss,
    pub regularization: Regularization,
    /// The regularization coefficient.
    pub lambda: Value,
    pub initialization: Initialization,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            shape: Vec::new(),
            learning_rate: 0.005,
            activation: Activation::default(),
            loss: Loss::default(),
            regularization: Regularization::default(),
            lambda: 0.01,
            initialization: Initialization::default(),
        }
    }
}

impl NetworkConfig {
    pub fn new(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub mini_batch_size: usize,
    /// Reorder the examples before every epoch.
    pub shuffle: bool,
    /// Seed for the generator used by initialization and shuffling. Drawn from
    /// entropy when absent.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            mini_batch_size: 5,
            shuffle: true,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn rng(&self) -> StdRng {
        seeded_rng(self.seed)
    }
}

/// A reproducible generator when `seed` is given, otherwise one seeded from entropy.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            debug!(seed, "Using seeded rng.");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrainingExample {
    /// `shape[0] × 1`
    pub input: Matrix,
    /// `shape[L] × 1`
    pub target: Matrix,
}

impl TrainingExample {
    pub fn new(input: Matrix, target: Matrix) -> Self {
        Self { input, target }
    }
}

/// Every intermediate value of one forward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardPass {
    pre_activations: Vec<Matrix>,
    post_activations: Vec<Matrix>,
}

impl ForwardPass {
    /// The affine output of each layer, before the activation function.
    pub fn pre_activations(&self) -> &[Matrix] {
        &self.pre_activations
    }

    /// The input followed by the activated output of each layer.
    pub fn post_activations(&self) -> &[Matrix] {
        &self.post_activations
    }

    pub fn input(&self) -> &Matrix {
        &self.post_activations[0]
    }

    pub fn output(&self) -> &Matrix {
        &self.post_activations[self.post_activations.len() - 1]
    }

    pub fn into_output(mut self) -> Matrix {
        self.post_activations
            .pop()
            .expect("a forward pass always holds its input")
    }
}

/// A fully-connected feed-forward network trained by mini-batch gradient descent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Network {
    pub(crate) shape: Vec<usize>,
    pub(crate) weights: Vec<Matrix>,
    pub(crate) biases: Vec<Matrix>,
    learning_rate: Value,
    lambda: Value,
    activation: Activation,
    loss: Loss,
    regularization: Regularization,
}

impl Network {
    /// Builds a network and draws its parameters from `rng`.
    pub fn new<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> Result<Self, NetworkError> {
        if config.shape.len() < 2 || config.shape.contains(&0) {
            return Err(NetworkError::InvalidShape(config.shape.clone()));
        }

        let (weights, biases): (Vec<_>, Vec<_>) = config
            .shape
            .windows(2)
            .map(|layer| {
                let mut weights = Matrix::zeros(layer[1], layer[0]);
                let mut biases = Matrix::zeros(layer[1], 1);
                config
                    .initialization
                    .initialize(&mut weights, &mut biases, rng);
                (weights, biases)
            })
            .unzip();

        debug!(shape = ?config.shape, initialization = ?config.initialization, "Built network.");

        Ok(Self {
            shape: config.shape.clone(),
            weights,
            biases,
            learning_rate: config.learning_rate,
            lambda: config.lambda,
            activation: config.activation,
            loss: config.loss,
            regularization: config.regularization,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// One `shape[l + 1] × shape[l]` matrix per layer transition.
    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    /// One `shape[l + 1] × 1` vector per layer transition.
    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }

    pub fn learning_rate(&self) -> Value {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: Value) {
        self.learning_rate = learning_rate;
    }

    pub fn lambda(&self) -> Value {
        self.lambda
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn regularization(&self) -> Regularization {
        self.regularization
    }

    fn outputs(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    fn check_input(&self, input: &Matrix) -> Result<(), NetworkError> {
        let expected = (self.shape[0], 1);
        if input.shape() != expected {
            return Err(NetworkError::InputDimensions {
                expected,
                found: input.shape(),
            });
        }
        Ok(())
    }

    fn check_target(&self, target: &Matrix) -> Result<(), NetworkError> {
        let expected = (self.outputs(), 1);
        if target.shape() != expected {
            return Err(NetworkError::TargetDimensions {
                expected,
                found: target.shape(),
            });
        }
        Ok(())
    }

    /// Runs `input` through every layer, keeping each intermediate result.
    pub fn feedforward(&self, input: &Matrix) -> Result<ForwardPass, NetworkError> {
        self.check_input(input)?;

        let mut pre_activations = Vec::with_capacity(self.weights.len());
        let mut post_activations = Vec::with_capacity(self.shape.len());

        let mut layer = input.clone();
        for (weights, biases) in self.weights.iter().zip(&self.biases) {
            let fully_connected = fully_connected_forward(&layer, weights, biases)?;
            let activated = activation_forward(&fully_connected, self.activation);

            post_activations.push(mem::replace(&mut layer, activated));
            pre_activations.push(fully_connected);
        }
        post_activations.push(layer);

        Ok(ForwardPass {
            pre_activations,
            post_activations,
        })
    }

    /// The network's output for `input`.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix, NetworkError> {
        Ok(self.feedforward(input)?.into_output())
    }

    /// Trains over `examples` for `config.epochs` epochs and returns the cost measured
    /// at the start of each epoch.
    ///
    /// Examples are consumed in non-overlapping mini-batches of `config.mini_batch_size`;
    /// any examples left over after the last full mini-batch are skipped for that epoch.
    #[instrument(level = "debug", skip_all, fields(examples = examples.len()))]
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        examples: &[TrainingExample],
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Result<Vec<Value>, NetworkError> {
        let size = config.mini_batch_size;
        if size == 0 || size > examples.len() {
            return Err(NetworkError::MiniBatchSize {
                size,
                examples: examples.len(),
            });
        }

        let mut order: Vec<&TrainingExample> = examples.iter().collect();
        let mut costs = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            let cost = self.cost_over_examples(&order[..])?;
            info!(epoch = epoch + 1, epochs = config.epochs, cost, "Training...");
            costs.push(cost);

            if config.shuffle {
                order.shuffle(rng);
            }

            for (batch, mini_batch) in order.chunks_exact(size).enumerate() {
                trace!(batch, "Descending.");
                self.gradient_descent(mini_batch)?;
            }
        }

        Ok(costs)
    }

    /// Updates every parameter from the gradients averaged over `mini_batch`.
    /// An empty mini-batch leaves the network unchanged.
    pub fn gradient_descent<E: Borrow<TrainingExample>>(
        &mut self,
        mini_batch: &[E],
    ) -> Result<(), NetworkError> {
        if mini_batch.is_empty() {
            return Ok(());
        }

        let mut gradients = Gradients::zeros(&self.shape);
        for example in mini_batch {
            self.backpropagate(example.borrow(), &mut gradients)?;
        }

        descend(
            &mut self.weights,
            &mut self.biases,
            &gradients,
            self.learning_rate,
            mini_batch.len(),
        )?;

        Ok(())
    }

    /// Adds the gradients of one example's error into `gradients`.
    pub fn backpropagate(
        &self,
        example: &TrainingExample,
        gradients: &mut Gradients,
    ) -> Result<(), NetworkError> {
        self.check_target(&example.target)?;

        let pass = self.feedforward(&example.input)?;
        self.accumulate_gradients(&pass, &example.target, gradients)
    }

    /// Adds the gradients of the error between `pass`'s output and `target` into
    /// `gradients`.
    ///
    /// The regularization derivative is added for every call, so a mini-batch of `n`
    /// examples accumulates it `n` times before the update averages over the batch.
    pub fn accumulate_gradients(
        &self,
        pass: &ForwardPass,
        target: &Matrix,
        gradients: &mut Gradients,
    ) -> Result<(), NetworkError> {
        self.check_target(target)?;

        let layers = self.weights.len();
        for found in [
            pass.pre_activations.len(),
            pass.post_activations.len() - 1,
            gradients.weights.len(),
            gradients.biases.len(),
        ] {
            if found != layers {
                return Err(NetworkError::LayerCount {
                    expected: layers,
                    found,
                });
            }
        }

        let outputs = self.outputs();
        let output = pass.output();

        let mut activation_gradients = Matrix::from_values(
            outputs,
            1,
            output
                .values()
                .zip(target.values())
                .map(|(&a, &t)| self.loss.derivative(a, t, outputs))
                .collect(),
        )?;

        for layer in (0..layers).rev() {
            let fully_connected_gradients = activation_backward(
                &pass.pre_activations[layer],
                &activation_gradients,
                self.activation,
            )?;

            let (weight_gradients, bias_gradients, input_gradients) = fully_connected_backward(
                &pass.post_activations[layer],
                &fully_connected_gradients,
                &self.weights[layer],
            )?;

            let regularization_gradients = self.weights[layer]
                .map(|w| self.regularization.derivative(w, outputs, self.lambda));

            gradients.weights[layer].add_assign(&weight_gradients.add(&regularization_gradients)?)?;
            gradients.biases[layer].add_assign(&bias_gradients)?;

            activation_gradients = input_gradients;
        }

        Ok(())
    }

    /// The summed error over `examples`, including the regularization penalty once
    /// per example.
    pub fn cost_over_examples<E: Borrow<TrainingExample>>(
        &self,
        examples: &[E],
    ) -> Result<Value, NetworkError> {
        let n = self.outputs();
        let penalty = self.regularization.value(&self.weights, n, self.lambda);

        let mut cost = 0.0;
        for example in examples {
            let example = example.borrow();
            self.check_target(&example.target)?;

            let output = self.predict(&example.input)?;
            for (&a, &t) in output.values().zip(example.target.values()) {
                cost += self.loss.value(a, t, n);
            }

            cost += penalty;
        }

        Ok(cost)
    }

    /// The percentage of `examples` whose output and target share a one-hot index.
    /// An empty set scores 0.
    pub fn accuracy_over_examples<E: Borrow<TrainingExample>>(
        &self,
        examples: &[E],
    ) -> Result<Value, NetworkError> {
        if examples.is_empty() {
            return Ok(0.0);
        }

        let mut correct = 0;
        for example in examples {
            let example = example.borrow();
            self.check_target(&example.target)?;

            let output = self.predict(&example.input)?;
            if one_hot_index(&output) == one_hot_index(&example.target) {
                correct += 1;
            }
        }

        Ok((correct as Value / examples.len() as Value) * 100.0)
    }
}

/// The index of the largest element of a vector. Ties go to the lowest index.
pub fn one_hot_index(vector: &Matrix) -> usize {
    let mut largest = Value::NEG_INFINITY;
    let mut index = 0;

    for (i, &value) in vector.values().enumerate() {
        if value > largest {
            largest = value;
            index = i;
        }
    }

    index
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network shape:")?;
        for size in &self.shape {
            write!(f, " {size}")?;
        }
        writeln!(f)?;

        writeln!(f, "Weight matrices:")?;
        for weights in &self.weights {
            writeln!(f, "{weights}")?;
        }

        writeln!(f, "Bias matrices:")?;
        for biases in &self.biases {
            writeln!(f, "{biases}")?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NetworkError {
    InvalidShape(Vec<usize>),
    InputDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },
    TargetDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },
    LayerCount {
        expected: usize,
        found: usize,
    },
    MiniBatchSize {
        size: usize,
        examples: usize,
    },
    Matrix(MatrixError),
}

impl From<MatrixError> for NetworkError {
    fn from(error: MatrixError) -> Self {
        Self::Matrix(error)
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShape(shape) => write!(
                f,
                "invalid network shape {shape:?}: need at least two non-empty layers"
            ),
            Self::InputDimensions { expected, found } => write!(
                f,
                "bad input dimensions: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            Self::TargetDimensions { expected, found } => write!(
                f,
                "bad target dimensions: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            Self::LayerCount { expected, found } => {
                write!(f, "expected {expected} layers, found {found}")
            }
            Self::MiniBatchSize { size, examples } => write!(
                f,
                "mini-batch size {size} must be between 1 and the number of examples ({examples})"
            ),
            Self::Matrix(error) => write!(f, "{error}"),
        }
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Matrix(error) => Some(error),
            _ => None,
        }
    }
}
