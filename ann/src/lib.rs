pub use self::activation::Activation;
pub use self::gradient_descent::Gradients;
pub use self::layer::Initialization;
pub use self::loss::Loss;
pub use self::network::{
    one_hot_index, seeded_rng, ForwardPass, Network, NetworkConfig, NetworkError, TrainingConfig,
    TrainingExample,
};
pub use self::persistence::ModelError;
pub use self::regularization::Regularization;

pub mod linear_algebra;
pub mod loss;

mod activation;
mod gradient_descent;
mod layer;
mod network;
mod persistence;
mod regularization;
