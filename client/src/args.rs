use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args as ArgsTrait, Parser, Subcommand};
use serde::de::DeserializeOwned;

use ann::linear_algebra::Value;
use ann::{Activation, Initialization, NetworkConfig, Regularization, TrainingConfig};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Trains a small network to compute XOR and prints its outputs.
    Xor(XorConfig),
    /// Trains a network on an MNIST-format dataset.
    Train(TrainConfig),
    /// Reports the accuracy and cost of a saved model over a dataset.
    Evaluate(EvaluateConfig),
    /// Reads sample indexes from stdin and prints each sample with the model's prediction.
    Query(QueryConfig),
    /// Prints the parameters of a saved model.
    Inspect(InspectConfig),
}

/// The architecture a model file is loaded into or saved from. Model files only hold
/// parameters, so the same architecture must be given when loading.
#[derive(ArgsTrait, Clone, Debug)]
pub struct NetworkArgs {
    /// Layer sizes, input first.
    #[arg(long, value_delimiter = ',', default_value = "784,30,10")]
    pub shape: Vec<usize>,

    /// Network options.
    ///
    /// Parameters:
    ///   rate=decimal          - The learning rate.
    ///   lambda=decimal        - The regularization strength.
    ///   activation=string     - (sigmoid, tanh, or relu)
    ///   regularization=string - (l2 or none)
    ///   initialization=string - (uniform, he, or glorot)
    #[arg(long, default_value = "rate=0.5,lambda=0.01", verbatim_doc_comment)]
    pub params: Hyperparameters,

    /// A JSON network configuration file. Overrides `shape` and `params`.
    #[arg(long, verbatim_doc_comment)]
    pub network: Option<PathBuf>,

    /// Read and write model files in the headerless legacy format.
    #[arg(long)]
    pub raw: bool,
}

impl NetworkArgs {
    pub fn network_config(&self) -> Result<NetworkConfig, String> {
        if let Some(path) = &self.network {
            return read_json(path);
        }

        let mut config = NetworkConfig::new(self.shape.clone());
        self.params.apply(&mut config);
        Ok(config)
    }
}

/// An MNIST-format image file and its label file.
#[derive(ArgsTrait, Clone, Debug)]
pub struct DatasetArgs {
    /// IDX image file.
    #[arg(long)]
    pub images: PathBuf,

    /// IDX label file.
    #[arg(long)]
    pub labels: PathBuf,

    /// Only read this many samples from the start of the files.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct ScheduleArgs {
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Examples per mini-batch.
    #[arg(long, default_value_t = 10)]
    pub batch: usize,

    /// Process examples in file order every epoch.
    #[arg(long)]
    pub no_shuffle: bool,

    /// Seed for weight initialization and shuffling. Runs with the same seed are identical.
    #[arg(long)]
    pub seed: Option<u64>,

    /// A JSON training configuration file. Overrides the options above.
    #[arg(long)]
    pub training: Option<PathBuf>,
}

impl ScheduleArgs {
    pub fn training_config(&self) -> Result<TrainingConfig, String> {
        if let Some(path) = &self.training {
            return read_json(path);
        }

        Ok(TrainingConfig {
            epochs: self.epochs,
            mini_batch_size: self.batch,
            shuffle: !self.no_shuffle,
            seed: self.seed,
        })
    }
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct XorConfig {
    /// Layer sizes. Must start with 2 and end with 1.
    #[arg(long, value_delimiter = ',', default_value = "2,3,3,1")]
    pub shape: Vec<usize>,

    /// Network options. The same as the options for `train`.
    #[arg(long, default_value = "rate=0.4,lambda=0.0002", verbatim_doc_comment)]
    pub params: Hyperparameters,

    #[arg(long, default_value_t = 10000)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// A model file to load instead of training.
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// A file to save the model to.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Read and write model files in the headerless legacy format.
    #[arg(long)]
    pub raw: bool,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct TrainConfig {
    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// A model file to continue training from.
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// A file to save the trained model to.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// IDX image file to measure accuracy on after training.
    #[arg(long, requires = "test_labels")]
    pub test_images: Option<PathBuf>,

    /// IDX label file to measure accuracy on after training.
    #[arg(long, requires = "test_images")]
    pub test_labels: Option<PathBuf>,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct EvaluateConfig {
    /// The model file to evaluate.
    #[arg(long)]
    pub model: PathBuf,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct QueryConfig {
    /// The model file to query.
    #[arg(long)]
    pub model: PathBuf,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct InspectConfig {
    /// The model file to print.
    #[arg(long)]
    pub model: PathBuf,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Print the network as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Hyperparameters {
    pub learning_rate: Option<Value>,
    pub lambda: Option<Value>,
    pub activation: Option<Activation>,
    pub regularization: Option<Regularization>,
    pub initialization: Option<Initialization>,
}

impl Hyperparameters {
    pub fn apply(&self, config: &mut NetworkConfig) {
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(lambda) = self.lambda {
            config.lambda = lambda;
        }
        if let Some(activation) = self.activation {
            config.activation = activation;
        }
        if let Some(regularization) = self.regularization {
            config.regularization = regularization;
        }
        if let Some(initialization) = self.initialization {
            config.initialization = initialization;
        }
    }
}

impl FromStr for Hyperparameters {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }

        let fields = parse_map(s)?;

        if let Some(unknown) = fields.keys().find(|key| {
            !["rate", "lambda", "activation", "regularization", "initialization"].contains(*key)
        }) {
            return Err(format!("unknown parameter: {unknown}"));
        }

        let learning_rate = fields
            .get("rate")
            .map(|&f| {
                f.parse::<Value>()
                    .map_err(|_| format!("invalid value for rate: {f}"))
            })
            .transpose()?;

        let lambda = fields
            .get("lambda")
            .map(|&f| {
                f.parse::<Value>()
                    .map_err(|_| format!("invalid value for lambda: {f}"))
            })
            .transpose()?;

        let activation = fields
            .get("activation")
            .map(|&f| parse_name("activation", f))
            .transpose()?;

        let regularization = fields
            .get("regularization")
            .map(|&f| parse_name("regularization", f))
            .transpose()?;

        let initialization = fields
            .get("initialization")
            .map(|&f| parse_name("initialization", f))
            .transpose()?;

        Ok(Self {
            learning_rate,
            lambda,
            activation,
            regularization,
            initialization,
        })
    }
}

/// Parses a strategy by the same name it has in JSON configuration files.
fn parse_name<T: DeserializeOwned>(key: &str, name: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(name.to_owned()))
        .map_err(|_| format!("invalid value for {key}: {name}"))
}

fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<T, String> {
    let file = std::fs::File::open(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|err| format!("{}: {err}", path.display()))
}

fn parse_map(string: &str) -> Result<HashMap<&str, &str>, String> {
    string
        .split(',')
        .map(|field| field.trim())
        .map(|field| field.split('=').map(|part| part.trim()))
        .map(|mut field_part| {
            let key = field_part
                .next()
                .ok_or_else(|| "no key for field".to_owned())?;
            let value = field_part
                .next()
                .ok_or_else(|| format!("no value for key: {key}"))?;
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperparameters() {
        let params: Hyperparameters = "rate=0.4, lambda=0.0002,activation=relu,initialization=he"
            .parse()
            .unwrap();

        assert_eq!(params.learning_rate, Some(0.4));
        assert_eq!(params.lambda, Some(0.0002));
        assert_eq!(params.activation, Some(Activation::Relu));
        assert_eq!(params.regularization, None);
        assert_eq!(params.initialization, Some(Initialization::He));

        let mut config = NetworkConfig::new(vec![2, 1]);
        params.apply(&mut config);
        assert_eq!(config.learning_rate, 0.4);
        assert_eq!(config.activation, Activation::Relu);
        assert_eq!(config.regularization, Regularization::L2);
    }

    #[test]
    fn empty_hyperparameters() {
        let params: Hyperparameters = "".parse().unwrap();
        assert!(params.learning_rate.is_none());
        assert!(params.activation.is_none());
    }

    #[test]
    fn invalid_hyperparameters() {
        assert!("rate=fast".parse::<Hyperparameters>().is_err());
        assert!("activation=softmax".parse::<Hyperparameters>().is_err());
        assert!("momentum=0.9".parse::<Hyperparameters>().is_err());
        assert!("rate".parse::<Hyperparameters>().is_err());
    }

    #[test]
    fn command_line() {
        let args = Args::try_parse_from([
            "mlp",
            "train",
            "--images",
            "images.idx",
            "--labels",
            "labels.idx",
            "--shape",
            "784,100,10",
            "--no-shuffle",
            "--seed",
            "3",
        ])
        .unwrap();

        match args.command {
            Command::Train(config) => {
                assert_eq!(config.network.shape, vec![784, 100, 10]);

                let training = config.schedule.training_config().unwrap();
                assert_eq!(training.epochs, 5);
                assert_eq!(training.mini_batch_size, 10);
                assert!(!training.shuffle);
                assert_eq!(training.seed, Some(3));

                let network = config.network.network_config().unwrap();
                assert_eq!(network.learning_rate, 0.5);
                assert_eq!(network.lambda, 0.01);
            }
            command => panic!("unexpected command: {command:?}"),
        }
    }

    #[test]
    fn test_files_come_in_pairs() {
        assert!(Args::try_parse_from([
            "mlp",
            "train",
            "--images",
            "a",
            "--labels",
            "b",
            "--test-images",
            "c",
        ])
        .is_err());
    }
}
