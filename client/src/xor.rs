use tracing::error;

use ann::linear_algebra::{Matrix, Value};
use ann::{seeded_rng, Network, NetworkConfig, TrainingConfig, TrainingExample};

use crate::args::XorConfig;
use crate::model;

pub fn run_xor(config: XorConfig) {
    if config.shape.first() != Some(&2) || config.shape.last() != Some(&1) {
        error!(shape = ?config.shape, "XOR networks have 2 inputs and 1 output.");
        return;
    }

    let mut network_config = NetworkConfig::new(config.shape.clone());
    config.params.apply(&mut network_config);

    let mut rng = seeded_rng(config.seed);

    let mut network = match Network::new(&network_config, &mut rng) {
        Ok(network) => network,
        Err(err) => {
            error!(error = %err, "Could not create network.");
            return;
        }
    };

    let examples = examples();

    print_outputs(&network, &examples);

    if let Some(path) = &config.load {
        if let Err(err) = model::load(&mut network, path, config.raw) {
            error!(error = %err, ?path, "Could not load model.");
            return;
        }
    } else {
        let training_config = TrainingConfig {
            epochs: config.epochs,
            mini_batch_size: config.batch,
            shuffle: true,
            seed: config.seed,
        };

        if let Err(err) = network.train(&examples, &training_config, &mut rng) {
            error!(error = %err, "Training failed.");
            return;
        }
    }

    println!();
    print_outputs(&network, &examples);

    if let Some(path) = &config.save {
        model::save(&network, path, config.raw);
    }
}

fn examples() -> Vec<TrainingExample> {
    [
        ([0.0, 0.0], 0.0),
        ([1.0, 0.0], 1.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 1.0], 0.0),
    ]
    .into_iter()
    .map(|(input, target): ([Value; 2], Value)| {
        TrainingExample::new(Matrix::column(&input), [[target]].into())
    })
    .collect()
}

fn print_outputs(network: &Network, examples: &[TrainingExample]) {
    for example in examples {
        match network.predict(&example.input) {
            Ok(output) => println!(
                "Input: {}, {}; Output: {}",
                example.input[(0, 0)],
                example.input[(1, 0)],
                output[(0, 0)],
            ),
            Err(err) => {
                error!(error = %err, "Could not run network.");
                return;
            }
        }
    }
}
