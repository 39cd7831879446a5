use std::time::Instant;

use tracing::{error, info};

use ann::Network;

use crate::args::{EvaluateConfig, TrainConfig};
use crate::dataset::read_examples;
use crate::model;

pub fn run_training(config: TrainConfig) {
    let network_config = match config.network.network_config() {
        Ok(network_config) => network_config,
        Err(err) => {
            error!(error = %err, "Invalid network configuration.");
            return;
        }
    };

    let training_config = match config.schedule.training_config() {
        Ok(training_config) => training_config,
        Err(err) => {
            error!(error = %err, "Invalid training configuration.");
            return;
        }
    };

    let dataset = &config.dataset;
    let examples = match read_examples(&dataset.images, &dataset.labels, dataset.count) {
        Ok(examples) => examples,
        Err(err) => {
            error!(error = %err, "Could not read training data.");
            return;
        }
    };

    let mut rng = training_config.rng();

    let mut network = match Network::new(&network_config, &mut rng) {
        Ok(network) => network,
        Err(err) => {
            error!(error = %err, "Could not create network.");
            return;
        }
    };

    if let Some(path) = &config.load {
        if let Err(err) = model::load(&mut network, path, config.network.raw) {
            error!(error = %err, ?path, "Could not load model.");
            return;
        }
    }

    info!(
        examples = examples.len(),
        shape = ?network.shape(),
        parameters = network.parameter_count(),
        "Training network.",
    );

    let start = Instant::now();

    let costs = match network.train(&examples, &training_config, &mut rng) {
        Ok(costs) => costs,
        Err(err) => {
            error!(error = %err, "Training failed.");
            return;
        }
    };

    info!(time = ?start.elapsed(), cost = ?costs.last(), "Training finished.");

    if let (Some(images), Some(labels)) = (&config.test_images, &config.test_labels) {
        let testing_examples = match read_examples(images, labels, None) {
            Ok(examples) => examples,
            Err(err) => {
                error!(error = %err, "Could not read testing data.");
                return;
            }
        };

        match network.accuracy_over_examples(&testing_examples) {
            Ok(accuracy) => println!("Accuracy over testing data: {accuracy}"),
            Err(err) => {
                error!(error = %err, "Could not evaluate network.");
                return;
            }
        }
    }

    if let Some(path) = &config.save {
        model::save(&network, path, config.network.raw);
    }
}

pub fn run_evaluation(config: EvaluateConfig) {
    let network = match model::load_network(&config.network, &config.model) {
        Some(network) => network,
        None => return,
    };

    let dataset = &config.dataset;
    let examples = match read_examples(&dataset.images, &dataset.labels, dataset.count) {
        Ok(examples) => examples,
        Err(err) => {
            error!(error = %err, "Could not read data.");
            return;
        }
    };

    let result = network
        .accuracy_over_examples(&examples)
        .and_then(|accuracy| Ok((accuracy, network.cost_over_examples(&examples)?)));

    match result {
        Ok((accuracy, cost)) => {
            println!("Examples: {}", examples.len());
            println!("Accuracy: {accuracy:.2}%");
            println!("Cost: {cost}");
        }
        Err(err) => error!(error = %err, "Could not evaluate network."),
    }
}
