use std::io::{self, BufRead};

use tracing::{error, warn};

use ann::one_hot_index;

use crate::args::QueryConfig;
use crate::dataset::{self, read_examples};
use crate::model;

const COLUMNS: usize = 28;

pub fn run_query(config: QueryConfig) {
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

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "Could not read from stdin.");
                return;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let index = match line.parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                warn!(input = line, "Not a sample index.");
                continue;
            }
        };

        let example = match examples.get(index) {
            Some(example) => example,
            None => {
                warn!(index, samples = examples.len(), "Sample index out of range.");
                continue;
            }
        };

        println!("Image of a {}\n", dataset::label(example));
        print!("{}", dataset::render(&example.input, COLUMNS));

        match network.predict(&example.input) {
            Ok(output) => println!("Prediction: {}", one_hot_index(&output)),
            Err(err) => {
                error!(error = %err, "Could not run network.");
                return;
            }
        }
    }
}
