use tracing::error;

use crate::args::InspectConfig;
use crate::model;

pub fn run_inspect(config: InspectConfig) {
    let network = match model::load_network(&config.network, &config.model) {
        Some(network) => network,
        None => return,
    };

    if config.json {
        match serde_json::to_string_pretty(&network) {
            Ok(json) => println!("{json}"),
            Err(err) => error!(error = %err, "Could not serialize network."),
        }
    } else {
        print!("{network}");
    }
}
