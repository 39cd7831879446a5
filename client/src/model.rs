use std::path::Path;

use tracing::{error, info};

use ann::{seeded_rng, ModelError, Network};

use crate::args::NetworkArgs;

/// Builds the network described by `args` and fills it from the model file at `path`.
pub fn load_network(args: &NetworkArgs, path: &Path) -> Option<Network> {
    let config = match args.network_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid network configuration.");
            return None;
        }
    };

    // Every parameter is overwritten by the load.
    let mut network = match Network::new(&config, &mut seeded_rng(None)) {
        Ok(network) => network,
        Err(err) => {
            error!(error = %err, "Could not create network.");
            return None;
        }
    };

    if let Err(err) = load(&mut network, path, args.raw) {
        error!(error = %err, ?path, "Could not load model.");
        return None;
    }

    Some(network)
}

pub fn load(network: &mut Network, path: &Path, raw: bool) -> Result<(), ModelError> {
    if raw {
        network.load_raw(path)
    } else {
        network.load(path)
    }
}

pub fn save(network: &Network, path: &Path, raw: bool) {
    let result = if raw {
        network.save_raw(path)
    } else {
        network.save(path)
    };

    match result {
        Ok(()) => info!(?path, "Saved model."),
        Err(err) => error!(error = %err, ?path, "Could not save model."),
    }
}
