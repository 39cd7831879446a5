use std::env;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format;

use self::args::{Args, Command};
use self::inspect::run_inspect;
use self::query::run_query;
use self::train::{run_evaluation, run_training};
use self::xor::run_xor;

mod args;
mod dataset;
mod inspect;
mod model;
mod query;
mod train;
mod xor;

fn main() {
    let args = Args::parse();

    if matches!(args.command, Command::Train(_) | Command::Evaluate(_)) {
        set_default_logging();
    }

    let event_format = format().with_target(false).without_time();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(event_format)
        .init();

    match args.command {
        Command::Xor(config) => run_xor(config),
        Command::Train(config) => run_training(config),
        Command::Evaluate(config) => run_evaluation(config),
        Command::Query(config) => run_query(config),
        Command::Inspect(config) => run_inspect(config),
    }
}

fn set_default_logging() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
}
