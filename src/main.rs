// Usage:
//   roadseg [config.json]
// Without an argument every setting takes its default. RUST_LOG controls
// verbosity (default `info`).
use std::path::Path;

use log::error;

use roadseg::{pipeline, RunConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = match std::env::args_os().nth(1) {
        Some(path) => RunConfig::load_json(Path::new(&path)),
        None => Ok(RunConfig::default()),
    };

    if let Err(e) = cfg.and_then(|cfg| pipeline::run(&cfg)) {
        error!("{}", e);
        std::process::exit(1);
    }
}
