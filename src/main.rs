use std::path::Path;

use terrasphere::{AppConfig, CONFIG_FILE};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = Path::new(CONFIG_FILE);
    let config = if path.exists() {
        AppConfig::load(path).unwrap_or_else(|e| {
            log::warn!("Using default config: {}", e);
            AppConfig::default()
        })
    } else {
        AppConfig::default()
    };

    if let Err(e) = terrasphere::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
