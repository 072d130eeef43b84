use std::str::FromStr;
use tracing::Level;

/// Install the fmt subscriber; `--verbose` wins over the configured level
pub fn init(verbose: bool, configured: Option<&str>) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(level(verbose, configured))
        .init();
}

fn level(verbose: bool, configured: Option<&str>) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    configured
        .and_then(|name| Level::from_str(name).ok())
        .unwrap_or(Level::INFO)
}
