pub mod agent;
pub mod config;
pub mod error;
pub mod extract;
pub mod forecast;
pub mod intent;
pub mod location;
pub mod models;
pub mod server;
pub mod summary;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use crate::agent::WeatherAgent;
pub use crate::config::Config;
pub use crate::error::{AgentError, Result};

/// Install the stderr tracing subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
