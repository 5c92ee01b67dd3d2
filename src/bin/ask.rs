use anyhow::{Result, bail};

use weather_agent::{Config, WeatherAgent, init_tracing};

/// One-shot question from the command line, for trying the pipeline without the server
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        bail!("usage: ask <question>");
    }

    let config = Config::load();
    let agent = WeatherAgent::from_config(&config)?;
    println!("{}", agent.ask(&question).await);
    Ok(())
}
