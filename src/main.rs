//! Hydropower fraud detector - training entry point
//!
//! Trains the Isolation Forest on the convention-path dataset and writes the
//! model and metrics. Exits non-zero on any fatal pipeline error.

use clap::Parser;
use hydro_anomaly::cli::{cmd_train, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydro_anomaly=info".into()),
        )
        .with_writer(std::io::stdout)
        .init();

    let cli = Cli::parse();
    cmd_train(cli.to_config())
}
