//! Coldstart — cold-start latency statistics from AWS X-Ray traces.

use clap::Parser;
use coldstart_cli::{format_error_chain, logging, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", format_error_chain(&err));
            std::process::exit(2);
        }
    };
    logging::init(config.log.filter.as_deref(), cli.verbose);

    if let Err(err) = run(&cli, &config).await {
        eprintln!("{}", format_error_chain(&err));
        std::process::exit(1);
    }
}
