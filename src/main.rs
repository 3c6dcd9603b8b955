use clap::Parser;
use invquant::cli::{Cli, run};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("invquant=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
