use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitlab_migrate::cli::{self, Args};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gitlab_migrate=info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if let Err(err) = cli::run(args).await {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}
