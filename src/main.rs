use anyhow::Result;
use clap::Parser;
use facility_admin::cli::Cli;
use facility_admin::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.settings.log_filter.as_deref());
    cli.run().await
}
