mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{handle_cleanup, handle_list, handle_run, handle_script, handle_url};
use rr_requests::{ApiClient, Result};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server)?;

    let result = match cli.command {
        Commands::Script {
            script_id,
            project_id,
        } => handle_script(&client, script_id, project_id).await,
        Commands::Run { run_id } => handle_run(&client, run_id).await,
        Commands::Url { run_id } => handle_url(&client, run_id).await,
        Commands::List { project_id } => handle_list(&client, project_id).await,
        Commands::Cleanup { days } => handle_cleanup(&client, days).await,
    };

    if let Err(ref e) = result {
        log::error!("Error: {}", e);
    }

    result
}
