use anyhow::Result;
use tracing::{error, info};

use page_recast::{cli, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    // Verbose runs also keep a log file
    let log_file = args
        .log_file
        .clone()
        .or_else(|| args.verbose.then(utils::default_log_file));
    utils::init_logging(args.verbose, log_file)?;

    info!("Starting page-recast v{}", env!("CARGO_PKG_VERSION"));

    match cli::process_command(args).await {
        Ok(_) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
