mod app;
mod browser;
mod core;
mod logger;
mod modules;
mod services;
mod utils;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::info;

use app::cli::{Cli, Command};
use app::config::AppConfig;
use services::orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Harvest(args) => {
            args.browser.apply(&mut config);
            let request = args.into_request(Local::now().date_naive())?;
            let report = orchestrator::run(&config, &request).await?;

            println!("Records:      {}", report.results.len());
            println!("Successful:   {}", report.stats.successful());
            println!("  no data:    {}", report.stats.no_data);
            println!("Failed:       {}", report.stats.failed);
            println!("Output:       {}", report.output.display());
        }
        Command::Catalog(args) => {
            args.browser.apply(&mut config);
            let listing = orchestrator::list_catalog(&config, &args.filter()).await?;
            info!("📋 {} result listings on the portal", listing.len());

            for candidate in &listing {
                println!(
                    "Semester {:<2} {:<9} {:<10} {}{}",
                    candidate.semester,
                    candidate.batch_session,
                    candidate.published_date,
                    if candidate.is_special { "[special] " } else { "" },
                    candidate.exam_text
                );
            }
        }
    }

    Ok(())
}
