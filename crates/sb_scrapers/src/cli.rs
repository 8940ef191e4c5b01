use std::time::Duration;

use clap::{Args, Subcommand};
use sb_core::Result;

use crate::config::ScraperConfig;
use crate::serializer::{serialize, Format};
use crate::staatsblad::StaatsbladScraper;

#[derive(Args, Debug)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommands,
}

#[derive(Subcommand, Debug)]
pub enum RegistryCommands {
    /// Look up a company by enterprise number (e.g. 0403.200.393)
    Search {
        company_number: String,

        /// Write <PREFIX>.json, <PREFIX>.md and <PREFIX>.txt
        #[arg(long, value_name = "PREFIX")]
        save: Option<String>,

        /// Format printed to stdout
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: Format,

        /// Registry base URL (overrides STAATSBLAD_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long)]
        max_retries: Option<u32>,
    },
}

fn parse_format(s: &str) -> std::result::Result<Format, String> {
    s.parse::<Format>().map_err(|e| e.to_string())
}

pub async fn handle_command(args: RegistryArgs) -> Result<()> {
    match args.command {
        RegistryCommands::Search {
            company_number,
            save,
            format,
            base_url,
            timeout,
            max_retries,
        } => {
            let mut config = ScraperConfig::from_env()?;
            if let Some(base_url) = base_url {
                config = config.with_base_url(base_url);
            }
            if let Some(secs) = timeout {
                config = config.with_timeout(Duration::from_secs(secs));
            }
            if let Some(retries) = max_retries {
                config = config.with_max_retries(retries);
            }

            let scraper = StaatsbladScraper::new(config)?;
            let record = scraper.search_company(&company_number).await?;
            println!("{}", serialize(&record, format)?);

            if let Some(prefix) = save {
                for path in scraper.save_results_to_files(&record, &prefix).await? {
                    eprintln!("Saved {}", path.display());
                }
            }
        }
    }
    Ok(())
}
