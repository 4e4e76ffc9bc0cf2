use crate::config::EngineConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_url, Validate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "venue-marker")]
#[command(about = "Attribute marketplace NFTs to the venue they are listed on")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the GraphQL endpoint from the config
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Ingest a saved page (HTML with __NEXT_DATA__, or the JSON document itself)
    PageState { file: PathBuf },

    /// Ingest saved GraphQL responses as if they had been intercepted
    Responses {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Query the marketplace for specific NFT addresses
    Lookup {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

impl CliConfig {
    /// Config file (or defaults) with command line overrides applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.marketplace.graphql_endpoint = endpoint.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            validate_url("--endpoint", endpoint)?;
        }
        Ok(())
    }
}
