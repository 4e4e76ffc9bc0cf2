use clap::Parser;
use venue_marker::config::cli::Command;
use venue_marker::core::queries;
use venue_marker::domain::ports::{GraphqlTransport, PageStateSource};
use venue_marker::utils::error::ErrorSeverity;
use venue_marker::utils::{logger, validation::Validate};
use venue_marker::{
    AttributionStore, CliConfig, EngineConfig, FilePageState, HttpTransport, IngestReport,
    IngestionPipeline, MarkerError, Snapshot,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting venue-marker CLI");
    tracing::debug!("CLI config: {:?}", cli);

    let outcome = match cli.validate().and_then(|_| cli.engine_config()) {
        Ok(config) => run(&cli.command, &config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(snapshot) => {
            tracing::info!("✅ Attributed {} NFTs", snapshot.len());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Err(e) => {
            tracing::error!("❌ venue-marker failed: {} (Severity: {:?})", e, e.severity());
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(command: &Command, config: &EngineConfig) -> Result<Snapshot, MarkerError> {
    let pipeline = IngestionPipeline::new(config);
    let mut store = AttributionStore::new();
    let mut total = IngestReport::default();

    match command {
        Command::PageState { file } => {
            tracing::info!("📁 Reading page state from: {}", file.display());
            match FilePageState::new(file).load()? {
                Some(document) => {
                    total.merge(&pipeline.ingest_page_state(&mut store, &document));
                }
                None => tracing::warn!("⚠️ No __NEXT_DATA__ found in {}", file.display()),
            }
        }
        Command::Responses { files } => {
            for file in files {
                total.merge(&pipeline.ingest_response_file(&mut store, file));
            }
        }
        Command::Lookup { addresses } => {
            let transport = HttpTransport::from_config(config);
            let headers = Default::default();
            for address in addresses {
                if store.contains(address) {
                    continue;
                }
                // 單筆失敗不影響其他地址
                match transport
                    .execute(&queries::item_by_address(address, &headers))
                    .await
                {
                    Ok(body) => total.merge(&pipeline.ingest_point_query(&mut store, &body)),
                    Err(e) => tracing::warn!("⚠️ Lookup of {} failed: {}", address, e),
                }
            }
        }
    }

    if total.skipped() > 0 {
        tracing::info!(
            "Skipped {} candidates (shape: {}, unresolved: {}, unclassifiable: {})",
            total.skipped(),
            total.shape_mismatch,
            total.unresolvable_reference,
            total.unclassifiable
        );
    }

    Ok(store.snapshot())
}
