pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{FilePageState, HttpTransport, StaticPageState};
pub use config::EngineConfig;
pub use crate::core::{
    channel::{ContextBus, ContextId, Message},
    consumer::{Badge, ConsumerView},
    engine::{AttributionEngine, Interceptor},
    ingestion::{IngestReport, IngestionPipeline, InterceptedExchange},
    route::PageRoute,
    store::AttributionStore,
};
pub use domain::model::{AttributionRecord, Snapshot, Venue};
pub use utils::error::{MarkerError, Result};
