use crate::config::EngineConfig;
use crate::core::channel::{ContextBus, ContextId, Endpoint, Message};
use crate::core::ingestion::{IngestReport, IngestionPipeline, InterceptedExchange};
use crate::core::queries;
use crate::core::route::PageRoute;
use crate::core::store::AttributionStore;
use crate::domain::ports::{GraphqlTransport, PageStateSource};
use crate::utils::error::{MarkerError, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle given to the transport collaborator to report completed calls.
#[derive(Debug, Clone)]
pub struct Interceptor {
    tx: mpsc::UnboundedSender<InterceptedExchange>,
}

impl Interceptor {
    pub fn report(&self, exchange: InterceptedExchange) -> Result<()> {
        self.tx.send(exchange).map_err(|_| MarkerError::ChannelClosed {
            context: "attribution engine stopped".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FetchJob {
    Item(String),
    Collection(String),
}

#[derive(Debug)]
struct FetchOutcome {
    job: FetchJob,
    request_id: Option<u64>,
    result: Result<Value>,
}

/// Producer side of the page context.
///
/// Sole owner of the [`AttributionStore`]. Interceptions, channel messages
/// and finished on-demand fetches are handled one at a time on a single
/// loop; fetches themselves run as spawned tasks and report back.
pub struct AttributionEngine<T, S> {
    pipeline: IngestionPipeline,
    store: AttributionStore,
    transport: Arc<T>,
    page_state: S,
    endpoint: Endpoint,
    route: PageRoute,
    collection_page_size: usize,
    captured_headers: Option<HashMap<String, String>>,
    pending: HashSet<FetchJob>,
    interceptions: mpsc::UnboundedReceiver<InterceptedExchange>,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
}

impl<T, S> AttributionEngine<T, S>
where
    T: GraphqlTransport + 'static,
    S: PageStateSource,
{
    pub fn new(
        config: &EngineConfig,
        transport: T,
        page_state: S,
        bus: &ContextBus,
        route: PageRoute,
    ) -> (Self, Interceptor) {
        let (intercept_tx, interceptions) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();

        let engine = Self {
            pipeline: IngestionPipeline::new(config),
            store: AttributionStore::new(),
            transport: Arc::new(transport),
            page_state,
            endpoint: bus.endpoint(ContextId::Page),
            route,
            collection_page_size: config.marketplace.collection_page_size,
            captured_headers: None,
            pending: HashSet::new(),
            interceptions,
            fetch_tx,
            fetch_rx,
        };

        (engine, Interceptor { tx: intercept_tx })
    }

    /// Runs until every [`Interceptor`] is dropped and returns the final store.
    /// On-demand fetches still in flight at that point are discarded.
    pub async fn run(mut self) -> Result<AttributionStore> {
        tracing::info!("🚀 Attribution engine started on {:?}", self.route);

        loop {
            tokio::select! {
                exchange = self.interceptions.recv() => match exchange {
                    Some(exchange) => self.on_intercepted(exchange),
                    None => break,
                },
                message = self.endpoint.recv() => match message {
                    Some(message) => self.on_message(message),
                    None => {
                        return Err(MarkerError::ChannelClosed {
                            context: "context bus closed".to_string(),
                        })
                    }
                },
                Some(outcome) = self.fetch_rx.recv() => self.on_fetch_outcome(outcome),
            }
        }

        tracing::info!("🏁 Attribution engine stopped with {} NFTs", self.store.len());
        Ok(self.store)
    }

    fn on_intercepted(&mut self, exchange: InterceptedExchange) {
        if !self.pipeline.matches(&exchange.url) {
            return;
        }

        if self.captured_headers.is_none() && !exchange.request_headers.is_empty() {
            tracing::debug!("Captured {} GraphQL request headers", exchange.request_headers.len());
            self.captured_headers = Some(exchange.request_headers.clone());
        }

        let report = self.pipeline.ingest_intercepted(&mut self.store, &exchange);
        self.publish_if_changed(&report, None);
    }

    fn on_message(&mut self, message: Message) {
        match message {
            Message::RequestData {
                request_id,
                identifiers,
            } => {
                tracing::info!("📨 Request {} for {} NFT addresses", request_id, identifiers.len());
                for job in self.jobs_for(identifiers) {
                    self.spawn_fetch(job, Some(request_id));
                }
            }
            Message::ExtractPageData => self.extract_page_data(),
            Message::DataUpdated { .. } => {}
        }
    }

    /// Collection pages are served by one search; everywhere else each
    /// unattributed identifier gets its own point query, plus the page's own
    /// item on item pages.
    fn jobs_for(&self, identifiers: Vec<String>) -> Vec<FetchJob> {
        if let PageRoute::Collection(collection) = &self.route {
            return vec![FetchJob::Collection(collection.clone())];
        }

        let mut wanted = identifiers;
        if let Some(address) = self.route.item_address() {
            if !wanted.iter().any(|id| id == address) {
                wanted.push(address.to_string());
            }
        }

        let mut seen = HashSet::new();
        wanted
            .into_iter()
            .filter(|id| !self.store.contains(id) && seen.insert(id.clone()))
            .map(FetchJob::Item)
            .collect()
    }

    fn spawn_fetch(&mut self, job: FetchJob, request_id: Option<u64>) {
        if !self.pending.insert(job.clone()) {
            tracing::debug!("{:?} already in flight", job);
            return;
        }

        let headers = self.request_headers();
        let request = match &job {
            FetchJob::Item(address) => queries::item_by_address(address, &headers),
            FetchJob::Collection(collection) => {
                queries::collection_search(collection, self.collection_page_size, &headers)
            }
        };

        let transport = Arc::clone(&self.transport);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = transport.execute(&request).await;
            // 引擎已停止時結果直接丟棄
            let _ = tx.send(FetchOutcome {
                job,
                request_id,
                result,
            });
        });
    }

    fn request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.captured_headers.clone().unwrap_or_default();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    fn on_fetch_outcome(&mut self, outcome: FetchOutcome) {
        self.pending.remove(&outcome.job);

        let body = match outcome.result {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("⚠️ On-demand fetch {:?} failed: {}", outcome.job, e);
                return;
            }
        };

        let report = match &outcome.job {
            FetchJob::Item(_) => self.pipeline.ingest_point_query(&mut self.store, &body),
            FetchJob::Collection(_) => {
                self.pipeline
                    .ingest_response(&mut self.store, &body, "nftSearch (on demand)")
            }
        };
        self.publish_if_changed(&report, outcome.request_id);
    }

    fn extract_page_data(&mut self) {
        match self.page_state.load() {
            Ok(Some(document)) => {
                self.pipeline.ingest_page_state(&mut self.store, &document);
                // 就算沒有新增也重送一次，補回可能遺失的訊息
                if !self.store.is_empty() {
                    self.broadcast(None);
                }
            }
            Ok(None) => tracing::info!("No embedded page state found"),
            Err(e) => tracing::warn!("⚠️ Could not read page state: {}", e),
        }
    }

    fn publish_if_changed(&self, report: &IngestReport, in_reply_to: Option<u64>) {
        if report.added > 0 {
            self.broadcast(in_reply_to);
        }
    }

    fn broadcast(&self, in_reply_to: Option<u64>) {
        let message = Message::DataUpdated {
            snapshot: self.store.snapshot(),
            in_reply_to,
        };
        if let Err(e) = self.endpoint.send(message) {
            tracing::warn!("⚠️ Could not publish snapshot: {}", e);
        }
    }
}
