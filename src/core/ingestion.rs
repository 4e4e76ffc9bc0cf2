use crate::config::EngineConfig;
use crate::core::classifier::VenueClassifier;
use crate::core::resolver::{resolve, LookupTable, Resolution};
use crate::core::shape::{find_edge_list_items, find_item_candidate};
use crate::core::store::AttributionStore;
use crate::domain::model::{AttributionRecord, Item, Listing, ITEM_TYPENAME};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// Field of `props.pageProps` holding the normalized GraphQL cache.
pub const CACHE_FIELD: &str = "gqlCache";

/// Cache type tags that carry a listing of their own.
pub const LISTING_TYPE_TAGS: [&str; 2] = ["NftSaleFixPrice", "NftSaleAuction"];

/// Why a candidate produced no attribution in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ShapeMismatch,
    UnresolvableReference,
    Unclassifiable,
}

/// What one ingestion pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub candidates: usize,
    pub added: usize,
    pub already_known: usize,
    pub shape_mismatch: usize,
    pub unresolvable_reference: usize,
    pub unclassifiable: usize,
}

impl IngestReport {
    fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::ShapeMismatch => self.shape_mismatch += 1,
            SkipReason::UnresolvableReference => self.unresolvable_reference += 1,
            SkipReason::Unclassifiable => self.unclassifiable += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.shape_mismatch + self.unresolvable_reference + self.unclassifiable
    }

    pub fn merge(&mut self, other: &IngestReport) {
        self.candidates += other.candidates;
        self.added += other.added;
        self.already_known += other.already_known;
        self.shape_mismatch += other.shape_mismatch;
        self.unresolvable_reference += other.unresolvable_reference;
        self.unclassifiable += other.unclassifiable;
    }
}

/// A completed call seen by the interception hook.
#[derive(Debug, Clone, Default)]
pub struct InterceptedExchange {
    pub url: String,
    pub request_body: Option<String>,
    pub request_headers: HashMap<String, String>,
    pub response_body: String,
}

impl InterceptedExchange {
    /// GraphQL operation name from the URL query, else from the JSON body.
    pub fn operation_name(&self) -> String {
        let from_url = Url::parse(&self.url)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(&self.url)))
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "operationName")
                    .map(|(_, value)| value.into_owned())
            });

        from_url
            .or_else(|| {
                let body: Value = serde_json::from_str(self.request_body.as_deref()?).ok()?;
                body.get("operationName")?.as_str().map(str::to_string)
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Turns data payloads into attribution records.
///
/// Every path ends in the same step: resolve the listing, classify, then
/// `upsert_if_absent`. Malformed input only lowers coverage; nothing here
/// returns an error.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    classifier: VenueClassifier,
    intercept_pattern: String,
    response_max_depth: usize,
    page_state_max_depth: usize,
}

impl IngestionPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            classifier: VenueClassifier::new(config.classifier.primary_fee_amount),
            intercept_pattern: config.marketplace.intercept_pattern.clone(),
            response_max_depth: config.search.response_max_depth,
            page_state_max_depth: config.search.page_state_max_depth,
        }
    }

    /// Whether an intercepted call targets the marketplace API.
    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.intercept_pattern)
    }

    pub fn ingest_intercepted(
        &self,
        store: &mut AttributionStore,
        exchange: &InterceptedExchange,
    ) -> IngestReport {
        if !self.matches(&exchange.url) {
            return IngestReport::default();
        }

        let operation = exchange.operation_name();
        self.ingest_response_text(store, &exchange.response_body, &operation)
    }

    /// Raw response text. A body that is not JSON is logged and skipped.
    pub fn ingest_response_text(
        &self,
        store: &mut AttributionStore,
        text: &str,
        operation: &str,
    ) -> IngestReport {
        match serde_json::from_str::<Value>(text) {
            Ok(body) => self.ingest_response(store, &body, operation),
            Err(e) => {
                tracing::warn!("⚠️ Could not parse {} response: {}", operation, e);
                IngestReport::default()
            }
        }
    }

    /// A saved response on disk, handled like an intercepted one.
    pub fn ingest_response_file(&self, store: &mut AttributionStore, path: &Path) -> IngestReport {
        let source = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => self.ingest_response_text(store, &text, &source),
            Err(e) => {
                tracing::warn!("⚠️ Could not read {}: {}", source, e);
                IngestReport::default()
            }
        }
    }

    /// Edge-list responses. Sale data is always inline here.
    pub fn ingest_response(
        &self,
        store: &mut AttributionStore,
        body: &Value,
        operation: &str,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        let nodes = find_edge_list_items(body, self.response_max_depth);
        if nodes.is_empty() {
            return report;
        }
        tracing::debug!("🔍 Found {} NFT items in {}", nodes.len(), operation);

        for node in nodes {
            self.attribute_fragment(store, &mut report, node, None);
        }

        tracing::info!(
            "📥 {}: added {} new NFTs (total {})",
            operation,
            report.added,
            store.len()
        );
        report
    }

    /// Embedded page state: `props.pageProps.{gqlCache, dehydratedState.queries}`.
    pub fn ingest_page_state(&self, store: &mut AttributionStore, document: &Value) -> IngestReport {
        let mut report = IngestReport::default();

        let Some(page_props) = document.pointer("/props/pageProps") else {
            tracing::debug!("page state has no props.pageProps");
            report.skip(SkipReason::ShapeMismatch);
            return report;
        };

        let table = page_props.get(CACHE_FIELD).and_then(LookupTable::from_value);
        if let Some(table) = &table {
            tracing::debug!("Found {} with {} entries", CACHE_FIELD, table.len());
            self.ingest_referenced_listings(store, &mut report, table);
            self.ingest_cached_items(store, &mut report, table);
        }

        // 快取中只要有任何已歸屬的項目（新增或既有）就不做深度搜尋
        if report.added + report.already_known == 0 {
            self.ingest_unindexed(store, &mut report, page_props, table.as_ref());
        }

        tracing::info!(
            "📄 Page state: added {} NFTs (total {})",
            report.added,
            store.len()
        );
        report
    }

    /// Response of a single-item point query.
    pub fn ingest_point_query(&self, store: &mut AttributionStore, response: &Value) -> IngestReport {
        let mut report = IngestReport::default();

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            tracing::warn!("⚠️ Point query returned {} GraphQL errors", errors.len());
        }

        match response.pointer("/data/alphaNftItemByAddress") {
            Some(item @ Value::Object(_)) => self.attribute_fragment(store, &mut report, item, None),
            _ => {
                tracing::debug!("point query response has no item");
                report.skip(SkipReason::ShapeMismatch);
            }
        }
        report
    }

    /// Pass 1: listings stored under their own key, matched back to the items
    /// that reference them.
    fn ingest_referenced_listings(
        &self,
        store: &mut AttributionStore,
        report: &mut IngestReport,
        table: &LookupTable<'_>,
    ) {
        for (_key, value) in table.entries_with_type(&LISTING_TYPE_TAGS) {
            let Some(listing) = Listing::from_value(value) else {
                continue;
            };
            let Some(listing_id) = listing.listing_id.as_deref() else {
                continue;
            };
            if self.classifier.classify_listing(&listing).is_none() {
                continue;
            }

            for item in table.items_referencing(ITEM_TYPENAME, listing_id) {
                let resolution = Resolution::Found(listing.clone());
                self.attribute(store, report, &item, &resolution);
            }
        }
    }

    /// Pass 2: item entries not covered by pass 1 (inline sales, off-chain).
    fn ingest_cached_items(
        &self,
        store: &mut AttributionStore,
        report: &mut IngestReport,
        table: &LookupTable<'_>,
    ) {
        for (_key, value) in table.entries_with_type(&[ITEM_TYPENAME]) {
            match Item::from_value(value) {
                Some(item) if store.contains(&item.item_id) => {}
                Some(item) => {
                    let resolution = resolve(&item, Some(table));
                    self.attribute(store, report, &item, &resolution);
                }
                None => report.skip(SkipReason::ShapeMismatch),
            }
        }
    }

    /// Fallback when the cache gave nothing: deep search of the page props,
    /// then of each dehydrated query result.
    fn ingest_unindexed(
        &self,
        store: &mut AttributionStore,
        report: &mut IngestReport,
        page_props: &Value,
        table: Option<&LookupTable<'_>>,
    ) {
        tracing::debug!("Searching for NFT data in pageProps...");
        if let Some(candidate) = find_item_candidate(page_props, self.page_state_max_depth) {
            self.attribute_fragment(store, report, candidate, table);
        }
        if report.added + report.already_known > 0 {
            return;
        }

        let queries = page_props
            .pointer("/dehydratedState/queries")
            .and_then(Value::as_array);
        for query in queries.into_iter().flatten() {
            let Some(data) = query.pointer("/state/data") else {
                continue;
            };
            if let Some(candidate) = find_item_candidate(data, self.page_state_max_depth) {
                self.attribute_fragment(store, report, candidate, table);
            }
        }
    }

    fn attribute_fragment(
        &self,
        store: &mut AttributionStore,
        report: &mut IngestReport,
        fragment: &Value,
        table: Option<&LookupTable<'_>>,
    ) {
        match Item::from_value(fragment) {
            Some(item) => {
                let resolution = resolve(&item, table);
                self.attribute(store, report, &item, &resolution);
            }
            None => report.skip(SkipReason::ShapeMismatch),
        }
    }

    fn attribute(
        &self,
        store: &mut AttributionStore,
        report: &mut IngestReport,
        item: &Item,
        resolution: &Resolution,
    ) {
        report.candidates += 1;

        let Some(venue) = self.classifier.classify(item, resolution.listing()) else {
            let reason = match resolution {
                Resolution::Unresolved(key) => {
                    tracing::debug!("{}: listing {} not in lookup table", item.item_id, key);
                    SkipReason::UnresolvableReference
                }
                _ => {
                    tracing::debug!("{}: no venue signal", item.item_id);
                    SkipReason::Unclassifiable
                }
            };
            report.skip(reason);
            return;
        };

        if store.upsert_if_absent(AttributionRecord::new(item, venue)) {
            report.added += 1;
            tracing::debug!(
                "✅ {} ({}) -> {}",
                item.display_name.as_deref().unwrap_or("unnamed"),
                item.item_id,
                venue
            );
        } else {
            report.already_known += 1;
        }
    }
}
