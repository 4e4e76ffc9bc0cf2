use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use venue_marker::domain::ports::{GraphqlRequest, GraphqlTransport};
use venue_marker::{
    AttributionEngine, ConsumerView, ContextBus, ContextId, EngineConfig, FilePageState,
    HttpTransport, InterceptedExchange, MarkerError, Message, PageRoute, Snapshot,
    StaticPageState, Venue,
};

const QUIET: Duration = Duration::from_millis(200);
const PATIENCE: Duration = Duration::from_secs(5);

/// Answers point queries with a Fragment-listed item and collection
/// searches with a two-node edge list. Records every operation it served.
#[derive(Clone, Default)]
struct ScriptedTransport {
    served: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl ScriptedTransport {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn served(&self) -> Vec<String> {
        self.served.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    async fn execute(&self, request: &GraphqlRequest) -> venue_marker::Result<Value> {
        self.served
            .lock()
            .unwrap()
            .push(request.operation_name.clone());

        if self.fail {
            return Err(MarkerError::GraphqlError {
                message: "upstream unavailable".to_string(),
            });
        }

        match request.operation_name.as_str() {
            "alphaNftItemByAddress" => {
                let address = request.variables["address"].as_str().unwrap_or_default();
                Ok(json!({"data": {"alphaNftItemByAddress": {
                    "__typename": "NftItem", "address": address, "name": "Looked up",
                    "kind": "DnsItem", "sale": {"__typename": "TelemintAuction"}
                }}}))
            }
            _ => Ok(search_response()),
        }
    }
}

fn search_response() -> Value {
    json!({"data": {"alphaNftItemSearch": {"edges": [
        {"node": {
            "__typename": "NftItem", "address": "X1", "name": "First", "kind": "CollectionItem",
            "sale": {"__typename": "NftSaleAuction", "marketplace": "GETGEMS"}
        }},
        {"node": {
            "__typename": "NftItem", "address": "X2", "name": "Second", "kind": "CollectionItem",
            "sale": {"__typename": "NftSaleFixPrice", "networkFee": "0"}
        }}
    ]}}})
}

fn search_exchange() -> InterceptedExchange {
    InterceptedExchange {
        url: "https://getgems.io/graphql/?operationName=nftSearch".to_string(),
        request_body: None,
        request_headers: HashMap::from([(
            "authorization".to_string(),
            "Bearer page-token".to_string(),
        )]),
        response_body: search_response().to_string(),
    }
}

async fn next_snapshot(view: &mut ConsumerView, wait: Duration) -> Option<Snapshot> {
    tokio::time::timeout(wait, view.next_update())
        .await
        .ok()
        .flatten()
        .cloned()
}

#[tokio::test]
async fn test_intercepted_edge_list_publishes_once() -> anyhow::Result<()> {
    let config = EngineConfig::default();
    let bus = ContextBus::from_config(&config);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &config,
        ScriptedTransport::default(),
        StaticPageState::empty(),
        &bus,
        PageRoute::Other,
    );
    let handle = tokio::spawn(engine.run());

    tokio_test::assert_ok!(interceptor.report(search_exchange()));

    let snapshot = next_snapshot(&mut consumer, PATIENCE)
        .await
        .expect("one DATA_UPDATED after the interception");
    println!("✅ Received snapshot with {} NFTs", snapshot.len());
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("X1").unwrap().venue, Venue::Getgems);
    assert_eq!(snapshot.get("X2").unwrap().venue, Venue::Fragment);
    assert!(next_snapshot(&mut consumer, QUIET).await.is_none());

    // 同一份回應再送一次，不應再廣播
    interceptor.report(search_exchange())?;
    assert!(next_snapshot(&mut consumer, QUIET).await.is_none());

    // 非市集網址直接略過
    interceptor.report(InterceptedExchange {
        url: "https://cdn.example.com/graphql".to_string(),
        response_body: json!({"edges": [{"node": {
            "address": "X9", "sale": {"__typename": "TelemintAuction"}
        }}]})
        .to_string(),
        ..Default::default()
    })?;
    assert!(next_snapshot(&mut consumer, QUIET).await.is_none());

    drop(interceptor);
    let store = handle.await??;
    assert_eq!(store.snapshot(), snapshot);
    assert_eq!(consumer.badge_for("X2").unwrap().label, "Listed on Fragment");

    Ok(())
}

#[tokio::test]
async fn test_request_data_uses_captured_headers() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let lookup_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/graphql/")
                .header("authorization", "Bearer page-token")
                .json_body_partial(
                    json!({
                        "operationName": "alphaNftItemByAddress",
                        "variables": {"address": "EQmissing"}
                    })
                    .to_string(),
                );
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"data": {"alphaNftItemByAddress": {
                    "__typename": "NftItem", "address": "EQmissing", "name": "Missing",
                    "kind": "CollectionItem",
                    "sale": {"__typename": "NftSaleFixPrice", "networkFee": "300000000"}
                }}}));
        })
        .await;

    let mut config = EngineConfig::default();
    config.marketplace.graphql_endpoint = server.url("/graphql/");

    let bus = ContextBus::new(16);
    let mut extension = bus.endpoint(ContextId::Extension);
    let (engine, interceptor) = AttributionEngine::new(
        &config,
        HttpTransport::from_config(&config),
        StaticPageState::empty(),
        &bus,
        PageRoute::Other,
    );
    let handle = tokio::spawn(engine.run());

    // 先讓引擎看到一次攔截，取得請求標頭
    interceptor.report(search_exchange())?;
    let first = tokio::time::timeout(PATIENCE, extension.recv()).await?;
    assert!(matches!(first, Some(Message::DataUpdated { in_reply_to: None, .. })));

    extension.send(Message::RequestData {
        request_id: 7,
        identifiers: vec!["X1".to_string(), "EQmissing".to_string()],
    })?;

    match tokio::time::timeout(PATIENCE, extension.recv()).await? {
        Some(Message::DataUpdated {
            snapshot,
            in_reply_to,
        }) => {
            println!("📨 Reply to request {:?}: {} NFTs", in_reply_to, snapshot.len());
            assert_eq!(in_reply_to, Some(7));
            assert_eq!(snapshot.len(), 3);
            assert_eq!(snapshot.get("EQmissing").unwrap().venue, Venue::Getgems);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    // X1 已知，只查 EQmissing 一次
    lookup_mock.assert_async().await;

    drop(interceptor);
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_collection_route_runs_one_search() -> anyhow::Result<()> {
    let transport = ScriptedTransport::default();
    let bus = ContextBus::new(16);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &EngineConfig::default(),
        transport.clone(),
        StaticPageState::empty(),
        &bus,
        PageRoute::from_path("/collection/EQcollection"),
    );
    let handle = tokio::spawn(engine.run());

    let request_id = consumer.request_missing(["A", "B", "A"])?;
    assert_eq!(request_id, Some(1));

    let snapshot = next_snapshot(&mut consumer, PATIENCE)
        .await
        .expect("snapshot from the collection search");
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains("X1"));
    assert_eq!(transport.served(), vec!["nftSearch".to_string()]);

    // 沒有缺漏就不送請求
    assert_eq!(consumer.request_missing(["X1", "X2"])?, None);

    drop(interceptor);
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_nft_route_adds_page_item() -> anyhow::Result<()> {
    let transport = ScriptedTransport::default();
    let bus = ContextBus::new(16);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &EngineConfig::default(),
        transport.clone(),
        StaticPageState::empty(),
        &bus,
        PageRoute::from_path("/nft/EQpage"),
    );
    let handle = tokio::spawn(engine.run());

    consumer.request_missing(["EQother"])?;

    let mut latest = Snapshot::default();
    while latest.len() < 2 {
        latest = next_snapshot(&mut consumer, PATIENCE)
            .await
            .expect("a snapshot per completed lookup");
    }

    assert_eq!(latest.get("EQpage").unwrap().venue, Venue::Fragment);
    assert_eq!(latest.get("EQother").unwrap().kind_tag, "DnsItem");
    assert_eq!(transport.served().len(), 2);

    drop(interceptor);
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_extract_page_data_from_saved_page() -> anyhow::Result<()> {
    let document = json!({"props": {"pageProps": {"gqlCache": {
        "NftSaleAuction:EQsale": {"__typename": "NftSaleAuction", "address": "EQsale"},
        "NftItem:EQcached": {
            "__typename": "NftItem", "address": "EQcached", "name": "Cached",
            "sale": {"__ref": "NftSaleAuction:EQsale"}
        }
    }}}});
    let mut page = NamedTempFile::new()?;
    write!(
        page,
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
        document
    )?;

    let bus = ContextBus::new(16);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &EngineConfig::default(),
        ScriptedTransport::default(),
        FilePageState::new(page.path()),
        &bus,
        PageRoute::from_path("/collection/EQc/EQcached"),
    );
    let handle = tokio::spawn(engine.run());

    consumer.request_page_extraction()?;
    let snapshot = next_snapshot(&mut consumer, PATIENCE)
        .await
        .expect("snapshot from the embedded page state");
    assert_eq!(snapshot.get("EQcached").unwrap().venue, Venue::Getgems);

    // 沒有新資料時仍重送目前狀態
    consumer.request_page_extraction()?;
    let again = next_snapshot(&mut consumer, PATIENCE)
        .await
        .expect("snapshot is re-sent on every extraction");
    assert_eq!(again, snapshot);

    drop(interceptor);
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_failed_lookup_keeps_engine_running() -> anyhow::Result<()> {
    let transport = ScriptedTransport::failing();
    let bus = ContextBus::new(16);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &EngineConfig::default(),
        transport.clone(),
        StaticPageState::empty(),
        &bus,
        PageRoute::Other,
    );
    let handle = tokio::spawn(engine.run());

    consumer.request_missing(["EQgone"])?;
    assert!(next_snapshot(&mut consumer, QUIET).await.is_none());

    // 失敗後仍能處理攔截
    interceptor.report(search_exchange())?;
    let snapshot = next_snapshot(&mut consumer, PATIENCE)
        .await
        .expect("interceptions still processed after a failed lookup");
    assert_eq!(snapshot.len(), 2);
    assert_eq!(transport.served(), vec!["alphaNftItemByAddress".to_string()]);

    drop(interceptor);
    let store = handle.await??;
    assert!(!store.contains("EQgone"));
    Ok(())
}

#[tokio::test]
async fn test_collection_item_route_adds_page_item() -> anyhow::Result<()> {
    let transport = ScriptedTransport::default();
    let bus = ContextBus::new(16);
    let mut consumer = ConsumerView::new(&bus);
    let (engine, interceptor) = AttributionEngine::new(
        &EngineConfig::default(),
        transport.clone(),
        StaticPageState::empty(),
        &bus,
        PageRoute::from_path("/collection/EQcollection/EQitem"),
    );
    let handle = tokio::spawn(engine.run());

    consumer.request_missing(["EQother"])?;

    let mut latest = Snapshot::default();
    while latest.len() < 2 {
        latest = next_snapshot(&mut consumer, PATIENCE)
            .await
            .expect("a snapshot per completed lookup");
    }
    assert!(latest.contains("EQitem"));
    assert!(latest.contains("EQother"));
    assert_eq!(transport.served().len(), 2);

    // 頁面本身的項目已歸屬，不再重複查詢
    assert_eq!(consumer.request_missing(["EQitem", "EQother"])?, None);

    drop(interceptor);
    handle.await??;
    Ok(())
}
