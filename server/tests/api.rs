use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sitesearch_core::config::{AppConfig, CrawlSettings, SearchSettings, SiteConfig};
use sitesearch_core::morphology::Morphology;
use sitesearch_core::persist::SledStore;
use sitesearch_core::store::{IndexStore, MemoryStore};
use sitesearch_crawler::StaticFetcher;
use sitesearch_server::{build_app, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ROOT: &str = "https://woods.test/";

fn woods() -> StaticFetcher {
    StaticFetcher::new()
        .with_page(
            ROOT,
            r#"<html><head><title>Woods</title></head><body><p>Welcome to the woods.</p>
               <a href="/fox">Hunters</a><a href="/river">Water</a></body></html>"#,
        )
        .with_page(
            "https://woods.test/fox",
            "<html><head><title>Foxes</title></head><body><p>The red fox hunts in the woods at night. Foxes sleep by day. A fox is clever.</p></body></html>",
        )
        .with_page(
            "https://woods.test/river",
            "<html><head><title>River</title></head><body><p>A fox drinks from the river in the woods.</p></body></html>",
        )
}

fn config() -> AppConfig {
    AppConfig {
        sites: vec![SiteConfig { url: ROOT.to_string(), name: "Woods".to_string() }],
        crawl: CrawlSettings { politeness_delay_ms: 0, ..CrawlSettings::default() },
        search: SearchSettings::default(),
    }
}

fn state_with(fetcher: StaticFetcher, store: Arc<dyn IndexStore>) -> AppState {
    AppState::new(&config(), store, Arc::new(fetcher), Morphology::standard())
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn indexed_state() -> AppState {
    let state = state_with(woods(), Arc::new(MemoryStore::new()));
    state.orchestrator.start_indexing().await.unwrap();
    state.orchestrator.wait_for_completion().await;
    state
}

#[tokio::test]
async fn statistics_on_empty_index() {
    let app = build_app(state_with(woods(), Arc::new(MemoryStore::new())));
    let (status, json) = call(app, "GET", "/api/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], true);
    assert_eq!(json["statistics"]["total"]["sites"], 0);
    assert_eq!(json["statistics"]["total"]["indexing"], false);
}

#[tokio::test]
async fn indexing_then_statistics() {
    let state = state_with(woods(), Arc::new(MemoryStore::new()));
    let (status, json) = call(build_app(state.clone()), "GET", "/api/startIndexing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "result": true }));
    state.orchestrator.wait_for_completion().await;

    let (_, json) = call(build_app(state.clone()), "GET", "/api/statistics").await;
    assert_eq!(json["statistics"]["total"]["pages"], 3);
    let site = &json["statistics"]["detailed"][0];
    assert_eq!(site["status"], "INDEXED");
    assert_eq!(site["name"], "Woods");
    assert!(site["statusTime"].is_i64());
    assert!(site.get("error").is_none());

    let (status, json) = call(build_app(state), "GET", "/api/stopIndexing").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["result"], false);
    assert!(json["error"].as_str().unwrap().contains("not running"));
}

#[tokio::test]
async fn second_start_is_rejected_while_running() {
    let state = state_with(woods().with_latency(Duration::from_millis(100)), Arc::new(MemoryStore::new()));
    let (status, _) = call(build_app(state.clone()), "GET", "/api/startIndexing").await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = call(build_app(state.clone()), "GET", "/api/startIndexing").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("already running"));

    let (status, _) = call(build_app(state.clone()), "GET", "/api/stopIndexing").await;
    assert_eq!(status, StatusCode::OK);
    state.orchestrator.wait_for_completion().await;
    let (_, json) = call(build_app(state), "GET", "/api/statistics").await;
    assert_eq!(json["statistics"]["detailed"][0]["status"], "FAILED");
    assert_eq!(json["statistics"]["detailed"][0]["error"], "stopped by user");
}

#[tokio::test]
async fn search_returns_ranked_snippets() {
    let state = indexed_state().await;
    let (status, json) = call(build_app(state), "GET", "/api/search?query=fox&site=https://woods.test/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], true);
    let data = json["data"].as_array().unwrap();
    assert_eq!(json["count"].as_u64().unwrap() as usize, data.len());
    assert_eq!(data[0]["uri"], "/fox");
    assert_eq!(data[0]["siteName"], "Woods");
    assert_eq!(data[0]["site"], ROOT);
    assert_eq!(data[0]["title"], "Foxes");
    assert_eq!(data[0]["relevance"], 1.0);
    assert!(data[0]["snippet"].as_str().unwrap().contains("<b>"));
    assert!(data.iter().any(|hit| hit["uri"] == "/river"));
}

#[tokio::test]
async fn search_paginates() {
    let state = indexed_state().await;
    let (_, all) = call(build_app(state.clone()), "GET", "/api/search?query=fox").await;
    let count = all["count"].as_u64().unwrap();
    let (_, page) = call(build_app(state.clone()), "GET", "/api/search?query=fox&offset=1&limit=1").await;
    assert_eq!(page["count"].as_u64().unwrap(), count);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0], all["data"][1]);
    let (_, past) = call(build_app(state), "GET", &format!("/api/search?query=fox&offset={count}")).await;
    assert!(past["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_rejects_bad_input() {
    let state = indexed_state().await;
    let (status, json) = call(build_app(state.clone()), "GET", "/api/search?query=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["result"], false);
    assert!(json["error"].is_string());

    let (status, _) = call(build_app(state.clone()), "GET", "/api/search?query=fox&site=https://nowhere.test").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // "woods" is on every page
    let (status, json) = call(build_app(state), "GET", "/api/search?query=woods").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn index_page_validates_and_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path().join("index")).unwrap());
    let state = state_with(woods(), store);

    let (status, json) = call(build_app(state.clone()), "POST", "/api/indexPage?url=not-a-url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["result"], false);

    let (status, _) = call(build_app(state.clone()), "POST", "/api/indexPage?url=https://elsewhere.test/x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = call(build_app(state.clone()), "POST", "/api/indexPage?url=https://woods.test/river").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], true);

    let (_, json) = call(build_app(state), "GET", "/api/statistics").await;
    assert_eq!(json["statistics"]["total"]["pages"], 1);
    assert_eq!(json["statistics"]["detailed"][0]["status"], "INDEXED");
    assert!(json["statistics"]["total"]["lemmas"].as_u64().unwrap() > 0);
}
