// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use cruise_sentiment_analyzer::analyze::{AliasDictionary, EntityExtractor, Pipeline};
use cruise_sentiment_analyzer::api::{self, AppState};
use cruise_sentiment_analyzer::sentiment::SentimentScorer;
use cruise_sentiment_analyzer::store::MemoryStore;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_state() -> AppState {
    let dict = AliasDictionary::parse("Cozumel | czm\nCosta Maya | mahahual\nNassau\n");
    let extractor = EntityExtractor::new(vec!["Icon of the Seas".into()], vec![]).with_dictionary(dict);
    let pipeline = Pipeline::new(SentimentScorer::new(), extractor, 3);
    AppState::new(pipeline, Arc::new(MemoryStore::new()))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(app: &Router, uri: &str) -> Json {
    let req = Request::get(uri).body(Body::empty()).expect("build GET");
    let (status, bytes) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "GET {uri}");
    serde_json::from_slice(&bytes).expect("parse json")
}

async fn post_json(app: &Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Json::Null))
}

fn seed_objects() -> Json {
    json!([
        { "object_type": "comment", "object_id": "c1", "author": "a",
          "body": "Royal Caribbean in Cozumel: the buffet was terrible and dirty." },
        { "object_type": "comment", "object_id": "c2", "author": "b",
          "body": "Icon of the Seas stop at Cozumel was amazing, loved the snorkeling tour!" },
        { "object_type": "comment", "object_id": "c3", "author": "c",
          "body": "Carnival at Nassau, awful rude staff." },
        { "object_type": "comment", "object_id": "bot", "author": "AutoModerator",
          "body": "Cozumel Cozumel Cozumel" },
        { "object_type": "post", "object_id": "p1", "author": "d",
          "title": "Mahahual &amp; beach day", "body": "Great time on Royal Caribbean" }
    ])
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = api::router(test_state());
    let req = Request::get("/health").body(Body::empty()).expect("build GET /health");
    let (status, bytes) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).expect("utf8"), "ok");
}

#[tokio::test]
async fn api_annotate_returns_all_three_parts() {
    let app = api::router(test_state());
    let (status, v) = post_json(
        &app,
        "/annotate",
        json!({ "text": "Our Royal Caribbean trip to Cozumel was great but they charged us extra fees" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["extraction"]["cruise_line"], "Royal Caribbean");
    assert_eq!(v["extraction"]["port_ids"], json!(["cozumel"]));
    assert!(v["extraction"]["confidence"].as_f64().unwrap() > 0.0);
    assert!(v["sentiment"]["label"].is_string());
    let themes: Vec<&str> = v["themes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["label"].as_str().unwrap())
        .collect();
    assert!(themes.contains(&"pricing_fees_refunds"), "themes: {themes:?}");
}

#[tokio::test]
async fn api_annotate_rejects_bad_payload() {
    let app = api::router(test_state());
    let (status, _) = post_json(&app, "/annotate", json!({ "nope": 1 })).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn api_ingest_then_query_entities() {
    let app = api::router(test_state());

    let (status, stats) = post_json(&app, "/objects", seed_objects()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["comments"], 3);
    assert_eq!(stats["posts"], 1);
    assert_eq!(stats["skipped"], 1);

    let ports = get_json(&app, "/ports").await;
    assert_eq!(ports[0]["id"], "cozumel");
    assert_eq!(ports[0]["name"], "Cozumel");
    assert_eq!(ports[0]["mentions"], 2);
    assert_eq!(ports[0]["entity_type"], "port");

    let lines = get_json(&app, "/lines?limit=1").await;
    assert_eq!(lines.as_array().unwrap().len(), 1);
    assert_eq!(lines[0]["id"], "royal-caribbean");
    assert_eq!(lines[0]["mentions"], 2);

    let found = get_json(&app, "/search?q=costa").await;
    assert_eq!(found[0]["id"], "costa-maya");

    let summary = get_json(&app, "/ports/cozumel").await;
    assert_eq!(summary["port_id"], "cozumel");
    assert_eq!(summary["sentiment"]["mentions"], 2);
    assert_eq!(summary["sentiment"]["neg_count"], 1);
    assert_eq!(summary["sentiment"]["pos_count"], 1);

    let ship = get_json(&app, "/ships/icon-of-the-seas").await;
    assert_eq!(ship["ship_id"], "icon-of-the-seas");
    assert_eq!(ship["sentiment"]["mentions"], 1);

    let themes = get_json(&app, "/ports/cozumel/themes").await;
    let rows = themes.as_array().unwrap();
    assert!(!rows.is_empty());
    let avgs: Vec<f64> = rows.iter().map(|r| r["avg_sent"].as_f64().unwrap()).collect();
    assert!(avgs.windows(2).all(|w| w[0] <= w[1]), "not ascending: {avgs:?}");

    let strict = get_json(&app, "/lines/carnival/themes?min_n=2").await;
    assert!(strict.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_unknown_entity_has_zero_mentions_and_nulls() {
    let app = api::router(test_state());
    let v = get_json(&app, "/lines/holland-america").await;
    assert_eq!(v["line_id"], "holland-america");
    assert_eq!(v["sentiment"]["mentions"], 0);
    assert!(v["sentiment"]["avg_sentiment"].is_null());
    assert!(v["sentiment"]["neg_count"].is_null());
}

fn seed_dated_objects() -> Json {
    json!([
        { "object_type": "comment", "object_id": "c1", "author": "a", "subreddit": "royalcaribbean",
          "created_utc": 1_736_899_200_i64, "score": 3, "permalink": "/r/royalcaribbean/comments/c1",
          "body": "Royal Caribbean in Cozumel: the buffet was terrible and dirty." },
        { "object_type": "comment", "object_id": "c2", "author": "b", "subreddit": "cruise",
          "created_utc": 1_738_540_800_i64, "score": 40,
          "body": "Icon of the Seas stop at Cozumel was amazing, loved the snorkeling tour!" },
        { "object_type": "comment", "object_id": "c3", "author": "c", "subreddit": "royalcaribbean",
          "created_utc": 1_738_540_800_i64, "score": 10,
          "body": "Nassau was awful, rude staff at the pier." }
    ])
}

fn ids(v: &Json) -> Vec<&str> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|r| r["object_id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn api_feeds_rank_worst_and_top_comments() {
    let app = api::router(test_state());
    let (status, _) = post_json(&app, "/objects", seed_dated_objects()).await;
    assert_eq!(status, StatusCode::OK);

    let feed = get_json(&app, "/ports/cozumel/feed").await;
    assert_eq!(ids(&feed), vec!["c1", "c2"]);
    assert_eq!(feed[0]["sentiment_label"], "neg");
    assert_eq!(feed[0]["permalink"], "/r/royalcaribbean/comments/c1");
    assert_eq!(feed[0]["subreddit"], "royalcaribbean");

    let themed = get_json(&app, "/ports/cozumel/feed?theme=food_dining").await;
    assert_eq!(ids(&themed), vec!["c1"]);

    // below the preview floor, so clamped up to 50
    let short = get_json(&app, "/ports/cozumel/feed?preview_chars=1&limit=1").await;
    assert_eq!(short.as_array().unwrap().len(), 1);
    assert_eq!(short[0]["preview"].as_str().unwrap().chars().count(), 50);

    let top = get_json(&app, "/lines/royal-caribbean/top-comments").await;
    assert_eq!(ids(&top), vec!["c1"]);
    let worst = get_json(&app, "/ships/icon-of-the-seas/worst-comments").await;
    assert_eq!(ids(&worst), vec!["c2"]);
}

#[tokio::test]
async fn api_trend_buckets_by_month() {
    let app = api::router(test_state());
    post_json(&app, "/objects", seed_dated_objects()).await;

    let trend = get_json(&app, "/ports/cozumel/trend").await;
    let months: Vec<(&str, u64)> = trend
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["month"].as_str().unwrap(), p["n"].as_u64().unwrap()))
        .collect();
    assert_eq!(months, vec![("2025-01", 1), ("2025-02", 1)]);

    let empty = get_json(&app, "/lines/carnival/trend").await;
    assert!(empty.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_co_mentions_between_entities() {
    let app = api::router(test_state());
    post_json(&app, "/objects", seed_dated_objects()).await;

    // c3 names no line; its community implies one
    let lines = get_json(&app, "/ports/nassau/lines").await;
    assert_eq!(lines[0]["id"], "royal-caribbean");
    assert_eq!(lines[0]["name"], "Royal Caribbean");
    assert_eq!(lines[0]["mentions"], 1);

    let ships = get_json(&app, "/ports/cozumel/ships").await;
    assert_eq!(ships[0]["id"], "icon-of-the-seas");

    let ports = get_json(&app, "/lines/royal-caribbean/ports").await;
    assert_eq!(ports[0]["id"], "cozumel");
    assert_eq!(ports[0]["name"], "Cozumel");
    assert_eq!(ports[0]["entity_type"], "port");

    let ship_ports = get_json(&app, "/ships/icon-of-the-seas/ports?limit=1").await;
    assert_eq!(ship_ports.as_array().unwrap().len(), 1);
    assert_eq!(ship_ports[0]["id"], "cozumel");
}
