use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use sageplex_sagetv::{RecorderClient, SagexClient};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct FakeSagex {
    calls: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeSagex {
    fn calls(&self) -> Vec<HashMap<String, String>> {
        self.calls.lock().unwrap().clone()
    }
}

async fn sagex_api(
    State(fake): State<FakeSagex>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let now = fake.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    fake.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if let Some(auth) = headers.get("authorization") {
        fake.auth_headers
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }
    fake.calls.lock().unwrap().push(params.clone());
    tokio::time::sleep(Duration::from_millis(15)).await;
    fake.in_flight.fetch_sub(1, Ordering::SeqCst);

    let function = params.get("c").map(String::as_str).unwrap_or_default();
    let arg = params.get("1").map(String::as_str).unwrap_or_default();
    match (function, arg) {
        ("plex:GetMediaFileForName", "Known-1.mpg") => Json(json!({
            "MediaFile": {
                "MediaFileID": 42,
                "Airing": {
                    "AiringID": 3951965,
                    "AiringStartTime": 1_000_000,
                    "AiringDuration": 1_800_000,
                    "IsWatched": true,
                    "WatchedDuration": 1_799_000,
                    "LatestWatchedTime": 1_428_970_566_000i64,
                    "Show": { "ShowTitle": "Known" }
                }
            }
        })),
        ("plex:GetMediaFileForName", "Broken.mpg") => {
            Json(json!({ "MediaFile": { "MediaFileID": 1 } }))
        }
        ("plex:GetMediaFileForName", _) => Json(json!({ "MediaFile": false })),
        _ => Json(json!({ "Result": true })),
    }
}

async fn spawn_fake() -> (String, FakeSagex) {
    let fake = FakeSagex::default();
    let app = Router::new()
        .route("/sagex/api", get(sagex_api))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), fake)
}

#[tokio::test]
async fn finds_recording_by_filename() {
    let (url, fake) = spawn_fake().await;
    let client = SagexClient::new(url).with_credentials("sage", "frey");

    let rec = client.find_by_filename("Known-1.mpg").await.unwrap().unwrap();
    assert_eq!(rec.airing_id, "3951965");
    assert!(rec.state.watched);
    assert_eq!(rec.state.resume_ms, 1_799_000);
    assert_eq!(rec.state.title, "Known");

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["c"], "plex:GetMediaFileForName");
    assert_eq!(calls[0]["1"], "Known-1.mpg");
    assert_eq!(calls[0]["encoder"], "json");

    let auth = fake.auth_headers.lock().unwrap().clone();
    assert_eq!(auth.len(), 1);
    assert!(auth[0].starts_with("Basic "));
}

#[tokio::test]
async fn unknown_filename_is_not_an_error() {
    let (url, _fake) = spawn_fake().await;
    let client = SagexClient::new(url);
    assert!(client.find_by_filename("Nope.mpg").await.unwrap().is_none());
}

#[tokio::test]
async fn filename_with_spaces_is_escaped() {
    let (url, fake) = spawn_fake().await;
    let client = SagexClient::new(url);
    client.find_by_filename("Some Show - 1.mpg").await.unwrap();
    assert_eq!(fake.calls()[0]["1"], "Some Show - 1.mpg");
}

#[tokio::test]
async fn malformed_payload_is_reported() {
    let (url, _fake) = spawn_fake().await;
    let client = SagexClient::new(url);
    let err = client.find_by_filename("Broken.mpg").await.unwrap_err();
    assert_eq!(err.code(), "malformed_response");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn mutations_reference_the_airing() {
    let (url, fake) = spawn_fake().await;
    let client = SagexClient::new(url);

    client.clear_watched("77").await.unwrap();
    client.set_watched("77").await.unwrap();
    client
        .set_watched_window("77", 1_600_000, 1_428_970_000_000)
        .await
        .unwrap();

    let calls = fake.calls();
    assert_eq!(calls[0]["c"], "ClearWatched");
    assert_eq!(calls[0]["1"], "airing:77");
    assert_eq!(calls[1]["c"], "SetWatched");
    assert_eq!(calls[2]["c"], "SetWatchedTimes");
    assert_eq!(calls[2]["1"], "airing:77");
    assert_eq!(calls[2]["2"], "1600000");
    assert_eq!(calls[2]["3"], "1428970000000");
}

#[tokio::test]
async fn requests_are_serialized() {
    let (url, fake) = spawn_fake().await;
    let client = Arc::new(SagexClient::new(url));

    let lookups = (0..6).map(|i| {
        let client = client.clone();
        async move { client.find_by_filename(&format!("File-{i}.mpg")).await }
    });
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(|r| matches!(r, Ok(None))));
    assert_eq!(fake.calls().len(), 6);
    assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_recorder_is_a_transient_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SagexClient::new(format!("http://{addr}"));
    let err = client.find_by_filename("Known-1.mpg").await.unwrap_err();
    assert_eq!(err.code(), "transport_error");
    assert!(err.is_transient());
}
