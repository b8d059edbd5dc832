use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hitch_alert::api::rest::router;
use hitch_alert::notify::NotificationSink;
use hitch_alert::sensor::GeoOptions;
use hitch_alert::state::{AppState, EngineSettings};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, title: &str, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

fn setup() -> (axum::Router, Arc<AppState>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let settings = EngineSettings {
        threshold_km: 10.0,
        geo: GeoOptions::default(),
    };
    let state = Arc::new(AppState::with_profile_sensor(settings, 1024, sink.clone()));
    (router(state.clone()), state, sink)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn patch_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_profile(app: &axum::Router, name: &str, is_hitchhiker: bool, lat: f64, lon: f64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/profiles",
            json!({
                "display_name": name,
                "is_hitchhiker": is_hitchhiker,
                "location": { "lat": lat, "lon": lon }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

async fn settle() {
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _sink) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["profiles"], 0);
    assert_eq!(body["requests"], 0);
    assert_eq!(body["itineraries"], 0);
    assert_eq!(body["subscriptions"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _sink) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("open_requests"));
}

#[tokio::test]
async fn create_profile_returns_profile() {
    let (app, _state, _sink) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/profiles",
            json!({
                "display_name": "Alice",
                "is_hitchhiker": true,
                "location": { "lat": 52.52, "lon": 13.405 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["display_name"], "Alice");
    assert_eq!(body["is_hitchhiker"], true);
    assert_eq!(body["location"]["lat"], 52.52);
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_profile_empty_name_returns_400() {
    let (app, _state, _sink) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/profiles",
            json!({ "display_name": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_profile_out_of_range_coordinate_returns_400() {
    let (app, _state, _sink) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/profiles",
            json!({
                "display_name": "Bob",
                "location": { "lat": 95.0, "lon": 13.405 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_profile_location() {
    let (app, _state, _sink) = setup();
    let id = create_profile(&app, "Frank", false, 52.0, 13.0).await;

    let res = app
        .oneshot(patch_request(
            &format!("/profiles/{id}/location"),
            json!({ "location": { "lat": 48.85, "lon": 2.35 } }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 48.85);
    assert_eq!(body["location"]["lon"], 2.35);
}

#[tokio::test]
async fn toggle_hitchhiker_flag() {
    let (app, _state, _sink) = setup();
    let id = create_profile(&app, "Eve", false, 52.0, 13.0).await;

    let res = app
        .oneshot(patch_request(
            &format!("/profiles/{id}/hitchhiker"),
            json!({ "is_hitchhiker": true }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["is_hitchhiker"], true);
}

#[tokio::test]
async fn create_request_for_unknown_rider_returns_404() {
    let (app, _state, _sink) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": "00000000-0000-0000-0000-000000000000",
                "current_location": { "lat": 52.51, "lon": 13.39 },
                "destination": "Hamburg"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_request_out_of_range_coordinate_returns_400() {
    let (app, _state, _sink) = setup();
    let rider_id = create_profile(&app, "Mia", false, 52.51, 13.39).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": rider_id,
                "current_location": { "lat": 52.51, "lon": 200.0 },
                "destination": "Hamburg"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn withdraw_request_then_gone() {
    let (app, _state, _sink) = setup();
    let rider_id = create_profile(&app, "Mia", false, 52.51, 13.39).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": rider_id,
                "current_location": { "lat": 52.51, "lon": 13.39 },
                "destination": "Hamburg"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let request = body_json(res).await;
    let request_id = request["id"].as_str().unwrap().to_string();
    assert_eq!(request["rider_name"], "Mia");

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/requests/{request_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(delete_request(&format!("/requests/{request_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn itinerary_match_filters_by_arrival_airport() {
    let (app, _state, _sink) = setup();
    let user_id = create_profile(&app, "Pat", false, 40.64, -73.78).await;

    for (flight, airport) in [("DL1", "JFK"), ("BA2", "LHR"), ("AA3", "JFK")] {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/itineraries",
                json!({
                    "user_id": user_id,
                    "flight_number": flight,
                    "departure_city": "Berlin",
                    "arrival_airport": airport,
                    "arrival_time": "2026-09-01T12:00:00Z"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(get_request("/itineraries/match?field=arrival_airport&value=JFK"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let matched = body_json(res).await;
    let list = matched.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|record| record["arrival_airport"] == "JFK"));

    let res = app
        .oneshot(get_request("/itineraries/match?field=arrival_airport&value=ATL"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let matched = body_json(res).await;
    assert_eq!(matched.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn subscribe_unknown_watcher_returns_404() {
    let (app, _state, _sink) = setup();
    let response = app
        .oneshot(post_request(
            "/subscriptions/00000000-0000-0000-0000-000000000000",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_alert_flow() {
    let (app, _state, sink) = setup();

    // watcher in Berlin, opted in, position already reported
    let watcher_id = create_profile(&app, "Walt", true, 52.5200, 13.4050).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/subscriptions/{watcher_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["running"], true);
    settle().await;

    // rider about 2 km away
    let rider_id = create_profile(&app, "Mia", false, 52.5163, 13.3777).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": rider_id,
                "current_location": { "lat": 52.5163, "lon": 13.3777 },
                "destination": "Hamburg"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Hitchhike Request");
    assert_eq!(calls[0].1, "Mia needs a ride to Hamburg");

    // a rider in Paris is far outside the threshold
    let far_rider_id = create_profile(&app, "Paul", false, 48.8566, 2.3522).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": far_rider_id,
                "current_location": { "lat": 48.8566, "lon": 2.3522 },
                "destination": "Lyon"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    assert_eq!(sink.calls().len(), 1);

    // after unsubscribing, further store events emit nothing
    let res = app
        .clone()
        .oneshot(delete_request(&format!("/subscriptions/{watcher_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let late_rider_id = create_profile(&app, "Nora", false, 52.5205, 13.4060).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": late_rider_id,
                "current_location": { "lat": 52.5205, "lon": 13.4060 },
                "destination": "Dresden"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test]
async fn opted_out_watcher_gets_no_alerts() {
    let (app, _state, sink) = setup();

    let watcher_id = create_profile(&app, "Omar", false, 52.5200, 13.4050).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/subscriptions/{watcher_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    let rider_id = create_profile(&app, "Mia", false, 52.5163, 13.3777).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "rider_id": rider_id,
                "current_location": { "lat": 52.5163, "lon": 13.3777 },
                "destination": "Hamburg"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    assert!(sink.calls().is_empty());
}
