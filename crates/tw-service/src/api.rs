//! HTTP/SSE service boundary: the axum router, its handlers, and the
//! shared application state.
//!
//! A single `Arc<AppState>` behind every handler, a permissive CORS layer
//! for the browser client, routes registered as plain
//! `Router::new().route(...)` chains over the markers collection plus
//! three simulate variants.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::Stream;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use tw_mobility::Marker;
use tw_output::SqliteStore;
use tw_sim::{channel, LiveSnapshot, StreamEvent, StreamMessage};

use crate::dto::{
    CreateMarkerRequest, FinalMetricsDto, LiveSnapshotDto, MessageDto, SimulateRequest, SimulateResponse, StoredMarkerDto,
};
use crate::error::{ServiceError, ServiceResult};
use crate::insights;
use crate::orchestrator::Orchestrator;

/// Default simulated duration and extraction radius when a request omits
/// them.
const DEFAULT_DURATION_MINUTES: u64 = 60;
const DEFAULT_RADIUS_KM: f64 = 3.0;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<SqliteStore>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/markers", get(list_markers).post(create_marker).delete(delete_markers))
        .route("/simulate", post(simulate))
        .route("/simulate/stream", get(simulate_stream))
        .route("/simulate/live", get(simulate_live))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn list_markers(State(state): State<Arc<AppState>>) -> ServiceResult<Json<Vec<StoredMarkerDto>>> {
    let records = state.store.list_markers()?;
    let markers = records.iter().map(crate::markers::record_to_dto).collect::<ServiceResult<Vec<_>>>()?;
    Ok(Json(markers))
}

async fn create_marker(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMarkerRequest>,
) -> ServiceResult<(StatusCode, Json<StoredMarkerDto>)> {
    crate::markers::validate_coordinates(req.coordinates.into())?;
    let record = state.store.insert_marker(crate::markers::marker_payload(&req))?;
    let dto = StoredMarkerDto { id: record.id, kind: req.kind, coordinates: req.coordinates, created_at: record.created_at };
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn delete_markers(State(state): State<Arc<AppState>>) -> ServiceResult<Json<MessageDto>> {
    state.store.clear_markers()?;
    Ok(Json(MessageDto { message: "All markers cleared".to_string() }))
}

fn load_markers(state: &AppState) -> ServiceResult<Vec<Marker>> {
    state.store.list_markers()?.iter().map(crate::markers::record_to_marker).collect()
}

async fn simulate(State(state): State<Arc<AppState>>, Json(req): Json<SimulateRequest>) -> ServiceResult<Json<SimulateResponse>> {
    let _ = req; // duration/radius for POST /simulate come from query/body via SimulateRequest defaults below
    let markers = load_markers(&state)?;
    if markers.is_empty() {
        return Err(ServiceError::EmptyInput);
    }

    let duration = req.duration.unwrap_or(DEFAULT_DURATION_MINUTES) as u32;
    let radius = req.radius.unwrap_or(DEFAULT_RADIUS_KM);

    let orchestrator = state.orchestrator.clone();
    let metrics = tokio::task::spawn_blocking(move || orchestrator.run_sync(&markers, duration, radius))
        .await
        .map_err(|e| ServiceError::SimulationAborted { reason: e.to_string() })?;

    let response = build_response(&metrics);
    let payload = serde_json::to_value(&response)?;
    state.store.insert_result(payload)?;

    Ok(Json(response))
}

fn build_response(metrics: &crate::metrics::FinalMetrics) -> SimulateResponse {
    SimulateResponse {
        metrics: FinalMetricsDto::from(metrics),
        ai_summary: insights::ai_summary(metrics),
        risk_assessment: insights::risk_assessment(metrics),
        recommendations: insights::recommendations(metrics),
    }
}

/// Distinguishes the two streaming endpoints' wire framing: the legacy
/// `/simulate/stream` tags frames with a bare `message`/`done`
/// shape and carries no live telemetry, while `/simulate/live` tags every
/// frame with an explicit `type` and includes `live_data`.
#[derive(Copy, Clone)]
enum FrameStyle {
    Legacy,
    Live,
}

async fn simulate_stream(
    State(state): State<Arc<AppState>>,
    Query(req): Query<SimulateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    run_stream(state, req, FrameStyle::Legacy)
}

async fn simulate_live(
    State(state): State<Arc<AppState>>,
    Query(req): Query<SimulateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    run_stream(state, req, FrameStyle::Live)
}

fn run_stream(state: Arc<AppState>, req: SimulateRequest, style: FrameStyle) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let duration = req.duration.unwrap_or(DEFAULT_DURATION_MINUTES) as u32;
    let radius = req.radius.unwrap_or(DEFAULT_RADIUS_KM);
    let (hub, mut subscriber) = channel::<crate::metrics::FinalMetrics>();

    match load_markers(&state) {
        Ok(markers) if !markers.is_empty() => {
            let orchestrator = state.orchestrator.clone();
            tokio::task::spawn_blocking(move || orchestrator.run_streaming(markers, duration, radius, hub));
        }
        Ok(_) => hub.error("No markers placed for simulation"),
        Err(e) => hub.error(e.to_string()),
    }

    let store = state.store.clone();
    let stream = async_stream::stream! {
        while let Some(message) = subscriber.recv().await {
            match message {
                StreamMessage::Control(StreamEvent::Status(text)) => {
                    yield Ok(status_event(style, &text));
                }
                StreamMessage::Control(StreamEvent::Complete(metrics)) => {
                    let response = build_response(&metrics);
                    if let Ok(payload) = serde_json::to_value(&response) {
                        let _ = store.insert_result(payload);
                    }
                    yield Ok(complete_event(style, &response));
                    break;
                }
                StreamMessage::Control(StreamEvent::Error(text)) => {
                    yield Ok(error_event(style, &text));
                    break;
                }
                StreamMessage::Live(snapshot) => {
                    if matches!(style, FrameStyle::Live) {
                        yield Ok(live_event(&snapshot));
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn status_event(style: FrameStyle, message: &str) -> Event {
    let body = match style {
        FrameStyle::Legacy => json!({ "message": message }),
        FrameStyle::Live => json!({ "type": "status", "message": message }),
    };
    Event::default().data(body.to_string())
}

fn complete_event(style: FrameStyle, response: &SimulateResponse) -> Event {
    let body = match style {
        FrameStyle::Legacy => json!({ "done": true, "response": response }),
        FrameStyle::Live => json!({ "type": "complete", "response": response }),
    };
    Event::default().data(body.to_string())
}

fn error_event(style: FrameStyle, message: &str) -> Event {
    let body = match style {
        FrameStyle::Legacy => json!({ "done": true, "error": message }),
        FrameStyle::Live => json!({ "type": "error", "message": message }),
    };
    Event::default().data(body.to_string())
}

fn live_event(snapshot: &LiveSnapshot) -> Event {
    let dto = LiveSnapshotDto::from(snapshot);
    Event::default().data(json!({ "type": "live_data", "data": dto }).to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use tw_core::SimConfig;

    use super::*;
    use crate::providers::FallbackOnlyProvider;

    fn test_app() -> Router {
        let mut config = SimConfig::default();
        // Keep test runs short; the fallback provider's synthetic grid and
        // deterministic demand are still exercised, just over less wall-clock.
        config.duration_minutes = 2;
        let provider = Arc::new(FallbackOnlyProvider);
        let orchestrator = Arc::new(Orchestrator::new(config, provider.clone(), provider.clone(), provider));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        build_router(Arc::new(AppState { orchestrator, store }))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn markers_round_trip_through_create_list_and_clear() {
        let app = test_app();

        let create = Request::post("/markers")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"type":"construction","coordinates":{"lng":139.69,"lat":35.68}}"#))
            .unwrap();
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let list = Request::get("/markers").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let markers = body_json(response).await;
        assert_eq!(markers.as_array().unwrap().len(), 1);

        let clear = Request::delete("/markers").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(clear).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let list = Request::get("/markers").body(Body::empty()).unwrap();
        let response = app.oneshot(list).await.unwrap();
        let markers = body_json(response).await;
        assert!(markers.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn simulate_without_markers_returns_400_with_message() {
        let app = test_app();
        let request = Request::post("/simulate")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No markers placed for simulation");
    }

    #[tokio::test]
    async fn simulate_with_a_marker_returns_metrics() {
        let app = test_app();

        let create = Request::post("/markers")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"type":"construction","coordinates":{"lng":139.69,"lat":35.68}}"#))
            .unwrap();
        app.clone().oneshot(create).await.unwrap();

        let simulate = Request::post("/simulate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"duration":2,"radius":1}"#))
            .unwrap();
        let response = app.oneshot(simulate).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["metrics"]["driving_distance_km"].as_str().unwrap().ends_with(" km"));
        assert!(body["ai_summary"].as_str().is_some());
    }
}
