use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::aggregator::Aggregator;
use crate::model::{Event, EventType};
use crate::notify::format::format_event_list;
use crate::window;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub refresh_deadline: Duration,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            refresh_deadline: Duration::from_secs(30),
        }
    }
}

/// Read-only views over the reconciled event set, plus a manual refresh.
/// Nothing here marks milestones.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/events", get(all_events))
        .route("/events/today", get(events_today))
        .route("/events/tomorrow", get(events_tomorrow))
        .route("/events/week", get(events_week))
        .route("/events/upcoming/{kind}", get(events_upcoming))
        .route("/refresh", post(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn all_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.aggregator.events())
}

/// `?format=text` renders a view as a MarkdownV2 list instead of JSON.
#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    #[serde(default)]
    format: Option<String>,
}

impl ViewQuery {
    fn wants_text(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("text"))
    }
}

fn render(events: Vec<Event>, header: &str, q: &ViewQuery) -> Response {
    if q.wants_text() {
        format_event_list(&events, header).into_response()
    } else {
        Json(events).into_response()
    }
}

async fn events_today(State(state): State<AppState>, Query(q): Query<ViewQuery>) -> Response {
    let events = window::today(&state.aggregator.events(), Utc::now());
    render(events, "📅 Today", &q)
}

async fn events_tomorrow(State(state): State<AppState>, Query(q): Query<ViewQuery>) -> Response {
    let events = window::tomorrow(&state.aggregator.events(), Utc::now());
    render(events, "📅 Tomorrow", &q)
}

async fn events_week(State(state): State<AppState>, Query(q): Query<ViewQuery>) -> Response {
    let events = window::week(&state.aggregator.events(), Utc::now());
    render(events, "📅 This week", &q)
}

async fn events_upcoming(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(q): Query<ViewQuery>,
) -> Result<Response, (StatusCode, String)> {
    let kind: EventType = kind
        .parse()
        .map_err(|e: anyhow::Error| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let events = window::upcoming(&state.aggregator.events(), kind, Utc::now());
    Ok(render(events, &format!("Upcoming: {kind}"), &q))
}

#[derive(serde::Serialize)]
struct RefreshResp {
    events: usize,
    cached: usize,
}

async fn refresh(State(state): State<AppState>) -> Json<RefreshResp> {
    let events = state.aggregator.refresh(state.refresh_deadline).await;
    Json(RefreshResp {
        events: events.len(),
        cached: state.aggregator.cached_len(),
    })
}
