//! HTTP surface of the server half: the batch sync endpoint, the health
//! probe, the dashboard read, and thin create endpoints for teams/tasks
//! (the real CRUD rules live in external services; these exist so
//! offline-created entities can obtain canonical ids).

use crate::core::dashboard::{DashboardTotals, live_session_ms};
use crate::db::pool::SharedDb;
use crate::db::{events, stats};
use crate::errors::AppResult;
use crate::models::{EventKind, TimeEvent};
use crate::server::auth::{SessionCheck, SessionValidator};
use crate::server::ingest::ingest_batch;
use crate::server::live::LiveHub;
use crate::server::side_effects::SideEffect;
use crate::utils::time::{now_local_naive, today_local, week_bounds};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tower_http::cors::CorsLayer;
use tracing::error;
use uuid::Uuid;

pub struct ServerState {
    pub db: SharedDb,
    pub sessions: Arc<dyn SessionValidator>,
    pub effects: UnboundedSender<SideEffect>,
    pub live: LiveHub,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sync/events", post(sync_events))
        .route("/api/dashboard", get(dashboard))
        .route("/api/teams", post(create_team))
        .route("/api/tasks", post(create_task))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reachability only: cheap and side-effect-free.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn authenticate(state: &ServerState, headers: &HeaderMap) -> Result<String, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.sessions.validate(token) {
        SessionCheck::Valid(user_id) => Ok(user_id),
        SessionCheck::Expired | SessionCheck::Invalid => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Batch ingestion. A malformed or empty payload is a no-op success; a
/// transaction failure is a 500 and the client retries the whole batch
/// later (safe, the upsert is idempotent).
async fn sync_events(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let user_id = authenticate(&state, &headers)?;

    let batch: Vec<TimeEvent> = match payload
        .get("events")
        .map(|v| serde_json::from_value(v.clone()))
    {
        Some(Ok(events)) => events,
        _ => {
            return Ok(Json(json!({ "status": "success", "accepted": 0 })));
        }
    };

    let report = {
        let mut conn = state.db.lock().expect("server db poisoned");
        ingest_batch(&mut conn, &user_id, batch).map_err(|err| {
            error!(%err, "batch ingestion failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
    };

    // Post-commit, fire-and-forget: recompute + live totals per touched
    // pair, then notifications. A full channel or dead worker only loses
    // cache freshness, never events.
    if let Some((from, to)) = report.date_range {
        for (pair_user, pair_team) in &report.touched_pairs {
            let _ = state.effects.send(SideEffect::RecomputeAndPublish {
                user_id: pair_user.clone(),
                team_id: pair_team.clone(),
                from,
                to,
            });
        }
    }
    if report.clock_ins > 0 {
        let _ = state.effects.send(SideEffect::Notify {
            user_id: user_id.clone(),
            message: "member clocked in".to_string(),
        });
    }

    Ok(Json(json!({
        "status": "success",
        "accepted": report.accepted,
        "nulled_refs": report.nulled_refs,
    })))
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    team: Option<String>,
}

/// Cached today/week totals plus the in-progress session delta. Display
/// only: nothing here is persisted.
async fn dashboard(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardTotals>, StatusCode> {
    let user_id = authenticate(&state, &headers)?;
    let team = query.team.as_deref();

    let totals = {
        let conn = state.db.lock().expect("server db poisoned");
        read_dashboard(&conn, &user_id, team).map_err(|err| {
            error!(%err, "dashboard read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
    };

    Ok(Json(totals))
}

fn read_dashboard(
    conn: &rusqlite::Connection,
    user_id: &str,
    team: Option<&str>,
) -> AppResult<DashboardTotals> {
    let today = today_local();
    let (week_from, week_to) = week_bounds(today);
    let today_ms = stats::day_total(conn, user_id, team, today)?;
    let week_ms = stats::range_total(conn, user_id, team, week_from, week_to)?;

    let live_ms = match events::latest_clock_event(conn, user_id)? {
        Some((EventKind::ClockIn, session_start)) => {
            let since = events::load_user_events_since(conn, user_id, session_start)?;
            live_session_ms(&events::project_local(&since), now_local_naive())
        }
        _ => 0,
    };

    Ok(DashboardTotals::compose(
        team.map(str::to_string),
        today_ms,
        week_ms,
        live_ms,
    ))
}

async fn create_team(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    authenticate(&state, &headers)?;

    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?;

    let id = Uuid::new_v4().to_string();
    {
        let conn = state.db.lock().expect("server db poisoned");
        conn.execute(
            "INSERT INTO teams (id, name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, name, Utc::now().to_rfc3339()],
        )
        .map_err(|err| {
            error!(%err, "team insert failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    }

    Ok((StatusCode::CREATED, Json(json!({ "id": id, "name": name }))))
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    authenticate(&state, &headers)?;

    let title = payload
        .get("title")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let team_id = payload.get("team_id").and_then(Value::as_str);

    let id = Uuid::new_v4().to_string();
    {
        let conn = state.db.lock().expect("server db poisoned");
        conn.execute(
            "INSERT INTO tasks (id, team_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, team_id, title, Utc::now().to_rfc3339()],
        )
        .map_err(|err| {
            error!(%err, "task insert failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "title": title, "team_id": team_id })),
    ))
}
