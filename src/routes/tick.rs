//! # routes::tick
//!
//! `POST /tick` — push a tick over HTTP (`{"price": 67000.5, "time": "09:15:00"}`).
//! Used with `TICK_SOURCE=http`, and handy for manual testing with any source.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{error::AppError, models::Tick, state::SharedState};

pub async fn push_tick(
    State(state): State<SharedState>,
    Json(tick): Json<Tick>,
) -> Result<impl IntoResponse, AppError> {
    if !tick.price.is_finite() {
        return Err(AppError::BadRequest(format!("price must be finite, got {}", tick.price)));
    }

    let (events, snap) = state.ingest_tick(tick).await;

    Ok(Json(json!({
        "ok":     true,
        "events": events,
        "state":  snap,
    })))
}
