//! # routes::signal
//!
//! `POST /signal` — the webhook that alerting tools (e.g. TradingView) call
//! with plain-text directives such as
//! `"Accepted Entry + priorRisePct=0.05 | stopPx=98000 | sym=BTCUSDT"`.
//!
//! | Result                       | Status | Body                                        |
//! |------------------------------|--------|---------------------------------------------|
//! | transition applied           | 200    | `{ok, outcome: "ACCEPTED", signal, event}`  |
//! | signal ignored in this phase | 200    | `{ok, outcome: "REJECTED", signal, phase}`  |
//! | no entry/exit keyword        | 400    | `{ok: false, error}`                        |

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    engine::{parse, SignalOutcome},
    error::AppError,
    state::SharedState,
};

pub async fn receive_signal(
    State(state): State<SharedState>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let signal  = parse(&body)?;
    let outcome = state.apply_signal(&signal).await;

    let response = match outcome {
        SignalOutcome::Accepted(event) => json!({
            "ok":      true,
            "outcome": "ACCEPTED",
            "signal":  signal,
            "event":   event,
        }),
        SignalOutcome::Rejected { phase, .. } => json!({
            "ok":      true,
            "outcome": "REJECTED",
            "signal":  signal,
            "phase":   phase,
        }),
    };

    Ok(Json(response))
}
