// src/routes/measure.rs
//! On-demand measurement endpoint.
//!
//! `POST /measure` runs one full cycle outside the schedule and returns the
//! record it logged. Calls are not serialized against the scheduler; callers
//! that trigger cycles by hand are responsible for spacing them out.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use tracing::{error, info};

use crate::cycle::MeasurementCycle;
use crate::fetch::{HttpFetch, TokenProvider};
use crate::sink::LogSink;

// ---

pub fn router<F, T, S>() -> Router<Arc<MeasurementCycle<F, T, S>>>
where
    F: HttpFetch + 'static,
    T: TokenProvider + 'static,
    S: LogSink + 'static,
{
    // ---
    Router::new().route("/measure", post(handler::<F, T, S>))
}

async fn handler<F, T, S>(State(cycle): State<Arc<MeasurementCycle<F, T, S>>>) -> impl IntoResponse
where
    F: HttpFetch,
    T: TokenProvider,
    S: LogSink,
{
    // ---
    info!("POST /measure - Running measurement cycle");

    match cycle.run().await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => {
            error!("Measurement cycle failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to log measurement"),
            )
                .into_response()
        }
    }
}
