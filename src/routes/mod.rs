use std::sync::Arc;

use axum::Router;

use crate::cycle::MeasurementCycle;
use crate::fetch::{HttpFetch, TokenProvider};
use crate::sink::LogSink;

mod health;
mod measure;

// ---

pub fn router<F, T, S>(cycle: Arc<MeasurementCycle<F, T, S>>) -> Router
where
    F: HttpFetch + 'static,
    T: TokenProvider + 'static,
    S: LogSink + 'static,
{
    // ---
    measure::router::<F, T, S>()
        .merge(health::router::<Arc<MeasurementCycle<F, T, S>>>())
        .with_state(cycle)
}
