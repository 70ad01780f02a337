//! One measurement cycle: read, fuse, resolve, compose, append.
//!
//! All station reads and the thermostat read are issued together and joined;
//! aggregation only starts once every read has settled. Nothing is retried.
//! The scheduler in `main.rs` runs cycles back to back, never overlapping.

use std::time::Instant;

use anyhow::Result;
use futures_util::future::join_all;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::fetch::{HttpFetch, TokenProvider};
use crate::readers::{StationReader, ThermostatReader};
use crate::sink::LogSink;
use crate::{compose, setpoints, weather, MeasurementRecord};

// ---

pub struct MeasurementCycle<F, T, S> {
    // ---
    stations: Vec<String>,
    station_reader: StationReader<F>,
    thermostat_reader: ThermostatReader<F, T>,
    sink: S,
}

impl<F, T, S> MeasurementCycle<F, T, S>
where
    F: HttpFetch,
    T: TokenProvider,
    S: LogSink,
{
    // ---
    /// `stations` is ordered primary first.
    pub fn new(
        stations: Vec<String>,
        station_reader: StationReader<F>,
        thermostat_reader: ThermostatReader<F, T>,
        sink: S,
    ) -> Self {
        Self {
            stations,
            station_reader,
            thermostat_reader,
            sink,
        }
    }

    /// Produce one record and append it to the sink.
    ///
    /// Reader failures degrade the record; only a sink failure is returned.
    pub async fn run(&self) -> Result<MeasurementRecord> {
        // ---
        let span = info_span!("cycle", id = %Uuid::new_v4());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<MeasurementRecord> {
        // ---
        let started = Instant::now();

        let station_reads = join_all(
            self.stations
                .iter()
                .map(|station| self.station_reader.read(station)),
        );
        let (readings, thermostat) = tokio::join!(station_reads, self.thermostat_reader.read());

        let fused = weather::fuse(&readings);
        if fused.is_empty() {
            warn!("No station reported any weather; logging thermostat data only");
        } else {
            debug!("Fused weather: {:?}", fused);
        }

        let resolved = setpoints::resolve(&thermostat);
        let record = compose::compose(&fused, &thermostat, &resolved);

        self.sink.append(&record).await?;

        info!(
            "Logged measurement in {} ms (outside {:?}, inside {:?})",
            started.elapsed().as_millis(),
            record.outside_temperature_f,
            record.inside_temperature_f
        );
        Ok(record)
    }
}

#[cfg(test)]
impl<F, T, S> MeasurementCycle<F, T, S> {
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
