//! Row storage for measurement records.
//!
//! A [`LogSink`] appends one [`MeasurementRecord`] per cycle and owns the
//! header (or schema) of its store. The binary picks a CSV file or a
//! PostgreSQL table from configuration; see [`ConfiguredSink`].

use std::future::Future;

use anyhow::Result;

use crate::MeasurementRecord;

mod csv;
mod postgres;

pub use self::csv::CsvLogSink;
pub use self::postgres::PgLogSink;

// ---

/// Append-only store of measurement rows.
pub trait LogSink: Send + Sync {
    fn append(&self, record: &MeasurementRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Sink selected from configuration.
pub enum ConfiguredSink {
    Csv(CsvLogSink),
    Postgres(PgLogSink),
}

impl LogSink for ConfiguredSink {
    async fn append(&self, record: &MeasurementRecord) -> Result<()> {
        match self {
            Self::Csv(sink) => sink.append(record).await,
            Self::Postgres(sink) => sink.append(record).await,
        }
    }
}
