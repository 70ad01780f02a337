use anyhow::{Context, Result};
use sqlx::PgPool;

use super::LogSink;
use crate::MeasurementRecord;

// ---

/// Appends rows to the `thermostat_logs` table.
///
/// The table is created by [`crate::schema::create_schema`] at startup, which
/// plays the role of the header in a file-backed log.
#[derive(Debug, Clone)]
pub struct PgLogSink {
    pool: PgPool,
}

impl PgLogSink {
    // ---
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LogSink for PgLogSink {
    // ---
    async fn append(&self, record: &MeasurementRecord) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO thermostat_logs (
                logged_at, inside_temperature_f, outside_temperature_f, cooling,
                inside_humidity, outside_humidity, hvac_status, nest_status,
                hvac_mode, nest_eco_mode, cooling_setpoint_f, heating_setpoint_f
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.timestamp)
        .bind(record.inside_temperature_f)
        .bind(record.outside_temperature_f)
        .bind(i16::from(record.cooling_indicator))
        .bind(record.inside_humidity_pct)
        .bind(record.outside_humidity_pct)
        .bind(record.hvac_status.map(|s| s.as_str()))
        .bind(record.connectivity_status.as_deref())
        .bind(record.hvac_mode.map(|m| m.as_str()))
        .bind(record.eco_mode.map(|m| m.as_str()))
        .bind(record.cooling_setpoint_f)
        .bind(record.heating_setpoint_f)
        .execute(&self.pool)
        .await
        .context("failed to insert measurement row")?;

        Ok(())
    }
}
