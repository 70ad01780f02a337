//! Database schema management for the PostgreSQL log sink.
//!
//! Ensures the `thermostat_logs` table exists before the first row is
//! appended. Applied once on startup from `main.rs`, and only when
//! `DATABASE_URL` selects the PostgreSQL sink.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the measurement table and its index (idempotent).
///
/// Column order follows the 12-column log header. Safe to call on every
/// startup; no-op if the objects already exist.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS thermostat_logs (
            id                    BIGSERIAL PRIMARY KEY,
            logged_at             TIMESTAMPTZ      NOT NULL,
            inside_temperature_f  DOUBLE PRECISION,
            outside_temperature_f DOUBLE PRECISION,
            cooling               SMALLINT         NOT NULL,
            inside_humidity       DOUBLE PRECISION,
            outside_humidity      DOUBLE PRECISION,
            hvac_status           TEXT,
            nest_status           TEXT,
            hvac_mode             TEXT,
            nest_eco_mode         TEXT,
            cooling_setpoint_f    DOUBLE PRECISION,
            heating_setpoint_f    DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_thermostat_logs_logged_at
            ON thermostat_logs (logged_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
