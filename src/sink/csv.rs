use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::LogSink;
use crate::{MeasurementRecord, HEADER};

// ---

/// Appends rows to a CSV file, writing the header when the file is empty.
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    path: PathBuf,
}

impl CsvLogSink {
    // ---
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogSink for CsvLogSink {
    // ---
    async fn append(&self, record: &MeasurementRecord) -> Result<()> {
        // ---
        let path = self.path.clone();
        let row = record.to_row();
        tokio::task::spawn_blocking(move || write_row(&path, &row))
            .await
            .context("CSV writer task failed")?
    }
}

fn write_row(path: &Path, row: &[String; 12]) -> Result<()> {
    // ---
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let empty = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len()
        == 0;

    let mut writer = csv::Writer::from_writer(file);
    if empty {
        writer.write_record(HEADER)?;
        info!("Wrote header to empty log {}", path.display());
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{EcoMode, HvacStatus, ThermostatMode};
    use chrono::{TimeZone, Utc};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("thermolog-{}.csv", uuid::Uuid::new_v4()))
    }

    fn record(hour: u32) -> MeasurementRecord {
        MeasurementRecord {
            timestamp: Utc.with_ymd_and_hms(2021, 6, 9, hour, 0, 0).unwrap(),
            inside_temperature_f: Some(70.5),
            outside_temperature_f: None,
            cooling_indicator: 0,
            inside_humidity_pct: Some(40.0),
            outside_humidity_pct: Some(55.0),
            hvac_status: Some(HvacStatus::Off),
            connectivity_status: Some("ONLINE".to_string()),
            hvac_mode: Some(ThermostatMode::Heat),
            eco_mode: Some(EcoMode::Off),
            cooling_setpoint_f: Some(0.0),
            heating_setpoint_f: Some(68.0),
        }
    }

    #[tokio::test]
    async fn test_header_written_once() {
        // ---
        let path = temp_path();
        let sink = CsvLogSink::new(&path);

        sink.append(&record(1)).await.unwrap();
        sink.append(&record(2)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert_eq!(
            lines[1],
            "2021-06-09T01:00:00Z,70.5,,0,40,55,OFF,ONLINE,HEAT,OFF,0,68"
        );
        assert!(lines[2].starts_with("2021-06-09T02:00:00Z,"));
    }

    #[tokio::test]
    async fn test_existing_log_gets_no_header() {
        // ---
        let path = temp_path();
        std::fs::write(&path, "Time,Inside Temperature\n").unwrap();

        CsvLogSink::new(&path).append(&record(3)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("2021-06-09T03:00:00Z,"));
    }
}
