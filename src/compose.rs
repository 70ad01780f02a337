//! Measurement record composition.

use chrono::{DateTime, Utc};

use crate::{
    FusedReading, HvacStatus, MeasurementRecord, ResolvedSetpoints, Setpoint, ThermostatState,
};

// ---

/// Celsius to Fahrenheit; absent input stays absent.
pub fn c_to_f(celsius: Option<f64>) -> Option<f64> {
    celsius.map(|c| c * 1.8 + 32.0)
}

/// `73` while cooling, `72` while heating, `0` otherwise.
pub fn cooling_indicator(status: Option<HvacStatus>) -> u8 {
    match status {
        Some(HvacStatus::Cooling) => 73,
        Some(HvacStatus::Heating) => 72,
        _ => 0,
    }
}

fn setpoint_f(setpoint: Setpoint) -> Option<f64> {
    match setpoint {
        Setpoint::Inactive => Some(0.0),
        Setpoint::Active(celsius) => c_to_f(celsius),
    }
}

/// Compose a record stamped with the current wall-clock time.
pub fn compose(
    weather: &FusedReading,
    thermostat: &ThermostatState,
    setpoints: &ResolvedSetpoints,
) -> MeasurementRecord {
    compose_at(Utc::now(), weather, thermostat, setpoints)
}

/// Compose a record with an explicit timestamp.
pub fn compose_at(
    timestamp: DateTime<Utc>,
    weather: &FusedReading,
    thermostat: &ThermostatState,
    setpoints: &ResolvedSetpoints,
) -> MeasurementRecord {
    // ---
    MeasurementRecord {
        timestamp,
        inside_temperature_f: c_to_f(thermostat.ambient_temperature_c),
        outside_temperature_f: c_to_f(weather.temperature_c),
        cooling_indicator: cooling_indicator(thermostat.hvac_status),
        inside_humidity_pct: thermostat.ambient_humidity_pct,
        outside_humidity_pct: weather.relative_humidity_pct,
        hvac_status: thermostat.hvac_status,
        connectivity_status: thermostat.connectivity_status.clone(),
        hvac_mode: thermostat.mode,
        eco_mode: thermostat.eco_mode,
        cooling_setpoint_f: setpoint_f(setpoints.cooling),
        heating_setpoint_f: setpoint_f(setpoints.heating),
    }
}
