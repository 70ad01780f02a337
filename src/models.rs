//! Data models for the measurement pipeline.
//!
//! Weather readings, the normalized thermostat snapshot, resolved setpoints and
//! the final 12-column measurement record all live here so every stage shares
//! one vocabulary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

// ---

/// One station's weather fields, each possibly absent.
///
/// Numeric fields are SI units as reported upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    // ---
    pub text_description: Option<String>,
    pub temperature_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub barometric_pressure_pa: Option<f64>,
    pub sea_level_pressure_pa: Option<f64>,
    pub visibility_m: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    pub wind_chill_c: Option<f64>,
}

/// Reading extracted from a single station.
pub type PartialReading = WeatherReading;

/// Reading combined from every configured station.
pub type FusedReading = WeatherReading;

impl WeatherReading {
    // ---
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---

/// Error returned when a device enum string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown device value '{}'", self.0)
    }
}

impl std::error::Error for UnknownValue {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThermostatMode {
    Off,
    Heat,
    Cool,
    HeatCool,
}

impl ThermostatMode {
    // ---
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
            Self::HeatCool => "HEATCOOL",
        }
    }

    pub fn cools(&self) -> bool {
        matches!(self, Self::Cool | Self::HeatCool)
    }

    pub fn heats(&self) -> bool {
        matches!(self, Self::Heat | Self::HeatCool)
    }
}

impl FromStr for ThermostatMode {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Self::Off),
            "HEAT" => Ok(Self::Heat),
            "COOL" => Ok(Self::Cool),
            "HEATCOOL" => Ok(Self::HeatCool),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Eco mode. The device reports `OFF` or a named eco mode such as `MANUAL_ECO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EcoMode {
    On,
    Off,
}

impl EcoMode {
    // ---
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Any value other than `OFF` means eco setpoints are in effect.
    pub fn from_device(s: &str) -> Self {
        if s == "OFF" {
            Self::Off
        } else {
            Self::On
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HvacStatus {
    Off,
    Heating,
    Cooling,
}

impl HvacStatus {
    // ---
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Heating => "HEATING",
            Self::Cooling => "COOLING",
        }
    }
}

impl FromStr for HvacStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Self::Off),
            "HEATING" => Ok(Self::Heating),
            "COOLING" => Ok(Self::Cooling),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Heat/cool setpoint pair in Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetpointPair {
    pub heat_c: Option<f64>,
    pub cool_c: Option<f64>,
}

/// Normalized thermostat snapshot for one measurement cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatState {
    // ---
    pub mode: Option<ThermostatMode>,
    pub eco_mode: Option<EcoMode>,
    pub hvac_status: Option<HvacStatus>,
    pub connectivity_status: Option<String>,
    pub ambient_temperature_c: Option<f64>,
    pub ambient_humidity_pct: Option<f64>,
    pub normal_setpoints: SetpointPair,
    pub eco_setpoints: SetpointPair,
    pub custom_name: Option<String>,
    pub fan_timer_mode: Option<String>,
}

// ---

/// Effective setpoint for one direction (heating or cooling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    /// The thermostat mode does not use this setpoint; logged as `0`.
    Inactive,
    /// In use; the device may still have omitted the value.
    Active(Option<f64>),
}

/// Setpoints selected from mode and eco state, still in Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSetpoints {
    pub cooling: Setpoint,
    pub heating: Setpoint,
}

// ---

/// Column names written ahead of the first row in an empty store.
pub const HEADER: [&str; 12] = [
    "Time",
    "Inside Temperature",
    "Outside Temperature",
    "Cooling",
    "Inside Humidity",
    "Outside Humidity",
    "HVAC status",
    "Nest status",
    "HVAC Mode",
    "Nest Eco Mode",
    "Cooling Setpoint",
    "Heating Setpoint",
];

/// One logged row. Field order matches [`HEADER`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    // ---
    pub timestamp: DateTime<Utc>,
    pub inside_temperature_f: Option<f64>,
    pub outside_temperature_f: Option<f64>,
    pub cooling_indicator: u8,
    pub inside_humidity_pct: Option<f64>,
    pub outside_humidity_pct: Option<f64>,
    pub hvac_status: Option<HvacStatus>,
    pub connectivity_status: Option<String>,
    pub hvac_mode: Option<ThermostatMode>,
    pub eco_mode: Option<EcoMode>,
    pub cooling_setpoint_f: Option<f64>,
    pub heating_setpoint_f: Option<f64>,
}

impl MeasurementRecord {
    // ---
    /// Render the record as 12 text cells; absent values become empty cells.
    pub fn to_row(&self) -> [String; 12] {
        // ---
        fn num(v: Option<f64>) -> String {
            v.map(|v| v.to_string()).unwrap_or_default()
        }

        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            num(self.inside_temperature_f),
            num(self.outside_temperature_f),
            self.cooling_indicator.to_string(),
            num(self.inside_humidity_pct),
            num(self.outside_humidity_pct),
            self.hvac_status.map(|s| s.as_str()).unwrap_or_default().to_string(),
            self.connectivity_status.clone().unwrap_or_default(),
            self.hvac_mode.map(|m| m.as_str()).unwrap_or_default().to_string(),
            self.eco_mode.map(|m| m.as_str()).unwrap_or_default().to_string(),
            num(self.cooling_setpoint_f),
            num(self.heating_setpoint_f),
        ]
    }
}
