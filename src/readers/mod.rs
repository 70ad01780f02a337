//! Upstream readers.
//!
//! Each reader turns one upstream JSON document into a normalized entity and
//! never fails: transport or parse errors are logged and produce an empty
//! entity so the measurement cycle continues with whatever data it has.

mod station;
mod thermostat;

pub use station::StationReader;
pub use thermostat::ThermostatReader;
