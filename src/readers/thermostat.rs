use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::fetch::{HttpFetch, TokenProvider};
use crate::{EcoMode, SetpointPair, ThermostatState};

// ---

const INFO: &str = "sdm.devices.traits.Info";
const HUMIDITY: &str = "sdm.devices.traits.Humidity";
const CONNECTIVITY: &str = "sdm.devices.traits.Connectivity";
const FAN: &str = "sdm.devices.traits.Fan";
const MODE: &str = "sdm.devices.traits.ThermostatMode";
const ECO: &str = "sdm.devices.traits.ThermostatEco";
const HVAC: &str = "sdm.devices.traits.ThermostatHvac";
const SETPOINT: &str = "sdm.devices.traits.ThermostatTemperatureSetpoint";
const TEMPERATURE: &str = "sdm.devices.traits.Temperature";

/// Trait bundle of a single device, keyed by trait name.
struct Traits<'a>(&'a serde_json::Map<String, Value>);

impl Traits<'_> {
    // ---
    /// One field of one trait. A missing, null or mistyped field reads as
    /// absent without affecting its siblings.
    fn field<V: DeserializeOwned>(&self, trait_name: &str, key: &str) -> Option<V> {
        // ---
        let raw = self.0.get(trait_name)?.get(key)?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{}.{} malformed: {}", trait_name, key, e);
                None
            }
        }
    }
}

fn parse_known<T: FromStr>(trait_name: &str, raw: Option<String>) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    // ---
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{}: {}", trait_name, e);
            None
        }
    }
}

fn normalize(traits: &Traits<'_>) -> ThermostatState {
    // ---
    ThermostatState {
        mode: parse_known(MODE, traits.field(MODE, "mode")),
        eco_mode: traits
            .field::<String>(ECO, "mode")
            .as_deref()
            .map(EcoMode::from_device),
        hvac_status: parse_known(HVAC, traits.field(HVAC, "status")),
        connectivity_status: traits.field(CONNECTIVITY, "status"),
        ambient_temperature_c: traits.field(TEMPERATURE, "ambientTemperatureCelsius"),
        ambient_humidity_pct: traits.field(HUMIDITY, "ambientHumidityPercent"),
        normal_setpoints: SetpointPair {
            heat_c: traits.field(SETPOINT, "heatCelsius"),
            cool_c: traits.field(SETPOINT, "coolCelsius"),
        },
        eco_setpoints: SetpointPair {
            heat_c: traits.field(ECO, "heatCelsius"),
            cool_c: traits.field(ECO, "coolCelsius"),
        },
        custom_name: traits.field(INFO, "customName"),
        fan_timer_mode: traits.field(FAN, "timerMode"),
    }
}

// ---

/// Reads the configured thermostat from the device-access API.
pub struct ThermostatReader<F, T> {
    fetch: Arc<F>,
    token: Arc<T>,
    devices_url: String,
}

impl<F: HttpFetch, T: TokenProvider> ThermostatReader<F, T> {
    // ---
    pub fn new(fetch: Arc<F>, token: Arc<T>, api_url: &str, project_id: &str) -> Self {
        Self {
            fetch,
            token,
            devices_url: format!(
                "{}/enterprises/{}/devices",
                api_url.trim_end_matches('/'),
                project_id
            ),
        }
    }

    /// Current thermostat state; empty when the device cannot be read.
    pub async fn read(&self) -> ThermostatState {
        // ---
        match self.try_read().await {
            Ok(state) => {
                debug!("Thermostat state: {:?}", state);
                state
            }
            Err(e) => {
                warn!("Thermostat unavailable: {:#}", e);
                ThermostatState::default()
            }
        }
    }

    async fn try_read(&self) -> Result<ThermostatState> {
        // ---
        let token = self
            .token
            .access_token()
            .await
            .context("no access token")?;
        let body = self.fetch.get_json(&self.devices_url, Some(&token)).await?;

        // Only one device is configured, so take the first.
        let traits = body
            .get("devices")
            .and_then(Value::as_array)
            .and_then(|devices| devices.first())
            .and_then(|device| device.get("traits"))
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("device list has no device traits"))?;

        let state = normalize(&Traits(traits));
        if let Some(name) = &state.custom_name {
            debug!("Read thermostat '{}'", name);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::fetch::testing::{FailingToken, StubFetch};
    use crate::fetch::StaticToken;
    use crate::{HvacStatus, ThermostatMode};
    use serde_json::json;

    const URL: &str = "https://sdm.test/v1/enterprises/proj-1/devices";

    fn devices() -> Value {
        json!({
            "devices": [{
                "name": "enterprises/proj-1/devices/abc",
                "type": "sdm.devices.types.THERMOSTAT",
                "traits": {
                    "sdm.devices.traits.Info": { "customName": "Hallway" },
                    "sdm.devices.traits.Humidity": { "ambientHumidityPercent": 44 },
                    "sdm.devices.traits.Connectivity": { "status": "ONLINE" },
                    "sdm.devices.traits.Fan": { "timerMode": "OFF" },
                    "sdm.devices.traits.ThermostatMode": {
                        "mode": "HEATCOOL",
                        "availableModes": ["HEAT", "COOL", "HEATCOOL", "OFF"]
                    },
                    "sdm.devices.traits.ThermostatEco": {
                        "availableModes": ["OFF", "MANUAL_ECO"],
                        "mode": "MANUAL_ECO",
                        "heatCelsius": 12.5,
                        "coolCelsius": 27.0
                    },
                    "sdm.devices.traits.ThermostatHvac": { "status": "HEATING" },
                    "sdm.devices.traits.ThermostatTemperatureSetpoint": {
                        "heatCelsius": 20.0,
                        "coolCelsius": 24.0
                    },
                    "sdm.devices.traits.Temperature": { "ambientTemperatureCelsius": 21.3 }
                }
            }]
        })
    }

    fn reader<T: TokenProvider>(fetch: StubFetch, token: T) -> ThermostatReader<StubFetch, T> {
        ThermostatReader::new(
            Arc::new(fetch),
            Arc::new(token),
            "https://sdm.test/v1/",
            "proj-1",
        )
    }

    #[tokio::test]
    async fn test_normalizes_trait_bundle() {
        // ---
        let fetch = StubFetch::default().with(URL, devices());
        let state = reader(fetch, StaticToken("tok".to_string())).read().await;

        assert_eq!(state.mode, Some(ThermostatMode::HeatCool));
        assert_eq!(state.eco_mode, Some(EcoMode::On));
        assert_eq!(state.hvac_status, Some(HvacStatus::Heating));
        assert_eq!(state.connectivity_status.as_deref(), Some("ONLINE"));
        assert_eq!(state.ambient_temperature_c, Some(21.3));
        assert_eq!(state.ambient_humidity_pct, Some(44.0));
        assert_eq!(state.normal_setpoints.heat_c, Some(20.0));
        assert_eq!(state.normal_setpoints.cool_c, Some(24.0));
        assert_eq!(state.eco_setpoints.heat_c, Some(12.5));
        assert_eq!(state.eco_setpoints.cool_c, Some(27.0));
        assert_eq!(state.custom_name.as_deref(), Some("Hallway"));
        assert_eq!(state.fan_timer_mode.as_deref(), Some("OFF"));
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        // ---
        let fetch = Arc::new(StubFetch::default().with(URL, devices()));
        let reader = ThermostatReader::new(
            fetch.clone(),
            Arc::new(StaticToken("tok".to_string())),
            "https://sdm.test/v1",
            "proj-1",
        );
        reader.read().await;
        assert_eq!(
            *fetch.seen_bearers.lock().unwrap(),
            vec![Some("tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_traits_are_absent() {
        // ---
        let body = json!({
            "devices": [{
                "traits": {
                    "sdm.devices.traits.ThermostatMode": { "mode": "COOL" },
                    "sdm.devices.traits.ThermostatHvac": { "status": "FAN_ONLY" }
                }
            }]
        });
        let fetch = StubFetch::default().with(URL, body);
        let state = reader(fetch, StaticToken("tok".to_string())).read().await;

        assert_eq!(state.mode, Some(ThermostatMode::Cool));
        assert_eq!(state.hvac_status, None);
        assert_eq!(state.eco_mode, None);
        assert_eq!(state.connectivity_status, None);
        assert_eq!(state.normal_setpoints, SetpointPair::default());
    }

    #[tokio::test]
    async fn test_mistyped_field_keeps_siblings() {
        // ---
        let body = json!({
            "devices": [{
                "traits": {
                    "sdm.devices.traits.ThermostatMode": { "mode": "HEAT" },
                    "sdm.devices.traits.ThermostatEco": {
                        "mode": 5,
                        "heatCelsius": 14.0,
                        "coolCelsius": "hot"
                    },
                    "sdm.devices.traits.ThermostatHvac": { "status": 2 },
                    "sdm.devices.traits.Connectivity": { "status": "ONLINE" },
                    "sdm.devices.traits.ThermostatTemperatureSetpoint": {
                        "heatCelsius": 19.5,
                        "coolCelsius": null
                    },
                    "sdm.devices.traits.Temperature": { "ambientTemperatureCelsius": 20.0 }
                }
            }]
        });
        let fetch = StubFetch::default().with(URL, body);
        let state = reader(fetch, StaticToken("tok".to_string())).read().await;

        assert_eq!(state.mode, Some(ThermostatMode::Heat));
        assert_eq!(state.eco_mode, None);
        assert_eq!(state.eco_setpoints.heat_c, Some(14.0));
        assert_eq!(state.eco_setpoints.cool_c, None);
        assert_eq!(state.hvac_status, None);
        assert_eq!(state.connectivity_status.as_deref(), Some("ONLINE"));
        assert_eq!(state.normal_setpoints.heat_c, Some(19.5));
        assert_eq!(state.normal_setpoints.cool_c, None);
        assert_eq!(state.ambient_temperature_c, Some(20.0));
    }

    #[tokio::test]
    async fn test_empty_device_list_yields_empty_state() {
        // ---
        let fetch = StubFetch::default().with(URL, json!({ "devices": [] }));
        let state = reader(fetch, StaticToken("tok".to_string())).read().await;
        assert_eq!(state, ThermostatState::default());
    }

    #[tokio::test]
    async fn test_token_failure_skips_fetch() {
        // ---
        let fetch = Arc::new(StubFetch::default().with(URL, devices()));
        let reader = ThermostatReader::new(
            fetch.clone(),
            Arc::new(FailingToken),
            "https://sdm.test/v1",
            "proj-1",
        );

        assert_eq!(reader.read().await, ThermostatState::default());
        assert!(fetch.seen_bearers.lock().unwrap().is_empty());
    }
}
