//! Effective setpoint resolution.

use crate::{EcoMode, ResolvedSetpoints, Setpoint, ThermostatState};

// ---

/// Pick the setpoints the thermostat is actually holding to.
///
/// Cooling applies in COOL and HEATCOOL, heating in HEAT and HEATCOOL. Each
/// value comes either from the eco pair or the normal pair, never a blend.
/// An unknown eco state selects the normal pair; an unknown mode leaves both
/// setpoints inactive.
pub fn resolve(state: &ThermostatState) -> ResolvedSetpoints {
    // ---
    let source = match state.eco_mode {
        Some(EcoMode::On) => &state.eco_setpoints,
        Some(EcoMode::Off) | None => &state.normal_setpoints,
    };

    let Some(mode) = state.mode else {
        return ResolvedSetpoints {
            cooling: Setpoint::Inactive,
            heating: Setpoint::Inactive,
        };
    };

    ResolvedSetpoints {
        cooling: if mode.cools() {
            Setpoint::Active(source.cool_c)
        } else {
            Setpoint::Inactive
        },
        heating: if mode.heats() {
            Setpoint::Active(source.heat_c)
        } else {
            Setpoint::Inactive
        },
    }
}
