// ── Domain model ──
//
// Typed views over the vendor's integer-coded wire values, the per-poll
// device snapshot, and the channel values published to the host. Vendor
// codes map through explicit tables with fallible conversions; an unknown
// code is reported as an error, never a panic.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A vendor integer code with no known mapping.
#[derive(Debug, Clone, Copy, Error)]
#[error("unknown {kind} code {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i64,
}

// ── System state ─────────────────────────────────────────────────────

/// What the HVAC system is currently doing (`state` in the info payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Idle,
    Heating,
    Cooling,
    Lockout,
    Error,
}

impl SystemState {
    pub fn from_code(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Heating),
            2 => Ok(Self::Cooling),
            3 => Ok(Self::Lockout),
            4 => Ok(Self::Error),
            _ => Err(UnknownCode {
                kind: "system state",
                code,
            }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Heating => 1,
            Self::Cooling => 2,
            Self::Lockout => 3,
            Self::Error => 4,
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Heating => "heating",
            Self::Cooling => "cooling",
            Self::Lockout => "lockout",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ── System mode ──────────────────────────────────────────────────────

/// What the user has asked the system to do (`mode` in the info payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl SystemMode {
    pub fn from_code(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::Off),
            1 => Ok(Self::Heat),
            2 => Ok(Self::Cool),
            3 => Ok(Self::Auto),
            _ => Err(UnknownCode {
                kind: "system mode",
                code,
            }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Off => 0,
            Self::Heat => 1,
            Self::Cool => 2,
            Self::Auto => 3,
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

// ── Temperature unit ─────────────────────────────────────────────────

/// Active unit system (`tempunits` in the info payload).
///
/// Re-resolved on every successful info fetch -- the user can flip the
/// device between imperial and metric at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    pub fn from_code(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::Fahrenheit),
            1 => Ok(Self::Celsius),
            _ => Err(UnknownCode {
                kind: "temperature unit",
                code,
            }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Fahrenheit => 0,
            Self::Celsius => 1,
        }
    }

    /// The setpoint increment the device accepts in this unit.
    pub fn increment(self) -> f64 {
        match self {
            Self::Fahrenheit => 1.0,
            Self::Celsius => 0.5,
        }
    }

    /// Round a requested setpoint to the nearest accepted increment
    /// (half-up, matching the device's own rounding).
    pub fn round_setpoint(self, value: f64) -> f64 {
        let increment = self.increment();
        (value / increment).round() * increment
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Fahrenheit => "\u{b0}F",
            Self::Celsius => "\u{b0}C",
        };
        f.write_str(symbol)
    }
}

// ── Device snapshot ──────────────────────────────────────────────────

/// The device state as of one successful poll cycle.
///
/// Built atomically once both the sensor and info responses have parsed;
/// a failed cycle leaves the previous snapshot in place untouched.
/// Sensor readings are optional because not every installation has an
/// outdoor sensor (or reports humidity).
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub temperature: Option<f64>,
    pub outdoor_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_setpoint: f64,
    pub cool_setpoint: f64,
    pub system_state: SystemState,
    pub system_mode: SystemMode,
    pub unit: TemperatureUnit,
    pub received_at: DateTime<Utc>,
}

// ── Channels ─────────────────────────────────────────────────────────

/// A named data point exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Temperature,
    OutdoorTemperature,
    Humidity,
    HeatingSetpoint,
    CoolingSetpoint,
    SystemState,
    SystemMode,
}

/// The typed value carried by a channel update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Temperature { value: f64, unit: TemperatureUnit },
    Percent(f64),
    SystemState(SystemState),
    SystemMode(SystemMode),
}

/// One published channel value. Temperature values carry the unit that
/// was active when the cycle that produced them completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    pub channel: Channel,
    pub value: ChannelValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for code in 0..=4 {
            let state = SystemState::from_code(code).expect("known code");
            assert_eq!(state.code(), code);
        }
        assert!(SystemState::from_code(5).is_err());
        assert!(SystemState::from_code(-1).is_err());
    }

    #[test]
    fn mode_codes_round_trip() {
        for code in 0..=3 {
            let mode = SystemMode::from_code(code).expect("known code");
            assert_eq!(mode.code(), code);
        }
        assert!(SystemMode::from_code(4).is_err());
    }

    #[test]
    fn unit_codes_map_per_vendor_table() {
        assert_eq!(
            TemperatureUnit::from_code(0).expect("imperial"),
            TemperatureUnit::Fahrenheit
        );
        assert_eq!(
            TemperatureUnit::from_code(1).expect("metric"),
            TemperatureUnit::Celsius
        );
        assert!(TemperatureUnit::from_code(2).is_err());
    }

    #[test]
    fn fahrenheit_rounds_to_whole_degrees() {
        assert_eq!(TemperatureUnit::Fahrenheit.round_setpoint(70.4), 70.0);
        assert_eq!(TemperatureUnit::Fahrenheit.round_setpoint(70.5), 71.0);
    }

    #[test]
    fn celsius_rounds_to_half_degrees() {
        assert_eq!(TemperatureUnit::Celsius.round_setpoint(22.3), 22.5);
        assert_eq!(TemperatureUnit::Celsius.round_setpoint(22.1), 22.0);
        assert_eq!(TemperatureUnit::Celsius.round_setpoint(22.75), 23.0);
    }

    #[test]
    fn unknown_code_message_names_the_field() {
        let err = SystemMode::from_code(9).expect_err("unknown code");
        assert_eq!(err.to_string(), "unknown system mode code 9");
    }
}
