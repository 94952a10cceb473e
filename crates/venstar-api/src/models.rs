// Wire models for the ColorTouch local API.
//
// Fields use `#[serde(default)]` liberally because the embedded firmware
// omits fields depending on model and configuration.

use serde::Deserialize;

// ── /query/sensors ───────────────────────────────────────────────────

/// Payload of `GET /query/sensors`.
///
/// ```json
/// { "sensors": [ { "name": "Thermostat", "temp": 71.0, "hum": 41.0 },
///                { "name": "Outdoor", "temp": 58.0 } ] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorReadings {
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

impl SensorReadings {
    /// Look up a sensor by name, case-insensitively. The built-in sensor is
    /// named `Thermostat`; a paired outdoor sensor reports as `Outdoor`.
    pub fn named(&self, name: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// One sensor reading. Humidity is only reported by the built-in sensor.
#[derive(Debug, Clone, Deserialize)]
pub struct Sensor {
    pub name: String,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub hum: Option<f64>,
}

// ── /query/info ──────────────────────────────────────────────────────

/// Payload of `GET /query/info`.
///
/// Only the fields the synchronizer consumes are modeled; the firmware
/// returns several dozen more.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoData {
    #[serde(default)]
    pub name: Option<String>,
    /// 0=off, 1=heat, 2=cool, 3=auto
    #[serde(default)]
    pub mode: i64,
    /// 0=idle, 1=heating, 2=cooling, 3=lockout, 4=error
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub heattemp: f64,
    #[serde(default)]
    pub cooltemp: f64,
    /// 0=fahrenheit, 1=celsius
    #[serde(default)]
    pub tempunits: i64,
}

// ── /control ─────────────────────────────────────────────────────────

/// Full desired state for `POST /control`.
///
/// The device resets any omitted dimension to its default, so callers must
/// always supply all three together (zero setpoints are skipped, matching
/// the firmware's treatment of "unset").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRequest {
    pub heattemp: f64,
    pub cooltemp: f64,
    pub mode: i64,
}

impl ControlRequest {
    /// Render as form fields in the order the firmware documents them.
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(3);
        if self.heattemp > 0.0 {
            fields.push(("heattemp", format_temp(self.heattemp)));
        }
        if self.cooltemp > 0.0 {
            fields.push(("cooltemp", format_temp(self.cooltemp)));
        }
        fields.push(("mode", self.mode.to_string()));
        fields
    }
}

/// Response body of `POST /control`: `{"success": true}` or
/// `{"success": false, "reason": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Whole-degree values are sent without a decimal point; the firmware
/// rejects `70.0` where it accepts `70`.
fn format_temp(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
