// Wire models for the OpenSprinkler HTTP API.
//
// The firmware uses terse field names throughout; they are kept verbatim
// with accessor methods providing the readable surface.

use serde::Deserialize;

/// Payload of `GET /jc` (controller variables).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerVariables {
    /// Device time (unix epoch seconds).
    #[serde(default)]
    pub devt: u64,
    /// Number of 8-station boards (including the built-in one).
    #[serde(default)]
    pub nbrd: u8,
    /// Operation enable flag.
    #[serde(default)]
    pub en: u8,
    /// Rain delay active flag.
    #[serde(default)]
    pub rd: u8,
    /// Rain delay stop time (unix epoch seconds).
    #[serde(default)]
    pub rdst: u64,
}

impl ControllerVariables {
    pub fn enabled(&self) -> bool {
        self.en == 1
    }

    pub fn rain_delay_active(&self) -> bool {
        self.rd == 1
    }

    /// Total addressable stations (8 per board).
    pub fn station_count(&self) -> u16 {
        u16::from(self.nbrd) * 8
    }
}

/// Payload of `GET /js` (station status bits).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationStatus {
    /// One 0/1 entry per station.
    #[serde(default)]
    pub sn: Vec<u8>,
    #[serde(default)]
    pub nstations: u8,
}

impl StationStatus {
    /// Whether the station at `index` is currently on, or `None` if the
    /// index is out of range.
    pub fn is_on(&self, index: u8) -> Option<bool> {
        self.sn.get(usize::from(index)).map(|bit| *bit == 1)
    }
}

/// Result envelope returned by command endpoints (`/cm`, `/cv`):
/// `{"result": 1}` on success.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResultEnvelope {
    pub result: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_count_is_boards_times_eight() {
        let vars: ControllerVariables =
            serde_json::from_str(r#"{"devt":1,"nbrd":2,"en":1,"rd":0,"rdst":0}"#)
                .expect("controller variables should parse");
        assert_eq!(vars.station_count(), 16);
        assert!(vars.enabled());
        assert!(!vars.rain_delay_active());
    }

    #[test]
    fn station_bits_index_safely() {
        let status: StationStatus = serde_json::from_str(r#"{"sn":[1,0,0],"nstations":3}"#)
            .expect("station status should parse");
        assert_eq!(status.is_on(0), Some(true));
        assert_eq!(status.is_on(2), Some(false));
        assert_eq!(status.is_on(3), None);
    }
}
