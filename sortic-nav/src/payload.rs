//! JSON payloads exchanged with the communication layer.
//!
//! Position updates arrive as
//!
//! ```json
//! {"sensor": "TransferHandover", "time": 1351824120, "data": [3.0, 0.0]}
//! ```
//!
//! where `sensor` carries the sector label and `data[0]` the line.
//! `data[1]` is carried through untouched.
//!
//! Parsing never returns an error: a malformed document yields a payload
//! whose `sensor` is [`PARSE_FAILED`], and the navigator refuses to apply it.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::navigation::{Phase, State};
use crate::topology::Sector;

/// `sensor` value of a payload that could not be parsed.
pub const PARSE_FAILED: &str = "Pars failed";

/// Sensor/position payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPayload {
    pub sensor: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub data: [f32; 2],
}

impl PositionPayload {
    /// Parse a JSON document, falling back to the failure marker.
    pub fn parse(json: &str) -> Self {
        match serde_json::from_str::<PositionPayload>(json) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("PositionPayload: parse failed: {}", e);
                Self::failed()
            }
        }
    }

    /// Payload carrying the failure marker.
    pub fn failed() -> Self {
        Self {
            sensor: PARSE_FAILED.to_string(),
            time: 0,
            data: [0.0, 0.0],
        }
    }

    /// Build a position payload for a sector and line.
    pub fn position(sector: Sector, line: u32, time: i64) -> Self {
        Self {
            sensor: sector.label().to_string(),
            time,
            data: [line as f32, 0.0],
        }
    }

    pub fn is_failed(&self) -> bool {
        self.sensor == PARSE_FAILED
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Validated sector/line pair decoded from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub sector: Sector,
    pub line: u32,
}

impl TryFrom<&PositionPayload> for PositionUpdate {
    type Error = NavError;

    fn try_from(payload: &PositionPayload) -> Result<Self> {
        if payload.is_failed() {
            return Err(NavError::Payload("payload marked as parse failure".to_string()));
        }

        let sector = Sector::from_label(&payload.sensor);
        if !sector.is_known() {
            return Err(NavError::Payload(format!(
                "unknown sector label '{}'",
                payload.sensor
            )));
        }

        let raw_line = payload.data[0];
        let whole = raw_line.is_finite() && raw_line.fract() == 0.0;
        if !whole || raw_line < 1.0 || raw_line >= u32::MAX as f32 {
            return Err(NavError::Payload(format!("invalid line {}", raw_line)));
        }

        Ok(Self {
            sector,
            line: raw_line as u32,
        })
    }
}

/// Telemetry snapshot of a navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavStatus {
    pub vehicle: String,
    pub state: String,
    pub phase: u32,
    pub sector: String,
    pub line: u32,
    pub token: bool,
    pub target: Option<String>,
    pub target_line: Option<u32>,
}

impl NavStatus {
    pub fn new(
        vehicle: &str,
        state: State,
        phase: Phase,
        sector: Sector,
        line: u32,
        token: bool,
        target: Option<(Sector, u32)>,
    ) -> Self {
        Self {
            vehicle: vehicle.to_string(),
            state: state.to_string(),
            phase: phase.code(),
            sector: sector.label().to_string(),
            line,
            token,
            target: target.map(|(s, _)| s.label().to_string()),
            target_line: target.map(|(_, l)| l),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_valid_payload() {
        let payload =
            PositionPayload::parse(r#"{"sensor":"gps","time":1351824120,"data":[48.75608,2.302038]}"#);
        assert_eq!(payload.sensor, "gps");
        assert_eq!(payload.time, 1351824120);
        assert_relative_eq!(payload.data[0], 48.75608, epsilon = 1e-5);
        assert_relative_eq!(payload.data[1], 2.302038, epsilon = 1e-5);
    }

    #[test]
    fn test_parse_malformed_payload_sets_marker() {
        for json in ["", "{", "not json", r#"{"time": 3}"#, r#"{"sensor": 5}"#] {
            let payload = PositionPayload::parse(json);
            assert!(payload.is_failed(), "expected marker for {:?}", json);
        }
    }

    #[test]
    fn test_position_payload_json() {
        let payload = PositionPayload::position(Sector::TransferHandover, 3, 42);
        let json = payload.to_json().unwrap();
        assert!(json.contains("\"sensor\":\"TransferHandover\""));
        assert_eq!(PositionPayload::parse(&json), payload);
    }

    #[test]
    fn test_update_from_payload() {
        let payload = PositionPayload::position(Sector::SorticHandover, 2, 0);
        let update = PositionUpdate::try_from(&payload).unwrap();
        assert_eq!(update.sector, Sector::SorticHandover);
        assert_eq!(update.line, 2);
    }

    #[test]
    fn test_update_rejects_invalid_payloads() {
        assert!(PositionUpdate::try_from(&PositionPayload::failed()).is_err());

        let mut unknown = PositionPayload::position(Sector::SorticHandover, 1, 0);
        unknown.sensor = "Atlantis".to_string();
        assert!(PositionUpdate::try_from(&unknown).is_err());

        let mut zero_line = PositionPayload::position(Sector::SorticHandover, 1, 0);
        zero_line.data[0] = 0.2;
        assert!(PositionUpdate::try_from(&zero_line).is_err());

        let mut nan_line = PositionPayload::position(Sector::SorticHandover, 1, 0);
        nan_line.data[0] = f32::NAN;
        assert!(PositionUpdate::try_from(&nan_line).is_err());
    }

    #[test]
    fn test_update_rejects_fractional_and_oversized_lines() {
        let mut fractional = PositionPayload::position(Sector::TransferHandover, 1, 0);
        fractional.data[0] = 2.4;
        assert!(matches!(
            PositionUpdate::try_from(&fractional),
            Err(NavError::Payload(_))
        ));

        let mut huge = PositionPayload::position(Sector::TransferHandover, 1, 0);
        huge.data[0] = 1.0e12;
        assert!(matches!(PositionUpdate::try_from(&huge), Err(NavError::Payload(_))));

        let mut at_limit = PositionPayload::position(Sector::TransferHandover, 1, 0);
        at_limit.data[0] = u32::MAX as f32;
        assert!(PositionUpdate::try_from(&at_limit).is_err());

        let mut whole = PositionPayload::position(Sector::TransferHandover, 1, 0);
        whole.data[0] = 3.0;
        assert_eq!(PositionUpdate::try_from(&whole).unwrap().line, 3);
    }

    #[test]
    fn test_failure_marker_matches_wire_value() {
        let payload = PositionPayload::parse("{oops");
        assert_eq!(payload.sensor, "Pars failed");
        let json = payload.to_json().unwrap();
        assert!(PositionPayload::parse(&json).is_failed());
    }

    #[test]
    fn test_status_json() {
        let status = NavStatus::new(
            "agv-1",
            State::Gateway,
            Phase::initial(State::Gateway),
            Sector::SorticWaitForGateway,
            1,
            false,
            Some((Sector::TransferHandover, 3)),
        );
        let json = status.to_json().unwrap();
        assert!(json.contains("\"state\":\"gateway\""));
        assert!(json.contains("\"sector\":\"SorticWaitForGateway\""));
        assert!(json.contains("\"target_line\":3"));
    }
}
