use crate::types::{FeedSample, PositionCalibration, Reference};
use glam::{DQuat, DVec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest line accepted before the buffer is dropped as garbage.
const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No sample available")]
    DataUnavailable,
    #[error("Malformed feed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Feed message carries a non-finite value")]
    NonFinite,
}

/// Inbound message as the sensor bridge sends it.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    q0: f64,
    q1: f64,
    q2: f64,
    q3: f64,
    x: f64,
    y: f64,
    #[serde(rename = "CoG", default)]
    cog: i64,
    #[serde(rename = "sessionID", default)]
    session_id: Option<i64>,
    #[serde(rename = "shotID", default = "no_shot")]
    shot_id: i64,
}

fn no_shot() -> i64 {
    -1
}

/// Outbound user settings, sent back to the bridge periodically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    pub q0_ref: f64,
    pub q1_ref: f64,
    pub q2_ref: f64,
    pub q3_ref: f64,
    #[serde(rename = "sliderSensitivityValue")]
    pub sensitivity: f64,
    #[serde(rename = "sliderSensitivityStabilityValue")]
    pub stability_sensitivity: f64,
    #[serde(rename = "Xcalibration")]
    pub x_calibration: f64,
    #[serde(rename = "Ycalibration")]
    pub y_calibration: f64,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self::new(&Reference::ZERO, 1.0, 10.0, &PositionCalibration::default())
    }
}

impl ControlParameters {
    pub fn new(
        reference: &Reference,
        sensitivity: f64,
        stability_sensitivity: f64,
        calibration: &PositionCalibration,
    ) -> Self {
        Self {
            q0_ref: reference.w,
            q1_ref: reference.x,
            q2_ref: reference.y,
            q3_ref: reference.z,
            sensitivity,
            stability_sensitivity,
            x_calibration: calibration.offset.x,
            y_calibration: calibration.offset.y,
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::from_components(self.q0_ref, self.q1_ref, self.q2_ref, self.q3_ref)
    }
}

/// Decode one JSON feed message.
pub fn decode_message(text: &str) -> Result<FeedSample, FeedError> {
    let msg: FeedMessage = serde_json::from_str(text)?;

    let values = [msg.q0, msg.q1, msg.q2, msg.q3, msg.x, msg.y];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FeedError::NonFinite);
    }

    Ok(FeedSample {
        quaternion: DQuat::from_xyzw(msg.q1, msg.q2, msg.q3, msg.q0),
        position: DVec2::new(msg.x, msg.y),
        cog: msg.cog == 1,
        session_id: msg.session_id,
        shot_id: msg.shot_id,
    })
}

/// Encode parameters as one newline-terminated JSON line.
pub fn encode_parameters(params: &ControlParameters) -> Result<String, FeedError> {
    let mut line = serde_json::to_string(params)?;
    line.push('\n');
    Ok(line)
}

/// Streaming splitter for newline-delimited feed messages.
///
/// Feed raw bytes via `push_data`, then drain decoded samples via `next_sample`.
pub struct LineParser {
    buffer: Vec<u8>,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_LINE_LEN && !self.buffer.contains(&b'\n') {
            tracing::warn!(len = self.buffer.len(), "Dropping oversized feed line");
            self.buffer.clear();
        }
    }

    /// Decode the next complete line. Returns `None` until a full line is buffered.
    /// Blank lines are skipped.
    pub fn next_sample(&mut self) -> Option<Result<FeedSample, FeedError>> {
        loop {
            let end = self.buffer.iter().position(|&b| b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=end).collect();

            let text = match std::str::from_utf8(&line) {
                Ok(text) => text.trim(),
                Err(_) => return Some(Err(FeedError::DataUnavailable)),
            };
            if text.is_empty() {
                continue;
            }
            return Some(decode_message(text));
        }
    }
}
