//! Device identity
//!
//! Enrollment record written by the provisioning step, plus the board
//! serial used as hardware identity during registration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::network::Registration;

/// Hardware id reported when the board serial can't be read.
pub const UNKNOWN_HARDWARE_ID: &str = "UNKNOWN";

/// Prefix of the player name sent at registration.
const NAME_PREFIX: &str = "Atlas-";

/// Contents of the enrollment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub device_uuid: String,
    #[serde(default)]
    pub pairing_code: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Enrollment {
    /// Reads the enrollment file. `None` if it is missing or unreadable,
    /// which means the device is not enrolled.
    pub async fn load(path: &Path) -> Option<Self> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(_) => {
                tracing::info!(path = %path.display(), "no enrollment file, player not enrolled");
                return None;
            }
        };
        match serde_json::from_slice(&data) {
            Ok(enrollment) => Some(enrollment),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read enrollment file");
                None
            }
        }
    }
}

/// Reads the board serial from a cpuinfo file.
pub async fn read_hardware_id(cpuinfo: &Path) -> String {
    match fs::read_to_string(cpuinfo).await {
        Ok(text) => parse_serial(&text).unwrap_or_else(|| UNKNOWN_HARDWARE_ID.to_string()),
        Err(_) => UNKNOWN_HARDWARE_ID.to_string(),
    }
}

/// Extracts the value of the `Serial : <value>` line.
pub fn parse_serial(cpuinfo: &str) -> Option<String> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "Serial" {
            return None;
        }
        let serial: String = value
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        (!serial.is_empty()).then_some(serial)
    })
}

/// Player name derived from the hardware id: `Atlas-` plus its last six
/// characters.
pub fn player_name(hardware_id: &str) -> String {
    let chars: Vec<char> = hardware_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    format!("{}{}", NAME_PREFIX, tail)
}

/// Registration request for this device.
pub fn registration(enrollment: &Enrollment, hardware_id: &str) -> Registration {
    Registration {
        hardware_id: hardware_id.to_string(),
        device_id: enrollment.device_uuid.clone(),
        name: player_name(hardware_id),
    }
}
