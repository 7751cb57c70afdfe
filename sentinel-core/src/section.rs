//! Named logical camera-use contexts sharing the single physical device.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A monitored area of the site. The set is closed; every section shares
/// the one physical camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSection {
    Machine,
    Gate,
}

impl CameraSection {
    pub const ALL: [CameraSection; 2] = [CameraSection::Machine, CameraSection::Gate];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraSection::Machine => "machine",
            CameraSection::Gate => "gate",
        }
    }
}

impl fmt::Display for CameraSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraSection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "machine" => Ok(CameraSection::Machine),
            "gate" => Ok(CameraSection::Gate),
            other => Err(Error::InvalidSection(other.to_string())),
        }
    }
}
