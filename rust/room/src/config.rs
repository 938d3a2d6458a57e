// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stitcher and session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the room stitcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Lower edge of the corner-angle band, degrees
    pub corner_min_degrees: f64,
    /// Upper edge of the corner-angle band, degrees
    pub corner_max_degrees: f64,
    /// Wall height in metres
    pub ceiling_height: f64,
    /// Walls narrower than this (metres) are rejected
    pub min_wall_width: f64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            corner_min_degrees: 70.0,
            corner_max_degrees: 110.0,
            ceiling_height: 2.5,
            min_wall_width: 1e-3,
        }
    }
}

impl StitchConfig {
    pub fn with_ceiling_height(mut self, height: f64) -> Self {
        self.ceiling_height = height;
        self
    }

    /// Whether an angle between wall normals (radians) counts as a corner
    pub fn in_corner_band(&self, angle: f64) -> bool {
        let deg = angle.to_degrees();
        deg >= self.corner_min_degrees && deg <= self.corner_max_degrees
    }
}

/// Session store policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a session is evicted, seconds
    pub ttl_secs: u64,
    /// Scans below this confidence are rejected; 0 keeps everything
    pub min_scan_confidence: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            min_scan_confidence: 0.0,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_band() {
        let config = StitchConfig::default();
        assert!(config.in_corner_band(std::f64::consts::FRAC_PI_2));
        assert!(config.in_corner_band(75f64.to_radians()));
        assert!(!config.in_corner_band(std::f64::consts::PI));
        assert!(!config.in_corner_band(30f64.to_radians()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StitchConfig = serde_json::from_str(r#"{"ceiling_height": 3.0}"#).unwrap();
        assert_eq!(config.ceiling_height, 3.0);
        assert_eq!(config.corner_min_degrees, 70.0);
    }
}
