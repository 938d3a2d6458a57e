// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use std::str::FromStr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Maximum upload size in MB.
    pub max_upload_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Idle time after which a scan session is dropped.
    pub session_ttl_secs: u64,
    /// How often expired sessions are swept.
    pub eviction_interval_secs: u64,
    /// Wall height used by the stitcher, metres.
    pub ceiling_height: f64,
    /// Number of worker threads for parallel processing.
    pub worker_threads: usize,
    /// Optional JSON material catalog; the built-in catalog is used otherwise.
    pub materials_path: Option<String>,
    /// Budget for one depth-network inference, milliseconds.
    pub depth_timeout_ms: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8000),
            max_upload_mb: env_or("MAX_UPLOAD_MB", 20),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 120),
            session_ttl_secs: env_or("SESSION_TTL_SECS", 3600),
            eviction_interval_secs: env_or("EVICTION_INTERVAL_SECS", 60),
            ceiling_height: env_or("CEILING_HEIGHT_M", 2.5),
            worker_threads: env_or("WORKER_THREADS", num_cpus::get()),
            materials_path: std::env::var("MATERIALS_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            depth_timeout_ms: env_or("DEPTH_TIMEOUT_MS", 2000),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
