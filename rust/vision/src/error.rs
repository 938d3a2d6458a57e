// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for per-frame perception
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the per-frame estimators.
///
/// None of these abort a session: the caller drops the frame and retries.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("No wall detected: {0}")]
    DetectionFailure(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::InvalidFrame(err.to_string())
    }
}

/// Failure of an inference backend.
///
/// Never returned to callers of the estimators; any of these switches the
/// estimator onto its classical path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("backend unavailable")]
    Unavailable,

    #[error("inference failed: {0}")]
    Failed(String),

    #[error("inference timed out")]
    TimedOut,
}
