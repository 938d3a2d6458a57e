// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Vision(#[from] wallscan_vision::Error),

    #[error(transparent)]
    Geometry(#[from] wallscan_geometry::Error),

    #[error("Insufficient data: {walls} wall(s) scanned, at least 2 required")]
    InsufficientData { walls: usize },

    #[error("Stitching failed: {0}")]
    StitchingFailure(String),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Wall index {index} out of range (room has {len} walls)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Room model has no faces")]
    EmptyModel,

    #[error("Session has no stitched room model")]
    NotStitched,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Session lock poisoned")]
    Poisoned,

    #[error("Scan rejected: confidence {confidence:.2} below minimum {minimum:.2}")]
    LowConfidence { confidence: f64, minimum: f64 },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid material catalog: {0}")]
    Catalog(String),

    #[error("Texture encoding failed: {0}")]
    Texture(String),
}

impl Error {
    pub fn stitching<S: Into<String>>(msg: S) -> Self {
        Error::StitchingFailure(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Catalog(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Texture(err.to_string())
    }
}
