// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty mesh: nothing to export")]
    EmptyMesh,

    #[error("Face {face} references vertex {index} but mesh has {vertex_count} vertices")]
    InvalidFace {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Material group references face {face} but mesh has {face_count} faces")]
    InvalidGroup { face: usize, face_count: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
