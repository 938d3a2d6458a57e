// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wallscan Room
//!
//! Session-level reconstruction: scans accumulated per room are stitched
//! into a single wall mesh, walls get catalog materials, and the result is
//! exported as OBJ or GLB.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wallscan_room::{CancelToken, ExportFormat, MaterialCatalog, SessionStore, StitchConfig};
//!
//! let store = SessionStore::default();
//! let id = store.create()?;
//! for frame in &frames {
//!     store.scan(&id, &ctx, frame)?;
//! }
//! let glb = store.with_session(&id, |session| {
//!     session.stitch(&StitchConfig::default(), &CancelToken::new())?;
//!     session.apply_material(&MaterialCatalog::builtin(), 0, "brick_red")?;
//!     session.export(ExportFormat::Glb)
//! })?;
//! ```

pub mod binder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod materials;
pub mod model;
pub mod session;
pub mod stitcher;
pub mod texture;

pub use binder::{apply_material, clear_material};
pub use cancel::CancelToken;
pub use config::{SessionConfig, StitchConfig};
pub use error::{Error, Result};
pub use export::{export, export_obj_with_mtl, material_groups, ExportFormat};
pub use materials::{Material, MaterialCatalog, MaterialKind};
pub use model::{RoomElement, RoomModel, RoomStatistics, Topology, WallSummary};
pub use session::{ScanReceipt, Session, SessionStore};
pub use stitcher::{camera_to_room, stitch, ScanRecord};
pub use texture::{generate_texture, texture_png, TEXTURE_SIZE};
