// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wallscan Geometry
//!
//! Geometric building blocks for room reconstruction: wall planes, rigid
//! transforms between wall frames, quad/triangle surface meshes with edge
//! topology checks, room bounds, and the OBJ / GLB writers.

pub mod bounds;
pub mod error;
pub mod export;
pub mod mesh;
pub mod plane;
pub mod topology;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use bounds::RoomBounds;
pub use error::{Error, Result};
pub use export::{
    is_reserved_group_name, srgb_to_linear, write_glb, write_mtl, write_obj, ExportMesh,
    MaterialGroup, ObjSummary, DEFAULT_GROUP, UNGROUPED_GROUP,
};
pub use mesh::{Face, Mesh};
pub use plane::Plane;
pub use topology::{check_closure, validate_faces, ClosureReport, Edge};
pub use transform::{signed_yaw, RigidTransform};
