// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face to material assignment

use crate::error::{Error, Result};
use crate::materials::MaterialCatalog;
use crate::model::RoomModel;
use tracing::debug;

/// Assign `material_id` to every face of the wall at `wall_index`.
///
/// Both inputs are checked before anything is written, so a failed call
/// leaves the model untouched. Reapplying the same material is a no-op.
pub fn apply_material(
    model: &mut RoomModel,
    catalog: &MaterialCatalog,
    wall_index: usize,
    material_id: &str,
) -> Result<()> {
    let material = catalog.require(material_id)?;
    let faces = model.wall_faces(wall_index).ok_or(Error::IndexOutOfRange {
        index: wall_index,
        len: model.walls.len(),
    })?;

    for face in &faces {
        model.materials.insert(*face, material.clone());
    }
    debug!(wall = wall_index, material = material_id, faces = faces.len(), "material applied");
    Ok(())
}

/// Remove any material from the wall's faces
pub fn clear_material(model: &mut RoomModel, wall_index: usize) -> Result<()> {
    let faces = model.wall_faces(wall_index).ok_or(Error::IndexOutOfRange {
        index: wall_index,
        len: model.walls.len(),
    })?;
    for face in faces {
        model.materials.remove(&face);
    }
    Ok(())
}
