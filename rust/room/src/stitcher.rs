// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room stitching
//!
//! Turns the wall scans of one session into a single wall mesh:
//!
//! 1. Every camera-space wall normal is rotated into the gravity-aligned room
//!    frame (y up), using the frame heading when one was recorded.
//! 2. Pairs of walls whose normals lie in the corner-angle band are linked at
//!    a shared vertical edge. The turn direction decides which wall's right
//!    edge meets the other's left edge.
//! 3. Walls are laid out along the resulting chain. Each wall is translated
//!    so that its left edge lands on the previous wall's right edge
//!    (least squares over the edge endpoints), and the shared vertices are
//!    reused.
//! 4. A chain whose last wall links back to the first is closed; the last
//!    wall is snapped onto the first wall's left edge.
//!
//! Supported layouts are a single chain (open room) or a single loop
//! (closed room). Anything else fails with `StitchingFailure`.

use crate::cancel::CancelToken;
use crate::config::StitchConfig;
use crate::error::{Error, Result};
use crate::model::{RoomElement, RoomModel, Topology, WallSummary};
use nalgebra::{Point3, Rotation3, Vector3};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::{debug, info, warn};
use wallscan_geometry::{
    check_closure, signed_yaw, validate_faces, Edge, Face, RigidTransform, RoomBounds,
};
use wallscan_vision::{Element, WallScan};

/// Smallest wall distance used by the fronto-parallel placement, metres
const MIN_DISTANCE: f64 = 0.1;

/// Angular deviations closer than this are treated as ties
const DEVIATION_QUANTUM: f64 = 1e-6;

/// One accepted scan: the wall and the elements found on it
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub wall: WallScan,
    pub elements: Vec<Element>,
}

impl ScanRecord {
    pub fn new(wall: WallScan, elements: Vec<Element>) -> Self {
        Self { wall, elements }
    }
}

/// `right` of wall `from` meets `left` of wall `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    from: usize,
    to: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    a: usize,
    b: usize,
    deviation: i64,
    distance: usize,
    /// Signed yaw from `a`'s normal to `b`'s, counter-clockwise positive
    yaw: f64,
}

/// Walk order of the walls and whether the walk closes
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    walk: Vec<usize>,
    closed: bool,
}

/// Wall quad in its own room-aligned frame, before chaining
#[derive(Debug, Clone)]
struct WallGeometry {
    /// Camera frame to wall-local room frame (floor at y = 0)
    local: RigidTransform,
    bottom_left: Point3<f64>,
    bottom_right: Point3<f64>,
    width: f64,
}

#[inline]
fn up() -> Vector3<f64> {
    Vector3::y()
}

/// Camera frame (x right, y down, z forward) to room frame (y up), turned
/// by the optional heading about the vertical axis.
pub fn camera_to_room(heading: Option<f64>) -> Rotation3<f64> {
    let flip = Rotation3::from_axis_angle(&Vector3::x_axis(), PI);
    match heading {
        Some(yaw) => Rotation3::from_axis_angle(&Vector3::y_axis(), yaw) * flip,
        None => flip,
    }
}

/// Unit horizontal room-space normal of a wall
fn room_normal(scan: &WallScan, index: usize) -> Result<Vector3<f64>> {
    let n = camera_to_room(scan.heading) * scan.plane.normal;
    Vector3::new(n.x, 0.0, n.z)
        .try_normalize(1e-6)
        .ok_or_else(|| Error::stitching(format!("wall {} has no horizontal normal component", index)))
}

fn push_vertex(vertices: &mut Vec<Point3<f64>>, p: Point3<f64>) -> u32 {
    vertices.push(p);
    (vertices.len() - 1) as u32
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Link walls at corners and order them into a chain or loop
fn infer_layout(normals: &[Vector3<f64>], config: &StitchConfig) -> Result<Layout> {
    let n = normals.len();
    let mut candidates = Vec::new();
    for a in 0..n {
        for b in a + 1..n {
            let yaw = signed_yaw(&normals[a], &normals[b], &up());
            let angle = yaw.abs();
            if config.in_corner_band(angle) {
                let gap = b - a;
                candidates.push(Candidate {
                    a,
                    b,
                    deviation: ((angle - FRAC_PI_2).abs() / DEVIATION_QUANTUM).round() as i64,
                    distance: gap.min(n - gap),
                    yaw,
                });
            }
        }
    }

    // Closest to 90 degrees first, then scan-order neighbours
    candidates.sort_by(|x, y| {
        x.deviation
            .cmp(&y.deviation)
            .then(x.distance.cmp(&y.distance))
            .then((x.a, x.b).cmp(&(y.a, y.b)))
    });
    debug!(candidates = candidates.len(), "corner candidates");

    let mut right: Vec<Option<usize>> = vec![None; n];
    let mut left: Vec<Option<usize>> = vec![None; n];
    let mut parent: Vec<usize> = (0..n).collect();
    let mut links = Vec::with_capacity(n);
    let mut closed = false;

    for c in &candidates {
        // Clockwise turn (seen from above): a's right edge meets b's left edge
        let link = if c.yaw < 0.0 {
            Link { from: c.a, to: c.b }
        } else {
            Link { from: c.b, to: c.a }
        };
        if right[link.from].is_some() || left[link.to].is_some() {
            continue;
        }

        let (ra, rb) = (find(&mut parent, link.from), find(&mut parent, link.to));
        if ra == rb {
            // Only a link that closes one loop through every wall is accepted
            if n < 3 || links.len() != n - 1 {
                continue;
            }
            closed = true;
        } else {
            parent[ra] = rb;
        }

        right[link.from] = Some(link.to);
        left[link.to] = Some(link.from);
        links.push(link);
        if closed {
            break;
        }
    }

    if links.len() < n - 1 {
        let orphans: Vec<usize> = (0..n)
            .filter(|&i| left[i].is_none() && right[i].is_none())
            .collect();
        return Err(Error::stitching(format!(
            "walls do not form a single chain ({} of {} corners found, unconnected walls {:?})",
            links.len(),
            n - 1,
            orphans
        )));
    }

    let start = if closed {
        0
    } else {
        (0..n)
            .find(|&i| left[i].is_none())
            .ok_or_else(|| Error::stitching("chain has no first wall"))?
    };

    let mut walk = Vec::with_capacity(n);
    let mut current = Some(start);
    while let Some(i) = current {
        walk.push(i);
        if walk.len() == n {
            break;
        }
        current = right[i];
    }
    if walk.len() != n {
        return Err(Error::stitching("corner links do not visit every wall"));
    }

    Ok(Layout { walk, closed })
}

/// Place one wall in its own room-aligned frame.
///
/// The left and right bounds at mid-height are back-projected onto the wall
/// plane and the bottom bound gives the floor. If the plane does not face
/// the camera well enough for that, the wall is placed fronto-parallel at
/// the plane's distance.
fn wall_geometry(
    scan: &WallScan,
    normal: &Vector3<f64>,
    config: &StitchConfig,
    index: usize,
) -> Result<WallGeometry> {
    let rotation = camera_to_room(scan.heading);
    let bounds = scan.bounds;
    let center = bounds.center();
    let tangent = normal.cross(&up());

    let projected = (
        scan.back_project(bounds.x as f64, center.y),
        scan.back_project(bounds.right() as f64, center.y),
        scan.back_project(center.x, bounds.bottom() as f64),
    );
    let (left, right, floor) = match projected {
        (Some(l), Some(r), Some(f)) => (rotation * l, rotation * r, rotation * f),
        _ => {
            debug!(wall = index, "plane not facing camera, using fronto-parallel placement");
            let k = &scan.intrinsics;
            let distance = scan.plane.offset.abs().max(MIN_DISTANCE);
            let anchor = rotation * scan.plane.anchor();
            let half = bounds.width as f64 * distance / k.fx / 2.0;
            let drop = (bounds.bottom() as f64 - center.y) * distance / k.fy;
            (
                anchor - tangent * half,
                anchor + tangent * half,
                anchor - up() * drop,
            )
        }
    };

    let span = right - left;
    let width = Vector3::new(span.x, 0.0, span.z).norm();
    if !width.is_finite() || width < config.min_wall_width {
        return Err(Error::stitching(format!("wall {} has degenerate width {:.4}", index, width)));
    }

    let mid = Point3::new((left.x + right.x) / 2.0, 0.0, (left.z + right.z) / 2.0);
    Ok(WallGeometry {
        local: RigidTransform::from_parts(rotation, Vector3::new(0.0, -floor.y, 0.0)),
        bottom_left: mid - tangent * (width / 2.0),
        bottom_right: mid + tangent * (width / 2.0),
        width,
    })
}

/// Stitch the scans of a session into a room model.
///
/// `scans` is in scan order. At least two scans are required; every scan
/// takes part in the layout regardless of its confidence.
pub fn stitch(scans: &[ScanRecord], config: &StitchConfig, cancel: &CancelToken) -> Result<RoomModel> {
    if scans.len() < 2 {
        return Err(Error::InsufficientData { walls: scans.len() });
    }
    if config.ceiling_height.is_nan() || config.ceiling_height <= 0.0 {
        return Err(Error::stitching(format!(
            "ceiling height must be positive, got {}",
            config.ceiling_height
        )));
    }
    cancel.check()?;

    let normals = scans
        .iter()
        .enumerate()
        .map(|(i, s)| room_normal(&s.wall, i))
        .collect::<Result<Vec<_>>>()?;
    let layout = infer_layout(&normals, config)?;
    debug!(walk = ?layout.walk, closed = layout.closed, "wall layout");
    cancel.check()?;

    let geometry = scans
        .iter()
        .zip(&normals)
        .enumerate()
        .map(|(i, (s, n))| wall_geometry(&s.wall, n, config, i))
        .collect::<Result<Vec<_>>>()?;
    cancel.check()?;

    let height = up() * config.ceiling_height;
    let n = scans.len();
    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(2 * n + 2);
    let mut faces = Vec::with_capacity(n);
    let mut open_boundary = FxHashSet::default();
    let mut transforms = vec![RigidTransform::identity(); n];
    let mut placement = vec![(0usize, 0usize); n];
    let mut closure_gap = None;

    let mut first_left: Option<(u32, u32)> = None;
    let mut previous_right: Option<(u32, u32)> = None;

    for (order, &wall) in layout.walk.iter().enumerate() {
        let g = &geometry[wall];

        let correction = match previous_right {
            None => RigidTransform::identity(),
            Some((bottom, top)) => {
                let source = [g.bottom_left, g.bottom_left + height];
                let target = [vertices[bottom as usize], vertices[top as usize]];
                let correction =
                    RigidTransform::align_translation(Rotation3::identity(), &source, &target)
                        .ok_or_else(|| Error::stitching("corner alignment failed"))?;
                debug!(wall, residual = correction.rms_error(&source, &target), "corner aligned");
                correction
            }
        };

        let (bl, tl) = match previous_right {
            Some(shared) => shared,
            None => {
                let bl = correction.transform_point(&g.bottom_left);
                (push_vertex(&mut vertices, bl), push_vertex(&mut vertices, bl + height))
            }
        };
        if first_left.is_none() {
            first_left = Some((bl, tl));
        }

        let br_point = correction.transform_point(&g.bottom_right);
        let closing = layout.closed && order + 1 == layout.walk.len();
        let (br, tr) = match (closing, first_left) {
            (true, Some((first_bl, first_tl))) => {
                closure_gap = Some((br_point - vertices[first_bl as usize]).norm());
                (first_bl, first_tl)
            }
            _ => (
                push_vertex(&mut vertices, br_point),
                push_vertex(&mut vertices, br_point + height),
            ),
        };

        faces.push(Face::Quad([bl, br, tr, tl]));
        open_boundary.insert(Edge::new(bl, br));
        open_boundary.insert(Edge::new(tl, tr));

        transforms[wall] = g.local.then(&correction);
        placement[wall] = (faces.len() - 1, order);
        previous_right = Some((br, tr));
        cancel.check()?;
    }

    validate_faces(&faces, vertices.len())?;
    let report = check_closure(&faces, &open_boundary);
    let topology = if report.closed {
        Topology::Closed
    } else {
        Topology::Open
    };
    if layout.closed && !report.closed {
        warn!(unmatched = ?report.unmatched, "loop closed but mesh edges are unmatched");
    }
    if let Some(gap) = closure_gap {
        debug!(gap, "loop closure gap");
    }

    let walls: Vec<WallSummary> = scans
        .iter()
        .enumerate()
        .map(|(i, s)| WallSummary {
            scan_id: s.wall.id,
            confidence: s.wall.confidence,
            plane_fit: s.wall.plane_fit,
            width: geometry[i].width,
            height: config.ceiling_height,
            face_index: placement[i].0,
            order: placement[i].1,
            transform: transforms[i],
            normal: normals[i],
        })
        .collect();

    let elements: Vec<RoomElement> = scans
        .iter()
        .enumerate()
        .flat_map(|(i, s)| {
            let transform = transforms[i];
            let scan_id = s.wall.id;
            s.elements.iter().map(move |e| RoomElement {
                class: e.class,
                bbox: e.bbox,
                confidence: e.confidence,
                position: transform.transform_point(&e.position),
                wall_index: i,
                scan_id,
                provenance: e.provenance,
            })
        })
        .collect();

    let bounds = RoomBounds::from_points(&vertices);
    info!(
        walls = n,
        vertices = vertices.len(),
        elements = elements.len(),
        topology = ?topology,
        area = bounds.area,
        "room stitched"
    );

    Ok(RoomModel {
        vertices,
        faces,
        wall_count: n,
        walls,
        elements,
        materials: BTreeMap::new(),
        bounds,
        topology,
        closure_gap,
    })
}
