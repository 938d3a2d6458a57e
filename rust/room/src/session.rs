// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan sessions
//!
//! A [`Session`] accumulates the scans of one room and holds the stitched
//! model. The [`SessionStore`] owns all sessions of the process; each
//! session sits behind its own mutex so scans, stitching and material
//! binding on one session are serialized while different sessions proceed
//! in parallel.

use crate::binder;
use crate::cancel::CancelToken;
use crate::config::{SessionConfig, StitchConfig};
use crate::error::{Error, Result};
use crate::export::{self, ExportFormat};
use crate::materials::MaterialCatalog;
use crate::model::RoomModel;
use crate::stitcher::{stitch, ScanRecord};
use nalgebra::Vector3;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wallscan_vision::{
    scan_frame, Element, Frame, FrameScan, InferenceContext, PixelRect, PlaneFit, Provenance,
};

/// Per-room scan state
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created: Instant,
    last_access: Instant,
    scans: Vec<ScanRecord>,
    model: Option<RoomModel>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        let now = Instant::now();
        Self {
            id,
            created: now,
            last_access: now,
            scans: Vec::new(),
            model: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    /// Time since the session was last used
    pub fn idle(&self) -> Duration {
        self.last_access.elapsed()
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Accepted scans in scan order
    pub fn scans(&self) -> &[ScanRecord] {
        &self.scans
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    pub fn model(&self) -> Option<&RoomModel> {
        self.model.as_ref()
    }

    pub fn require_model(&self) -> Result<&RoomModel> {
        self.model.as_ref().ok_or(Error::NotStitched)
    }

    /// Append a scan. Any stitched model is discarded.
    pub fn accept(&mut self, scan: FrameScan) -> usize {
        if self.model.take().is_some() {
            debug!(session = %self.id, "room model invalidated by new scan");
        }
        self.scans.push(ScanRecord::new(scan.wall, scan.elements.elements));
        self.touch();
        self.scans.len() - 1
    }

    /// Stitch all accepted scans. On failure the previous state is kept.
    pub fn stitch(&mut self, config: &StitchConfig, cancel: &CancelToken) -> Result<&RoomModel> {
        self.touch();
        let model = stitch(&self.scans, config, cancel)?;
        Ok(&*self.model.insert(model))
    }

    pub fn apply_material(
        &mut self,
        catalog: &MaterialCatalog,
        wall_index: usize,
        material_id: &str,
    ) -> Result<()> {
        self.touch();
        let model = self.model.as_mut().ok_or(Error::NotStitched)?;
        binder::apply_material(model, catalog, wall_index, material_id)
    }

    /// Remove the material from one wall
    pub fn clear_material(&mut self, wall_index: usize) -> Result<()> {
        self.touch();
        let model = self.model.as_mut().ok_or(Error::NotStitched)?;
        binder::clear_material(model, wall_index)
    }

    pub fn export(&mut self, format: ExportFormat) -> Result<Vec<u8>> {
        self.touch();
        export::export(self.require_model()?, format)
    }

    /// OBJ whose `mtllib` line names `mtl_name`, plus that MTL library
    pub fn export_obj_with_mtl(&mut self, mtl_name: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        self.touch();
        export::export_obj_with_mtl(self.require_model()?, mtl_name)
    }

    /// Drop all scans and the model
    pub fn reset(&mut self) {
        self.scans.clear();
        self.model = None;
        self.touch();
    }
}

/// What the caller learns about an accepted scan
#[derive(Debug, Clone)]
pub struct ScanReceipt {
    /// Scan-order index, also the wall index after stitching
    pub index: usize,
    pub scan_id: Uuid,
    pub confidence: f64,
    pub plane_fit: PlaneFit,
    pub bounds: PixelRect,
    /// Camera-space wall normal
    pub normal: Vector3<f64>,
    pub depth_provenance: Option<Provenance>,
    pub elements: Vec<Element>,
    pub element_provenance: Provenance,
    pub scans_in_session: usize,
}

/// Process-wide map of sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<FxHashMap<Uuid, Arc<Mutex<Session>>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create an empty session and return its id
    pub fn create(&self) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .map_err(|_| Error::Poisoned)?
            .insert(id, Arc::new(Mutex::new(Session::new(id))));
        info!(session = %id, "session created");
        Ok(id)
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .map_err(|_| Error::Poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Run `f` with exclusive access to one session
    pub fn with_session<T>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let session = self.get(id)?;
        let mut guard = session.lock().map_err(|_| Error::Poisoned)?;
        f(&mut guard)
    }

    /// Remove a session; `false` if it did not exist
    pub fn remove(&self, id: &Uuid) -> Result<bool> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| Error::Poisoned)?
            .remove(id)
            .is_some();
        if removed {
            info!(session = %id, "session removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than the configured time-to-live.
    ///
    /// Sessions that are locked right now are in use and are kept.
    pub fn evict_expired(&self) -> Result<usize> {
        let ttl = self.config.ttl();
        let mut sessions = self.sessions.write().map_err(|_| Error::Poisoned)?;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(s) if s.idle() >= ttl => {
                debug!(session = %id, idle_secs = s.idle().as_secs(), "session expired");
                false
            }
            _ => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "expired sessions evicted");
        }
        Ok(evicted)
    }

    /// Whether `session` is still the one registered under `id`
    fn is_current(&self, id: &Uuid, session: &Arc<Mutex<Session>>) -> Result<bool> {
        let sessions = self.sessions.read().map_err(|_| Error::Poisoned)?;
        Ok(sessions.get(id).is_some_and(|s| Arc::ptr_eq(s, session)))
    }

    /// Run the per-frame pipeline and add the result to a session.
    ///
    /// Perception runs before the session lock is taken, so a slow frame
    /// does not block other requests on the same session. Perception errors
    /// leave the session untouched.
    pub fn scan(&self, id: &Uuid, ctx: &InferenceContext, frame: &Frame) -> Result<ScanReceipt> {
        // Fail fast on unknown sessions before spending time on the frame
        let session = self.get(id)?;
        let scan = scan_frame(ctx, frame)?;

        if scan.wall.confidence < self.config.min_scan_confidence {
            warn!(
                session = %id,
                confidence = scan.wall.confidence,
                minimum = self.config.min_scan_confidence,
                "scan rejected"
            );
            return Err(Error::LowConfidence {
                confidence: scan.wall.confidence,
                minimum: self.config.min_scan_confidence,
            });
        }

        let mut receipt = ScanReceipt {
            index: 0,
            scan_id: scan.wall.id,
            confidence: scan.wall.confidence,
            plane_fit: scan.wall.plane_fit,
            bounds: scan.wall.bounds,
            normal: scan.wall.plane.normal,
            depth_provenance: scan.depth_provenance(),
            elements: scan.elements.elements.clone(),
            element_provenance: scan.elements.provenance,
            scans_in_session: 0,
        };

        let mut guard = session.lock().map_err(|_| Error::Poisoned)?;
        // Removed or evicted while the frame was processed
        if !self.is_current(id, &session)? {
            warn!(session = %id, "session removed during scan, result dropped");
            return Err(Error::SessionNotFound(id.to_string()));
        }
        receipt.index = guard.accept(scan);
        receipt.scans_in_session = guard.scan_count();
        info!(
            session = %id,
            index = receipt.index,
            confidence = receipt.confidence,
            elements = receipt.elements.len(),
            "scan accepted"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_remove() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_ok());
        assert!(store.remove(&id).unwrap());
        assert!(!store.remove(&id).unwrap());
        assert!(matches!(store.get(&id), Err(Error::SessionNotFound(_))));
    }

    #[test]
    fn test_removed_session_is_not_current() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        let held = store.get(&id).unwrap();
        assert!(store.is_current(&id, &held).unwrap());

        // A held handle outlives removal but no longer belongs to the store
        store.remove(&id).unwrap();
        let _guard = held.lock().unwrap();
        assert!(!store.is_current(&id, &held).unwrap());

        let other = store.create().unwrap();
        assert!(!store.is_current(&other, &held).unwrap());
    }

    #[test]
    fn test_clear_material_requires_model() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        let err = store.with_session(&id, |s| s.clear_material(0)).unwrap_err();
        assert!(matches!(err, Error::NotStitched));
    }

    #[test]
    fn test_eviction() {
        let store = SessionStore::new(SessionConfig {
            ttl_secs: 0,
            ..Default::default()
        });
        store.create().unwrap();
        store.create().unwrap();
        assert_eq!(store.evict_expired().unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_eviction_keeps_fresh_sessions() {
        let store = SessionStore::default();
        store.create().unwrap();
        assert_eq!(store.evict_expired().unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stitch_without_scans() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        let err = store
            .with_session(&id, |s| s.stitch(&StitchConfig::default(), &CancelToken::new()).map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { walls: 0 }));

        let err = store.with_session(&id, |s| s.export(ExportFormat::Obj)).unwrap_err();
        assert!(matches!(err, Error::NotStitched));
    }
}
