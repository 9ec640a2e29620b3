//! FeatureFrame - feature ingestion output
//!
//! Structured per-feature, per-camera observation map.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{SVector, Vector3};
use parking_lot::RwLock;

/// `[x, y, z, u, v, vx, vy]`: normalized ray, pixel coordinates, pixel velocity
pub type FeatureVector = SVector<f64, 7>;

/// Landmark identifier
pub type FeatureId = i32;

/// Camera index (0 = left, 1 = right)
pub type CameraId = i32;

/// One camera's observation of a landmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureObservation {
    pub camera_id: CameraId,
    pub vector: FeatureVector,
}

impl FeatureObservation {
    pub fn new(camera_id: CameraId, vector: FeatureVector) -> Self {
        Self { camera_id, vector }
    }

    /// Normalized ray `(x, y, z)`
    pub fn ray(&self) -> Vector3<f64> {
        self.vector.fixed_rows::<3>(0).into_owned()
    }

    /// Pixel coordinates `(u, v)`
    pub fn pixel(&self) -> (f64, f64) {
        (self.vector[3], self.vector[4])
    }

    /// Pixel velocity `(vx, vy)`
    pub fn velocity(&self) -> (f64, f64) {
        (self.vector[5], self.vector[6])
    }
}

/// Per-timestamp mapping from landmark to its observations
///
/// Ordered by feature id; per feature, observations keep arrival order.
/// A feature seen by both cameras at the same instant has two entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    features: BTreeMap<FeatureId, Vec<FeatureObservation>>,
}

impl FeatureFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation to the list of `feature_id`
    pub fn push(&mut self, feature_id: FeatureId, observation: FeatureObservation) {
        self.features
            .entry(feature_id)
            .or_default()
            .push(observation);
    }

    /// Observations of one feature, in arrival order
    pub fn get(&self, feature_id: FeatureId) -> Option<&[FeatureObservation]> {
        self.features.get(&feature_id).map(Vec::as_slice)
    }

    /// Number of distinct features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Total observations across all features and cameras
    pub fn observation_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FeatureId, Vec<FeatureObservation>> {
        self.features.iter()
    }
}

impl<'a> IntoIterator for &'a FeatureFrame {
    type Item = (&'a FeatureId, &'a Vec<FeatureObservation>);
    type IntoIter = btree_map::Iter<'a, FeatureId, Vec<FeatureObservation>>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Ground-truth landmark positions keyed by feature id
///
/// Shared between the feature handler (writer) and whoever evaluates the
/// estimator against simulation data (reader). Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthTable {
    inner: Arc<RwLock<HashMap<FeatureId, Vector3<f64>>>>,
}

impl GroundTruthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the position of `feature_id`
    pub fn record(&self, feature_id: FeatureId, position: Vector3<f64>) {
        self.inner.write().insert(feature_id, position);
    }

    pub fn get(&self, feature_id: FeatureId) -> Option<Vector3<f64>> {
        self.inner.read().get(&feature_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
