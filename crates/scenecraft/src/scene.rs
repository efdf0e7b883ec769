//! The boundary to the host 3D application.
//!
//! Callers of the agent use a [`SceneHost`] to answer the model's requests for
//! scene information; the agent itself never talks to the host.
pub mod blender;
pub mod describe;
pub mod graph;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Scene {} could not be loaded: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("Camera '{0}' not found in the scene")]
    CameraNotFound(String),

    #[error("Host application failed: {0}")]
    HostFailure(String),

    #[error("Render {} did not appear on disk in time", .0.display())]
    RenderTimeout(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Axis aligned box in world coordinates
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn from_point(point: [f64; 3]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Grow the box to contain `point`
    pub fn include(&mut self, point: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Static summary of a scene, sent to the model as json
pub struct SceneInfo {
    /// Number of mesh objects
    pub object_count: usize,
    /// Total vertices over all mesh objects
    pub vertex_count: usize,
    /// Box around every mesh object, absent when the scene has no meshes
    pub bounding_box: Option<BoundingBox>,
    pub cameras: Vec<String>,
    pub scene_units: String,
}

/// Queries a host 3D application answers about its loaded scene
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Every object as an indented hierarchical list
    fn object_hierarchy(&self) -> String;

    fn static_info(&self) -> SceneInfo;

    /// Render the scene from `camera` into `filename` and wait until the image
    /// exists on disk. Returns the path actually written.
    async fn render_image(&self, filename: &str, camera: &str) -> SceneResult<PathBuf>;
}
