//! Natural language description of a whole scene.
//!
//! A vision agent describes renders taken from the scene's cameras, then a text
//! agent summarises the static scene data together with those descriptions.
use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{SceneError, SceneHost, SceneInfo};
use crate::agent::{Agent, AgentConfig};
use crate::errors::AgentError;
use crate::prompt_template::{
    load_embedded_prompt, render_description_prompt, render_description_system_prompt,
    scene_description_system_prompt,
};
use crate::providers::base::Provider;

pub const DEFAULT_MAX_CAMERAS: usize = 4;

#[derive(Error, Debug)]
pub enum DescribeError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),

    #[error("Failed to serialize scene summary: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DescribeResult<T> = Result<T, DescribeError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraDescription {
    pub camera: String,
    pub render: PathBuf,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneDescription {
    pub hierarchy: String,
    pub info: SceneInfo,
    pub camera_descriptions: Vec<CameraDescription>,
    pub summary: String,
}

/// Agent that describes single renders, with no response template
pub fn vision_agent(provider: Box<dyn Provider>) -> DescribeResult<Agent> {
    Ok(Agent::new(
        provider,
        AgentConfig::new(render_description_system_prompt()?),
    ))
}

/// Agent that writes the final scene description
pub fn narrator_agent(provider: Box<dyn Provider>) -> DescribeResult<Agent> {
    Ok(Agent::new(
        provider,
        AgentConfig::new(scene_description_system_prompt()?),
    ))
}

pub struct SceneDescriber {
    vision: Agent,
    narrator: Agent,
    max_cameras: usize,
    render_dir: PathBuf,
}

impl SceneDescriber {
    pub fn new(vision: Agent, narrator: Agent, render_dir: impl Into<PathBuf>) -> Self {
        Self {
            vision,
            narrator,
            max_cameras: DEFAULT_MAX_CAMERAS,
            render_dir: render_dir.into(),
        }
    }

    pub fn with_max_cameras(mut self, max_cameras: usize) -> Self {
        self.max_cameras = max_cameras;
        self
    }

    pub async fn describe(&mut self, host: &dyn SceneHost) -> DescribeResult<SceneDescription> {
        let hierarchy = host.object_hierarchy();
        let info = host.static_info();

        let mut camera_descriptions = Vec::new();
        for camera in info.cameras.iter().take(self.max_cameras) {
            camera_descriptions.push(self.describe_camera(host, camera).await?);
        }

        let prompt = load_embedded_prompt(
            "scene_summary.md",
            &json!({
                "scene_info": serde_json::to_string_pretty(&info)?,
                "hierarchy": hierarchy,
                "renders": camera_descriptions,
            }),
        )?;
        let summary = self.narrator.inference(&prompt, None).await;
        self.narrator.reset();
        let summary = summary?.output.into_text();

        Ok(SceneDescription {
            hierarchy,
            info,
            camera_descriptions,
            summary,
        })
    }

    async fn describe_camera(
        &mut self,
        host: &dyn SceneHost,
        camera: &str,
    ) -> DescribeResult<CameraDescription> {
        let filename = self.render_dir.join(Uuid::new_v4().to_string());
        let render = host
            .render_image(&filename.to_string_lossy(), camera)
            .await?;
        info!("Describing render of camera {}", camera);

        // Each render is described on its own, without the earlier ones in context
        let inference = self
            .vision
            .inference(&render_description_prompt(camera)?, Some(&render))
            .await;
        self.vision.reset();

        Ok(CameraDescription {
            camera: camera.to_string(),
            render,
            description: inference?.output.into_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use crate::providers::mock::{MockProvider, MockResponse};
    use crate::scene::graph::{ObjectKind, SceneGraph, SceneObject};
    use crate::scene::SceneResult;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeHost {
        graph: SceneGraph,
        rendered: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn with_cameras(count: usize) -> Self {
            let mut objects = vec![SceneObject::new("Cube", ObjectKind::Mesh)
                .with_mesh(8, vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]])];
            for index in 0..count {
                objects.push(SceneObject::new(format!("Camera.{:03}", index), ObjectKind::Camera));
            }
            Self {
                graph: SceneGraph::new("METRIC", objects),
                rendered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SceneHost for FakeHost {
        fn object_hierarchy(&self) -> String {
            self.graph.hierarchy()
        }

        fn static_info(&self) -> SceneInfo {
            self.graph.static_info()
        }

        async fn render_image(&self, filename: &str, camera: &str) -> SceneResult<PathBuf> {
            if !self.graph.has_camera(camera) {
                return Err(SceneError::CameraNotFound(camera.to_string()));
            }
            let path = Path::new(filename).with_extension("jpg");
            std::fs::write(&path, b"jpeg")?;
            self.rendered.lock().unwrap().push(camera.to_string());
            Ok(path)
        }
    }

    fn describer(vision: &MockProvider, narrator: &MockProvider, dir: &Path) -> SceneDescriber {
        SceneDescriber::new(
            vision_agent(Box::new(vision.clone())).unwrap(),
            narrator_agent(Box::new(narrator.clone())).unwrap(),
            dir,
        )
    }

    #[tokio::test]
    async fn test_describe_scene() {
        let dir = tempdir().unwrap();
        let host = FakeHost::with_cameras(2);
        let vision = MockProvider::new(vec!["A grey cube", "The cube from above"]);
        let narrator = MockProvider::new(vec!["A single cube in an empty room"]);

        let description = describer(&vision, &narrator, dir.path())
            .describe(&host)
            .await
            .unwrap();

        assert_eq!(description.summary, "A single cube in an empty room");
        assert_eq!(description.hierarchy, "-Cube\n-Camera.000\n-Camera.001\n");
        assert_eq!(description.camera_descriptions.len(), 2);
        assert_eq!(description.camera_descriptions[1].camera, "Camera.001");
        assert_eq!(description.camera_descriptions[1].description, "The cube from above");
        assert!(description.camera_descriptions[0].render.starts_with(dir.path()));

        // Vision conversation is cleared between cameras
        let calls = vision.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].len(), 2);
        assert_eq!(calls[1][1].role, Role::User);
        assert!(calls[1][1].has_images());
        assert!(calls[1][1].content.contains("Camera.001"));

        let narrator_calls = narrator.calls();
        let prompt = &narrator_calls[0][1].content;
        assert!(prompt.contains("\"vertex_count\": 8"));
        assert!(prompt.contains("- Camera.000: A grey cube"));
    }

    #[tokio::test]
    async fn test_camera_limit() {
        let dir = tempdir().unwrap();
        let host = FakeHost::with_cameras(6);
        let vision = MockProvider::new(vec!["view"; 6]);
        let narrator = MockProvider::new(vec!["summary"]);

        let description = describer(&vision, &narrator, dir.path())
            .describe(&host)
            .await
            .unwrap();

        assert_eq!(description.camera_descriptions.len(), DEFAULT_MAX_CAMERAS);
        assert_eq!(host.rendered.lock().unwrap().len(), DEFAULT_MAX_CAMERAS);
        assert_eq!(description.info.cameras.len(), 6);
    }

    #[tokio::test]
    async fn test_scene_without_cameras() {
        let dir = tempdir().unwrap();
        let host = FakeHost::with_cameras(0);
        let vision = MockProvider::default();
        let narrator = MockProvider::new(vec!["summary"]);

        let description = describer(&vision, &narrator, dir.path())
            .with_max_cameras(2)
            .describe(&host)
            .await
            .unwrap();

        assert!(description.camera_descriptions.is_empty());
        assert_eq!(vision.call_count(), 0);
        assert_eq!(description.summary, "summary");
    }

    #[tokio::test]
    async fn test_vision_failure_surfaces() {
        let dir = tempdir().unwrap();
        let host = FakeHost::with_cameras(1);
        let vision = MockProvider::with_responses(vec![MockResponse::Failure(
            "service unavailable".to_string(),
        )]);
        let narrator = MockProvider::new(vec!["summary"]);

        let result = describer(&vision, &narrator, dir.path()).describe(&host).await;
        assert!(matches!(
            result,
            Err(DescribeError::Agent(AgentError::Service(_)))
        ));
        assert_eq!(narrator.call_count(), 0);
    }
}
