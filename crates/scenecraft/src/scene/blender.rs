use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::graph::SceneGraph;
use super::{SceneError, SceneHost, SceneInfo, SceneResult};

const EXPORT_SCRIPT: &str = include_str!("scripts/export_scene.py");
const RENDER_SCRIPT: &str = include_str!("scripts/render_image.py");

/// Prefix of the stdout line carrying the exported scene
const SCENE_JSON_MARKER: &str = "SCENECRAFT_SCENE_JSON:";

pub const DEFAULT_BLENDER_BINARY: &str = "blender";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct BlenderSettings {
    pub binary: PathBuf,
    /// How often to check whether a render has reached the disk
    pub poll_interval: Duration,
    /// Give up waiting for a render after this long. `None` waits forever.
    pub render_timeout: Option<Duration>,
}

impl Default for BlenderSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BLENDER_BINARY),
            poll_interval: DEFAULT_POLL_INTERVAL,
            render_timeout: None,
        }
    }
}

/// A scene file loaded through a background Blender process
///
/// The object graph is exported once when the scene is opened; renders start a
/// fresh Blender process on the same file.
#[derive(Debug)]
pub struct BlenderHost {
    scene_file: PathBuf,
    graph: SceneGraph,
    settings: BlenderSettings,
}

impl BlenderHost {
    pub async fn open(scene_file: impl AsRef<Path>, settings: BlenderSettings) -> SceneResult<Self> {
        let scene_file = scene_file.as_ref().to_path_buf();
        if !scene_file.is_file() {
            return Err(SceneError::NotFound {
                path: scene_file,
                reason: "file does not exist".to_string(),
            });
        }

        info!("Loading scene {}", scene_file.display());
        let output = run_blender(&settings.binary, &scene_file, EXPORT_SCRIPT, &[])
            .await
            .map_err(|err| SceneError::NotFound {
                path: scene_file.clone(),
                reason: err.to_string(),
            })?;

        let graph = parse_export(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            SceneError::NotFound {
                path: scene_file.clone(),
                reason,
            }
        })?;
        info!(
            "Loaded scene {} with {} objects",
            scene_file.display(),
            graph.objects.len()
        );

        Ok(Self::with_graph(scene_file, graph, settings))
    }

    /// Wrap an already exported graph
    pub fn with_graph(scene_file: PathBuf, graph: SceneGraph, settings: BlenderSettings) -> Self {
        Self {
            scene_file,
            graph,
            settings,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    async fn wait_for(&self, path: &Path) -> SceneResult<()> {
        let started = Instant::now();
        while !path.exists() {
            if let Some(timeout) = self.settings.render_timeout {
                if started.elapsed() >= timeout {
                    return Err(SceneError::RenderTimeout(path.to_path_buf()));
                }
            }
            debug!("Waiting for render {}", path.display());
            sleep(self.settings.poll_interval).await;
        }
        Ok(())
    }
}

#[async_trait]
impl SceneHost for BlenderHost {
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

        let mut output = render_path(filename);
        if output.is_relative() {
            output = std::env::current_dir()?.join(output);
        }
        info!("Rendering camera {} to {}", camera, output.display());

        let target = output.to_string_lossy().into_owned();
        let process = run_blender(
            &self.settings.binary,
            &self.scene_file,
            RENDER_SCRIPT,
            &[target.as_str(), camera],
        )
        .await?;

        // A traceback without an output file is a failed render even on a zero exit
        if !output.exists() {
            if let Some(error) = script_error(&process) {
                return Err(SceneError::HostFailure(error));
            }
        }

        self.wait_for(&output).await?;
        Ok(output)
    }
}

/// Renders are always written as jpeg. The suffix is appended, not swapped,
/// so `shot.v2` and `shot.v3` stay distinct.
fn render_path(filename: &str) -> PathBuf {
    let path = PathBuf::from(filename);
    let is_jpg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
    if is_jpg {
        return path;
    }
    let mut appended = path.into_os_string();
    appended.push(".jpg");
    PathBuf::from(appended)
}

async fn run_blender(
    binary: &Path,
    scene_file: &Path,
    script: &str,
    args: &[&str],
) -> SceneResult<Output> {
    let mut command = Command::new(binary);
    command
        .arg("--background")
        .arg(scene_file)
        .arg("--python-exit-code")
        .arg("1")
        .arg("--python-expr")
        .arg(script);
    if !args.is_empty() {
        command.arg("--").args(args);
    }

    let output = command
        .output()
        .await
        .map_err(|e| SceneError::HostFailure(format!("Failed to start {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SceneError::HostFailure(stderr.trim().to_string()));
    }
    Ok(output)
}

/// The python error Blender printed, if the script raised
fn script_error(output: &Output) -> Option<String> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find("Traceback (most recent call last)")?;
    Some(stderr[start..].trim().to_string())
}

fn parse_export(stdout: &str) -> Result<SceneGraph, String> {
    let payload = stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(SCENE_JSON_MARKER))
        .ok_or_else(|| "Blender did not export the scene".to_string())?;
    serde_json::from_str(payload).map_err(|e| format!("Invalid scene export: {}", e))
}
