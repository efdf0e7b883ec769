use anyhow::{Context, Result};
use cliclack::input;
use std::path::PathBuf;

use scenecraft::agent::{Agent, AgentConfig};
use scenecraft::models::response::CommandResponse;
use scenecraft::prompt_template::command_system_prompt;
use scenecraft::scene::blender::BlenderHost;
use tracing::info;

use crate::commands::describe::build_describer;
use crate::configuration::Settings;
use crate::prompt::cliclack::CliclackPrompt;
use crate::session::session_file::{ensure_session_dir, session_path};
use crate::session::{SceneContext, Session};

pub async fn build_session<'a>(
    scene: Option<PathBuf>,
    session_name: Option<String>,
) -> Result<Session<'a>> {
    let settings = Settings::new().context("Failed to load configuration")?;
    info!("Using {:?} provider", settings.provider.provider_type());

    let session_name = match session_name {
        Some(name) => name,
        None => input("Session name:").placeholder("").interact()?,
    };
    let session_file = session_path(&ensure_session_dir()?, &session_name);

    let template = CommandResponse::template();
    let config = AgentConfig::new(command_system_prompt(&template)?)
        .with_template(template)
        .with_retry_budget(settings.agent.retry_budget);
    let agent = Agent::from_config(settings.provider_config(), config)?;

    let session = Session::new(agent, Box::new(CliclackPrompt::new()), session_file);
    match scene {
        Some(scene_file) => {
            let host = BlenderHost::open(&scene_file, settings.blender.host_settings())
                .await
                .with_context(|| format!("Failed to open scene {}", scene_file.display()))?;
            let describer = build_describer(&settings)?;
            Ok(session.with_scene(SceneContext::new(Box::new(host), describer)))
        }
        None => Ok(session),
    }
}
