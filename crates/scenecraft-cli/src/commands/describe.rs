use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use scenecraft::providers::factory::get_provider;
use scenecraft::scene::blender::BlenderHost;
use scenecraft::scene::describe::{narrator_agent, vision_agent, SceneDescriber, SceneDescription};

use crate::configuration::Settings;
use crate::session::session_file::ensure_render_dir;

pub fn build_describer(settings: &Settings) -> Result<SceneDescriber> {
    let provider = settings.provider_config();
    let vision = vision_agent(get_provider(provider.clone())?)?;
    let narrator = narrator_agent(get_provider(provider)?)?;
    Ok(SceneDescriber::new(vision, narrator, ensure_render_dir()?)
        .with_max_cameras(settings.blender.max_cameras))
}

pub async fn describe_scene(file: &Path) -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;
    let host = BlenderHost::open(file, settings.blender.host_settings()).await?;
    let mut describer = build_describer(&settings)?;

    let spin = cliclack::spinner();
    spin.start("describing scene");
    let description = describer.describe(&host).await;
    spin.stop("");

    print_description(&description?)
}

fn print_description(description: &SceneDescription) -> Result<()> {
    println!("{}", style("Objects").bold());
    print!("{}", description.hierarchy);
    println!();

    println!("{}", style("Scene summary").bold());
    println!("{}", serde_json::to_string_pretty(&description.info)?);
    println!();

    for camera in &description.camera_descriptions {
        println!(
            "{} {}",
            style(format!("Camera {}", camera.camera)).bold(),
            style(camera.render.display()).dim()
        );
        println!("{}", camera.description);
        println!();
    }

    println!("{}", style("Description").bold());
    println!("{}", description.summary);
    Ok(())
}
