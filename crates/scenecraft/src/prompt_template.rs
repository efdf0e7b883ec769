// prompt_template.rs

use serde::Serialize;
use serde_json::json;
use tera::{Context, Error as TeraError, Tera};

use crate::template::ResponseTemplate;

pub const HOST_NAME: &str = "Blender 3D";

/// Modules the generated code may rely on without importing them
pub const PREIMPORTED_MODULES: &[&str] = &["bpy", "mathutils", "math", "random", "numpy", "datetime"];

/// Prompts shipped with the crate, looked up by file name
const EMBEDDED_PROMPTS: &[(&str, &str)] = &[
    ("command_system.md", include_str!("prompts/command_system.md")),
    (
        "scene_description_system.md",
        include_str!("prompts/scene_description_system.md"),
    ),
    (
        "render_description_system.md",
        include_str!("prompts/render_description_system.md"),
    ),
    ("render_description.md", include_str!("prompts/render_description.md")),
    ("scene_summary.md", include_str!("prompts/scene_summary.md")),
];

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render one of the prompts embedded in the crate
pub fn load_embedded_prompt<T: Serialize>(name: &str, context_data: &T) -> Result<String, TeraError> {
    let template = EMBEDDED_PROMPTS
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, content)| *content)
        .ok_or_else(|| TeraError::msg(format!("Unknown prompt template: {}", name)))?;
    load_prompt(template, context_data)
}

/// System prompt of the command agent, embedding the shape it must answer with
pub fn command_system_prompt(template: &ResponseTemplate) -> Result<String, TeraError> {
    load_embedded_prompt(
        "command_system.md",
        &json!({
            "response_shape": template.describe(),
            "host_name": HOST_NAME,
            "allowed_modules": PREIMPORTED_MODULES,
        }),
    )
}

pub fn scene_description_system_prompt() -> Result<String, TeraError> {
    load_embedded_prompt("scene_description_system.md", &json!({ "host_name": HOST_NAME }))
}

pub fn render_description_system_prompt() -> Result<String, TeraError> {
    load_embedded_prompt("render_description_system.md", &json!({}))
}

pub fn render_description_prompt(camera: &str) -> Result<String, TeraError> {
    load_embedded_prompt("render_description.md", &json!({ "camera": camera }))
}
