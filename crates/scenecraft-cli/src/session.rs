use anyhow::Result;
use std::path::PathBuf;

use scenecraft::agent::Agent;
use scenecraft::models::response::{CommandResponse, ResponseType};
use scenecraft::scanner::scan;
use scenecraft::scene::describe::SceneDescriber;
use scenecraft::scene::SceneHost;
use tracing::{debug, warn};

use crate::prompt::{InputType, Prompt};

pub mod session_file;

/// Scene requests answered automatically before control returns to the user
const MAX_SCENE_REQUESTS: usize = 3;

const NO_SCENE_LOADED: &str =
    "No scene is loaded, so scene information is not available. Answer with code or fail.";

pub struct SceneContext {
    host: Box<dyn SceneHost>,
    describer: SceneDescriber,
    description: Option<String>,
}

impl SceneContext {
    pub fn new(host: Box<dyn SceneHost>, describer: SceneDescriber) -> Self {
        Self {
            host,
            describer,
            description: None,
        }
    }

    fn objects_list(&self) -> String {
        format!(
            "Objects hierarchy of the loaded scene:\n{}",
            self.host.object_hierarchy()
        )
    }

    // Rendering every camera is slow, so the description is computed once
    async fn scene_description(&mut self) -> String {
        if self.description.is_none() {
            match self.describer.describe(self.host.as_ref()).await {
                Ok(description) => self.description = Some(description.summary),
                Err(e) => {
                    warn!("Scene description failed: {}", e);
                    return format!("The scene description could not be produced: {}", e);
                }
            }
        }
        format!(
            "Description of the loaded scene:\n{}",
            self.description.as_deref().unwrap_or_default()
        )
    }
}

pub struct Session<'a> {
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
    scene: Option<SceneContext>,
    session_file: PathBuf,
}

impl<'a> Session<'a> {
    pub fn new(agent: Agent, prompt: Box<impl Prompt + 'a>, session_file: PathBuf) -> Self {
        Session {
            agent,
            prompt,
            scene: None,
            session_file,
        }
    }

    pub fn with_scene(mut self, scene: SceneContext) -> Self {
        self.scene = Some(scene);
        self
    }

    pub async fn start(&mut self) -> Result<()> {
        self.setup_session();

        loop {
            let input = self.prompt.get_input()?;
            let content = match input.input_type {
                InputType::Message => match input.content {
                    Some(content) => content,
                    None => continue,
                },
                InputType::Exit => break,
                InputType::AskAgain => continue,
            };

            self.process_request(&content).await;
        }

        self.close_session();
        Ok(())
    }

    /// Run one user request, answering scene requests of the model until it
    /// produces code or gives up
    async fn process_request(&mut self, request: &str) {
        let mut next = request.to_string();

        for _ in 0..=MAX_SCENE_REQUESTS {
            self.prompt.show_busy();
            let result = self.agent.inference(&next, None).await;
            self.persist();

            let response = match result {
                Ok(inference) => inference
                    .output
                    .into_structured()
                    .map(CommandResponse::from_result),
                Err(e) => {
                    self.prompt.hide_busy();
                    self.prompt.render(&format!("**Error:** {}", e));
                    return;
                }
            };
            let response = match response {
                Some(Ok(response)) => response,
                _ => {
                    self.prompt.hide_busy();
                    self.prompt.render("**Error:** the reply was not a command response");
                    return;
                }
            };
            debug!(kind = %response.kind, "command response");

            next = match response.kind {
                ResponseType::Code => {
                    self.prompt.hide_busy();
                    if !response.message.is_empty() {
                        self.prompt.render(&response.message);
                    }
                    let findings = scan(&response.content);
                    self.prompt.render_code(&response.content, &findings);
                    return;
                }
                ResponseType::Fail => {
                    self.prompt.hide_busy();
                    self.prompt.render(&format!("**Failed:** {}", response.message));
                    return;
                }
                ResponseType::RequestObjectsList => match &self.scene {
                    Some(scene) => scene.objects_list(),
                    None => NO_SCENE_LOADED.to_string(),
                },
                ResponseType::RequestSceneDescription => match self.scene.as_mut() {
                    Some(scene) => scene.scene_description().await,
                    None => NO_SCENE_LOADED.to_string(),
                },
            };
            self.prompt.hide_busy();
        }

        self.prompt.render(&format!(
            "**Stopped:** the model kept requesting scene information after {} answers",
            MAX_SCENE_REQUESTS
        ));
    }

    fn persist(&mut self) {
        if let Err(e) = self.agent.persist_conversation(&self.session_file) {
            self.prompt
                .render(&format!("Failed to persist conversation: {}", e));
        }
    }

    fn setup_session(&mut self) {
        self.prompt.render(&format!(
            "Starting session. Recording to {}",
            self.session_file.display()
        ));
        if self.scene.is_none() {
            self.prompt
                .render("No scene loaded. Scene requests from the model will not be answered.");
        }
        self.prompt.ready();
    }

    fn close_session(&mut self) {
        self.prompt.render(&format!(
            "Closing session. Recorded to {}",
            self.session_file.display()
        ));
        self.prompt.close();
    }
}
