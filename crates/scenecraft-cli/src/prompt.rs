use anyhow::Result;
use scenecraft::scanner::Finding;

pub mod cliclack;

pub trait Prompt {
    /// Show plain text, rendered as markdown
    fn render(&mut self, text: &str);
    /// Show generated code along with whatever the scanner found in it
    fn render_code(&mut self, code: &str, findings: &[Finding]);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
    fn ready(&self) {
        println!("\n");
        println!("Scenecraft is running! Describe what you want to build in the scene.");
        println!("\n");
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Optional content as sometimes the user may be issuing a command eg. (Exit)
}

impl Input {
    pub fn message<S: Into<String>>(content: S) -> Self {
        Self {
            input_type: InputType::Message,
            content: Some(content.into()),
        }
    }

    pub fn exit() -> Self {
        Self {
            input_type: InputType::Exit,
            content: None,
        }
    }
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}
