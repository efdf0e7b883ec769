use std::io::{self, Write};

use anyhow::{anyhow, Result};
use bat::WrappingMode;
use cliclack::{input, spinner};
use console::style;
use scenecraft::scanner::{report, Finding};

use super::{Input, InputType, Prompt, Theme};

pub struct CliclackPrompt {
    spinner: cliclack::ProgressBar,
    input_mode: InputMode,
    theme: Theme,
}

enum InputMode {
    Singleline,
    Multiline,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: spinner(),
            input_mode: InputMode::Singleline,
            theme: Theme::Dark,
        }
    }

    fn theme_name(&self) -> &'static str {
        match self.theme {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

fn print_code(content: &str, theme: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()).name("Generated code"))
        .theme(theme)
        .language("Python")
        .grid(true)
        .header(true)
        .line_numbers(true)
        .wrapping_mode(WrappingMode::Character)
        .print()
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

fn print(content: &str, theme: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

fn print_newline() {
    println!();
}

impl Prompt for CliclackPrompt {
    fn render(&mut self, text: &str) {
        if let Err(e) = print(text, self.theme_name()) {
            eprintln!("Failed to render output: {}", e);
        }
        print_newline();
        let _ = io::stdout().flush();
    }

    fn render_code(&mut self, code: &str, findings: &[Finding]) {
        if let Err(e) = print_code(code, self.theme_name()) {
            eprintln!("Failed to render code: {}", e);
        }
        match report(findings) {
            Some(report) => {
                println!("{}", style("Code safety check flagged:").yellow().bold());
                println!("{}", style(report).yellow());
            }
            None => println!("{}", style("Code safety check passed").green()),
        }
        print_newline();
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        self.spinner = spinner();
        self.spinner.start("awaiting reply");
    }

    fn hide_busy(&mut self) {
        self.spinner.stop("");
    }

    fn get_input(&mut self) -> Result<Input> {
        let mut input = input("Scenecraft:         [Help: /?]").placeholder("");
        match self.input_mode {
            InputMode::Multiline => input = input.multiline(),
            InputMode::Singleline => (),
        }
        let message_text: String = input.interact()?;
        let message_text = message_text.trim();

        if message_text.eq_ignore_ascii_case("/exit") || message_text.eq_ignore_ascii_case("/quit")
        {
            Ok(Input::exit())
        } else if message_text.eq_ignore_ascii_case("/m") {
            self.input_mode = InputMode::Multiline;
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/s") {
            self.input_mode = InputMode::Singleline;
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/?") {
            println!("Commands:");
            println!("/exit - Exit the session");
            println!("/m - Switch to multiline input mode");
            println!("/s - Switch to singleline input mode");
            println!("/t - Toggle Light/Dark theme");
            println!("/? - Display this help message");
            Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            })
        } else if message_text.is_empty() {
            Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            })
        } else {
            Ok(Input::message(message_text))
        }
    }

    fn close(&self) {
        // No cleanup required
    }
}
