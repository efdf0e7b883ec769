//! The ordered message log replayed to the completion service on every call.
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::message::Message;
use crate::models::role::Role;

/// An append-only conversation that always starts with its system prompt
#[derive(Debug, Clone)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new<S: Into<String>>(system_prompt: S) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![Message::system(system_prompt.clone())],
            system_prompt,
        }
    }

    /// Add a text message to the end of the conversation
    pub fn append<S: Into<String>>(&mut self, role: Role, content: S) -> &Message {
        self.push(Message::new(role, content))
    }

    /// Add a prepared message (e.g. one carrying image attachments)
    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Truncate back to the initial system message
    pub fn reset(&mut self) {
        self.messages.truncate(1);
        self.messages[0] = Message::system(self.system_prompt.clone());
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// An owned copy of every message, for persistence or audit
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Write the conversation as a pretty printed JSON array of role/content
    /// objects. The `.json` suffix is added when missing.
    pub fn persist(&self, target: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = json_path(target.as_ref());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &self.messages)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(path)
    }
}

/// Read a persisted conversation back as its ordered messages
pub fn load_messages(path: impl AsRef<Path>) -> io::Result<Vec<Message>> {
    let reader = BufReader::new(File::open(json_path(path.as_ref()))?);
    Ok(serde_json::from_reader(reader)?)
}

/// Normalize a caller supplied name so it always ends in exactly one `.json`
pub fn json_path(target: &Path) -> PathBuf {
    let name = target.to_string_lossy();
    let stem = name.strip_suffix(".json").unwrap_or(&name);
    PathBuf::from(format!("{}.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_conversation_holds_only_system_prompt() {
        let conversation = Conversation::new("you are a 3d assistant");
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0], Message::system("you are a 3d assistant"));
    }

    #[test]
    fn test_append_keeps_order() {
        let mut conversation = Conversation::new("sys");
        conversation.append(Role::User, "first");
        conversation.append(Role::Assistant, "second");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conversation.last().unwrap().content, "second");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut conversation = Conversation::new("sys");
        conversation.append(Role::User, "hello");
        conversation.append(Role::Assistant, "hi");

        conversation.reset();
        let once = conversation.snapshot();
        conversation.reset();
        let twice = conversation.snapshot();

        assert_eq!(once, vec![Message::system("sys")]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut conversation = Conversation::new("sys");
        let snapshot = conversation.snapshot();
        conversation.append(Role::User, "later");
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_json_path_normalization() {
        assert_eq!(json_path(Path::new("log")), PathBuf::from("log.json"));
        assert_eq!(json_path(Path::new("log.json")), PathBuf::from("log.json"));
        assert_eq!(
            json_path(Path::new("runs/v1.2/log")),
            PathBuf::from("runs/v1.2/log.json")
        );
    }

    #[test]
    fn test_persist_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut conversation = Conversation::new("sys");
        conversation.append(Role::User, "make a cube");
        conversation.append(Role::Assistant, "{\"type\": \"code\"}");

        let written = conversation.persist(dir.path().join("session"))?;
        assert_eq!(written, dir.path().join("session.json"));

        let restored = load_messages(dir.path().join("session.json"))?;
        assert_eq!(restored, conversation.snapshot());
        Ok(())
    }

    #[test]
    fn test_persist_uses_two_space_indent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let conversation = Conversation::new("sys");
        let written = conversation.persist(dir.path().join("indent.json"))?;

        let text = fs::read_to_string(written)?;
        assert!(text.starts_with("[\n  {\n    \"role\": \"system\""));
        Ok(())
    }
}
