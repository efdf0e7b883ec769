use std::path::{Path, PathBuf};

use anyhow::Result;
use indoc::indoc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::{ImageContent, Message};
use crate::models::role::Role;
use crate::providers::base::Provider;
use crate::providers::configs::ProviderConfig;
use crate::providers::factory::get_provider;
use crate::template::{ResponseTemplate, ValidatedResult};

pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Sent when the last reply could not be parsed as JSON
pub const JSON_NOT_PARSABLE: &str = indoc! {"
    Your last response could not be parsed as json.
    Respond again with only the json object described in your instructions,
    without code block symbols or any text around it.
"};

/// Sent when the last reply was JSON but had the wrong shape
pub const JSON_NOT_CONFORMING_TO_TEMPLATE: &str = indoc! {"
    Your last response was valid json but did not match the required template.
    Respond again using exactly the keys from your instructions, no more and no less,
    and only the allowed values for each key.
"};

/// Everything that configures an agent apart from its provider
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// When set, replies must be JSON objects conforming to this template
    pub response_template: Option<ResponseTemplate>,
    /// Corrective rounds allowed per inference call
    pub retry_budget: u32,
}

impl AgentConfig {
    pub fn new<S: Into<String>>(system_prompt: S) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            response_template: None,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_template(mut self, template: ResponseTemplate) -> Self {
        self.response_template = Some(template);
        self
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Free-form text, returned when no template is configured
    Raw(String),
    Structured(ValidatedResult),
}

impl Output {
    /// The reply as text, structured results rendered back to JSON
    pub fn into_text(self) -> String {
        match self {
            Output::Raw(text) => text,
            Output::Structured(result) => Value::Object(result.into_inner()).to_string(),
        }
    }

    pub fn into_structured(self) -> Option<ValidatedResult> {
        match self {
            Output::Structured(result) => Some(result),
            Output::Raw(_) => None,
        }
    }
}

/// The result of one inference call along with the conversation that produced it
#[derive(Debug, Clone)]
pub struct Inference {
    pub output: Output,
    pub conversation: Vec<Message>,
}

enum Verdict {
    Conforming(ValidatedResult),
    Unparsable,
    NonConforming,
}

fn judge(template: &ResponseTemplate, raw: &str) -> Verdict {
    match serde_json::from_str::<Value>(raw) {
        Err(_) => Verdict::Unparsable,
        Ok(Value::Object(candidate)) => match ValidatedResult::check(template, candidate) {
            Ok(result) => Verdict::Conforming(result),
            Err(_) => Verdict::NonConforming,
        },
        Ok(_) => Verdict::NonConforming,
    }
}

/// Agent drives a completion provider through a conversation, correcting
/// structured replies that do not match its template
///
/// One agent owns one conversation; `inference` takes `&mut self` so there is
/// never more than one call in flight per agent.
pub struct Agent {
    provider: Box<dyn Provider>,
    config: AgentConfig,
    conversation: Conversation,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Box<dyn Provider>, config: AgentConfig) -> Self {
        info!("Creating new agent for model: {}", provider.model());
        let conversation = Conversation::new(config.system_prompt.clone());
        Self {
            provider,
            config,
            conversation,
        }
    }

    /// Create an Agent, building its provider from configuration
    pub fn from_config(provider_config: ProviderConfig, config: AgentConfig) -> Result<Self> {
        Ok(Self::new(get_provider(provider_config)?, config))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send `prompt`, optionally with an image, and return the reply
    ///
    /// Without a template the reply text is returned as is. With a template the
    /// reply must parse as a conforming JSON object; otherwise a corrective
    /// system message is appended and the provider asked again, at most
    /// `retry_budget` times. On exhaustion the conversation is left as it is so
    /// the failed exchange can be inspected.
    pub async fn inference(&mut self, prompt: &str, image: Option<&Path>) -> AgentResult<Inference> {
        info!("Agent inference with prompt: {}", prompt);

        let mut message = Message::user(prompt);
        if let Some(path) = image {
            let attachment = ImageContent::from_path(path).map_err(|source| AgentError::Attachment {
                path: path.to_path_buf(),
                source,
            })?;
            message = message.with_image(attachment);
        }
        self.conversation.push(message);

        let mut raw = self.complete_turn().await?;

        let Some(template) = self.config.response_template.clone() else {
            return Ok(self.finish(Output::Raw(raw)));
        };

        let budget = self.config.retry_budget;
        let mut attempts = 0;
        loop {
            let corrective = match judge(&template, &raw) {
                Verdict::Conforming(result) => return Ok(self.finish(Output::Structured(result))),
                Verdict::Unparsable => {
                    warn!(
                        "LLM response not parsable as json, attempting to fix this prompt {}/{} times",
                        attempts + 1,
                        budget
                    );
                    JSON_NOT_PARSABLE
                }
                Verdict::NonConforming => {
                    warn!(
                        "LLM response was parsable as json but didn't conform to the template, attempting to fix this prompt {}/{} times",
                        attempts + 1,
                        budget
                    );
                    JSON_NOT_CONFORMING_TO_TEMPLATE
                }
            };

            if attempts >= budget {
                error!(
                    "LLM was not able to create the requested json template within {} corrective attempts",
                    attempts
                );
                return Err(AgentError::StructuredOutputExhausted { attempts });
            }

            attempts += 1;
            self.conversation.append(Role::System, corrective);
            raw = self.complete_turn().await?;
        }
    }

    /// Clear the conversation back to the system prompt
    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    /// Write the conversation to `target`, adding a `.json` suffix when missing
    pub fn persist_conversation(&self, target: impl AsRef<Path>) -> AgentResult<PathBuf> {
        let path = self.conversation.persist(target)?;
        debug!("Conversation persisted to {}", path.display());
        Ok(path)
    }

    async fn complete_turn(&mut self) -> AgentResult<String> {
        let (reply, usage) = self
            .provider
            .complete(self.conversation.messages())
            .await
            .map_err(AgentError::Service)?;
        debug!(?usage, "completion received");

        self.conversation.append(Role::Assistant, reply.content.clone());
        Ok(reply.content)
    }

    fn finish(&self, output: Output) -> Inference {
        Inference {
            output,
            conversation: self.conversation.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response::{CommandResponse, ResponseType};
    use crate::providers::mock::{MockProvider, MockResponse};
    use crate::template::ValueKind;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    const FAIL_REPLY: &str =
        r#"{"type": "fail", "content": "", "message": "cannot divide by zero"}"#;

    fn command_agent(provider: &MockProvider, budget: u32) -> Agent {
        let config = AgentConfig::new("system")
            .with_template(CommandResponse::template())
            .with_retry_budget(budget);
        Agent::new(Box::new(provider.clone()), config)
    }

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn test_free_form_returns_raw_text() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["A cube on a plane."]);
        let mut agent = Agent::new(Box::new(provider.clone()), AgentConfig::new("describe"));

        let inference = agent.inference("what is here?", None).await?;
        assert_eq!(inference.output, Output::Raw("A cube on a plane.".to_string()));
        assert_eq!(
            roles(&inference.conversation),
            vec![Role::System, Role::User, Role::Assistant]
        );
        assert_eq!(provider.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_conforming_reply_is_returned_without_retry() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![FAIL_REPLY]);
        let mut agent = command_agent(&provider, 3);

        let inference = agent.inference("divide by zero", None).await?;
        let response = CommandResponse::from_result(inference.output.into_structured().unwrap())?;
        assert_eq!(response.kind, ResponseType::Fail);
        assert_eq!(response.message, "cannot divide by zero");
        assert_eq!(provider.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_field_triggers_one_retry() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![
            r#"{"type": "fail", "message": "cannot divide by zero"}"#,
            FAIL_REPLY,
        ]);
        let mut agent = command_agent(&provider, 3);

        let inference = agent.inference("divide by zero", None).await?;
        assert!(matches!(inference.output, Output::Structured(_)));
        assert_eq!(provider.call_count(), 2);

        let messages = agent.conversation().messages();
        assert_eq!(
            roles(messages),
            vec![Role::System, Role::User, Role::Assistant, Role::System, Role::Assistant]
        );
        assert_eq!(messages[3].content, JSON_NOT_CONFORMING_TO_TEMPLATE);
        Ok(())
    }

    #[tokio::test]
    async fn test_recovers_on_third_call() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["not json", "still not json", FAIL_REPLY]);
        let mut agent = command_agent(&provider, 3);

        let inference = agent.inference("divide by zero", None).await?;
        let result = inference.output.into_structured().unwrap();
        assert_eq!(result.get_str("type"), Some("fail"));
        assert_eq!(provider.call_count(), 3);

        let correctives: Vec<&Message> = agent
            .conversation()
            .messages()
            .iter()
            .skip(1)
            .filter(|m| m.role == Role::System)
            .collect();
        assert_eq!(correctives.len(), 2);
        assert!(correctives.iter().all(|m| m.content == JSON_NOT_PARSABLE));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_once_with_budget_one_recovers() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["```json\n{}\n```", FAIL_REPLY]);
        let mut agent = command_agent(&provider, 1);

        assert!(agent.inference("go", None).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_exhaustion_after_budget() {
        for budget in [0u32, 1, 3, 5] {
            let replies = vec!["malformed"; budget as usize + 1];
            let provider = MockProvider::new(replies);
            let mut agent = command_agent(&provider, budget);

            let err = agent.inference("go", None).await.unwrap_err();
            assert!(matches!(
                err,
                AgentError::StructuredOutputExhausted { attempts } if attempts == budget
            ));

            // initial system + user + assistant, then one corrective and one reply per attempt
            let messages = agent.conversation().messages();
            assert_eq!(messages.len(), 3 + 2 * budget as usize);
            let extra = &messages[3..];
            assert_eq!(extra.iter().filter(|m| m.role == Role::System).count(), budget as usize);
            assert_eq!(extra.iter().filter(|m| m.role == Role::Assistant).count(), budget as usize);
            assert_eq!(messages.last().unwrap().role, Role::Assistant);
        }
    }

    #[tokio::test]
    async fn test_non_object_json_is_not_conforming() {
        let provider = MockProvider::new(vec!["[1, 2, 3]", "42"]);
        let mut agent = command_agent(&provider, 1);

        let err = agent.inference("go", None).await.unwrap_err();
        assert!(matches!(err, AgentError::StructuredOutputExhausted { attempts: 1 }));
        assert_eq!(
            agent.conversation().messages()[3].content,
            JSON_NOT_CONFORMING_TO_TEMPLATE
        );
    }

    #[tokio::test]
    async fn test_service_error_is_not_retried() {
        let provider = MockProvider::with_responses(vec![
            MockResponse::Text("malformed".to_string()),
            MockResponse::Failure("connection reset".to_string()),
            MockResponse::Text(FAIL_REPLY.to_string()),
        ]);
        let mut agent = command_agent(&provider, 3);

        let err = agent.inference("go", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Service(_)));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_sees_whole_conversation() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["first", "second"]);
        let mut agent = Agent::new(Box::new(provider.clone()), AgentConfig::new("sys"));

        agent.inference("one", None).await?;
        agent.inference("two", None).await?;

        let calls = provider.calls();
        assert_eq!(calls[0].len(), 2);
        assert_eq!(
            calls[1].iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["sys", "one", "first", "two"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_keeps_configuration() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![FAIL_REPLY]);
        let mut agent = command_agent(&provider, 2);
        agent.inference("go", None).await?;

        agent.reset();
        agent.reset();
        assert_eq!(agent.conversation().snapshot(), vec![Message::system("system")]);
        assert_eq!(agent.config().retry_budget, 2);
        assert!(agent.config().response_template.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_image_is_attached_to_prompt() -> anyhow::Result<()> {
        let mut file = Builder::new().suffix(".jpg").tempfile()?;
        file.write_all(b"jpeg")?;

        let provider = MockProvider::new(vec!["A red cube."]);
        let mut agent = Agent::new(Box::new(provider.clone()), AgentConfig::new("vision"));
        agent.inference("describe", Some(file.path())).await?;

        let sent = &provider.calls()[0];
        assert_eq!(sent[1].images.len(), 1);
        assert_eq!(sent[1].images[0].mime_type, "image/jpeg");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_calling_provider() {
        let provider = MockProvider::new(vec!["unused"]);
        let mut agent = Agent::new(Box::new(provider.clone()), AgentConfig::new("vision"));

        let err = agent
            .inference("describe", Some(Path::new("/nonexistent/render.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Attachment { .. }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_persist_after_exhaustion_keeps_failed_exchange() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let provider = MockProvider::new(vec!["bad", "worse"]);
        let mut agent = command_agent(&provider, 1);
        assert!(agent.inference("go", None).await.is_err());

        let path = agent.persist_conversation(dir.path().join("failed.json"))?;
        let restored = crate::conversation::load_messages(&path)?;
        assert_eq!(restored, agent.conversation().snapshot());
        assert_eq!(restored.last().unwrap().content, "worse");
        Ok(())
    }

    #[test]
    fn test_judge() {
        let template = ResponseTemplate::new().with_field("n", ValueKind::Integer);
        assert!(matches!(judge(&template, "{\"n\": 1}"), Verdict::Conforming(_)));
        assert!(matches!(judge(&template, "{\"n\": \"1\"}"), Verdict::NonConforming));
        assert!(matches!(judge(&template, "n = 1"), Verdict::Unparsable));
    }
}
