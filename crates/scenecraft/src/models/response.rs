use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::template::{ResponseTemplate, ValidatedResult, ValueKind};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// What the model wants the caller to do with a command response
pub enum ResponseType {
    /// `content` holds code to be executed by the host
    Code,
    /// The task is impossible or contradictory, `message` says why
    Fail,
    /// The model needs a natural language description of the scene
    RequestSceneDescription,
    /// The model needs the hierarchical object list of the scene
    RequestObjectsList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Typed view of a validated command response
pub struct CommandResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    pub content: String,
    pub message: String,
}

impl CommandResponse {
    /// The template command responses are validated against
    pub fn template() -> ResponseTemplate {
        ResponseTemplate::new()
            .with_field("type", ValueKind::one_of::<ResponseType>())
            .with_field("content", ValueKind::Text)
            .with_field("message", ValueKind::Text)
    }

    pub fn from_result(result: ValidatedResult) -> serde_json::Result<Self> {
        result.into_typed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::str::FromStr;

    #[test]
    fn test_response_type_tags() {
        assert_eq!(ResponseType::Code.to_string(), "code");
        assert_eq!(
            ResponseType::RequestSceneDescription.to_string(),
            "request_scene_description"
        );
        assert_eq!(
            ResponseType::from_str("request_objects_list").unwrap(),
            ResponseType::RequestObjectsList
        );
        assert!(ResponseType::from_str("shell").is_err());
    }

    #[test]
    fn test_template_accepts_every_response_type() {
        let template = CommandResponse::template();
        for tag in ["code", "fail", "request_scene_description", "request_objects_list"] {
            assert!(template.kind_of("type").unwrap().matches(&json!(tag)));
        }
        assert!(!template.kind_of("type").unwrap().matches(&json!("Code")));
    }

    #[test]
    fn test_from_validated_result() {
        let Value::Object(map) = json!({
            "type": "fail",
            "content": "",
            "message": "cannot divide by zero"
        }) else {
            panic!("expected object");
        };
        let result = ValidatedResult::check(&CommandResponse::template(), map).unwrap();
        let response = CommandResponse::from_result(result).unwrap();

        assert_eq!(response.kind, ResponseType::Fail);
        assert_eq!(response.message, "cannot divide by zero");
        assert!(response.content.is_empty());
    }
}
