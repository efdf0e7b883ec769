//! Shape checking for structured LLM responses.
//!
//! A [`ResponseTemplate`] names every field a response must carry and the kind of
//! value each field holds. [`conforms`] is the single check used by the agent:
//! the key sets must be equal and every value must match its declared kind.
use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The kind of value a template field accepts
pub enum ValueKind {
    Text,
    Integer,
    Number,
    Boolean,
    /// A string drawn from a closed set of tags
    OneOf(BTreeSet<String>),
}

impl ValueKind {
    /// Build an enumerated kind from any string-like members
    pub fn from_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueKind::OneOf(members.into_iter().map(Into::into).collect())
    }

    /// Build an enumerated kind from the display form of every variant of `E`
    pub fn one_of<E: IntoEnumIterator + Display>() -> Self {
        Self::from_members(E::iter().map(|variant| variant.to_string()))
    }

    /// Whether `value` is of this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Text => value.is_string(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::OneOf(members) => value
                .as_str()
                .is_some_and(|tag| members.contains(tag)),
        }
    }

    fn describe(&self) -> String {
        match self {
            ValueKind::Text => "<string>".to_string(),
            ValueKind::Integer => "<integer>".to_string(),
            ValueKind::Number => "<number>".to_string(),
            ValueKind::Boolean => "<boolean>".to_string(),
            ValueKind::OneOf(members) => format!(
                "<enum:[{}]>",
                members.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// The expected shape of a structured response, in declaration order
pub struct ResponseTemplate {
    fields: Vec<(String, ValueKind)>,
}

impl ResponseTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing any earlier declaration with the same name
    pub fn with_field<S: Into<String>>(mut self, name: S, kind: ValueKind) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_kind)) => *existing_kind = kind,
            None => self.fields.push((name, kind)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValueKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
    }

    pub fn kind_of(&self, name: &str) -> Option<&ValueKind> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, kind)| kind)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the template as the JSON-like shape shown to the model
    pub fn describe(&self) -> String {
        let body = self
            .fields
            .iter()
            .map(|(name, kind)| format!("    \"{}\" : {}", name, kind.describe()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{{\n{}\n}}", body)
    }
}

/// Check that `candidate` has exactly the template's keys and that every value
/// matches the declared kind.
pub fn conforms(template: &ResponseTemplate, candidate: &Map<String, Value>) -> bool {
    let expected: HashSet<&str> = template.fields().map(|(name, _)| name).collect();
    let actual: HashSet<&str> = candidate.keys().map(String::as_str).collect();
    if expected != actual {
        return false;
    }

    candidate.iter().all(|(name, value)| {
        template
            .kind_of(name)
            .is_some_and(|kind| kind.matches(value))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
/// A structured response that passed [`conforms`] against its template
pub struct ValidatedResult(Map<String, Value>);

impl ValidatedResult {
    /// Validate `candidate`, returning it back on failure
    pub fn check(
        template: &ResponseTemplate,
        candidate: Map<String, Value>,
    ) -> Result<Self, Map<String, Value>> {
        if conforms(template, &candidate) {
            Ok(ValidatedResult(candidate))
        } else {
            Err(candidate)
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The value of a text (or enumerated) field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize into a typed view of the response
    pub fn into_typed<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0))
    }
}
