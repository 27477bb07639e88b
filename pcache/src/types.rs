//! Cached entity types decoded from the document store.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tools,
    Prompts,
    Extensions,
    Environment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Prompts => "prompts",
            Self::Extensions => "extensions",
            Self::Environment => "environment",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Restful,
    #[serde(alias = "grpc")]
    Rpc,
    #[serde(alias = "mcp")]
    Pluggable,
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Restful => "restful",
            Self::Rpc => "rpc",
            Self::Pluggable => "pluggable",
        };
        f.write_str(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub module: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supports: Vec<String>,
    /// JSON Schema for call arguments; `null` accepts anything.
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub returns: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restful: Option<Endpoint>,
    #[serde(default, alias = "grpc", skip_serializing_if = "Option::is_none")]
    pub rpc: Option<Endpoint>,
}

impl Tool {
    pub fn new(name: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            module: String::new(),
            kind,
            description: String::new(),
            supports: Vec::new(),
            parameters: Value::Null,
            returns: Value::Null,
            examples: Vec::new(),
            restful: None,
            rpc: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    pub fn with_restful(mut self, url: impl Into<String>) -> Self {
        self.restful = Some(Endpoint {
            url: url.into(),
            method: "POST".to_string(),
        });
        self
    }

    pub fn with_rpc(mut self, url: impl Into<String>) -> Self {
        self.rpc = Some(Endpoint {
            url: url.into(),
            method: String::new(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "userPrompt", skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    /// `None` when absent or `null`; an empty list is still a message body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub supports: Vec<String>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub returns: Value,
}

/// The renderable part of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBody<'a> {
    Template(&'a str),
    Messages(&'a [Message]),
}

impl Prompt {
    pub fn template(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: body.into(),
            ..Self::default()
        }
    }

    pub fn messages(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages: Some(messages),
            ..Self::default()
        }
    }

    /// A template string takes precedence over a message list.
    pub fn body(&self) -> Result<PromptBody<'_>, InvalidPrompt> {
        if !self.prompt.is_empty() {
            return Ok(PromptBody::Template(&self.prompt));
        }
        if let Some(messages) = &self.messages {
            return Ok(PromptBody::Messages(messages));
        }
        Err(InvalidPrompt {
            name: self.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    #[serde(rename = "notexist")]
    NotExist,
    Direct,
    Extension,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptEntry {
    pub origin: PromptOrigin,
    pub prompt: Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Engines {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependence {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub fail_strategy: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contributes {
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub dependences: Vec<Dependence>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub extension_type: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub engines: Engines,
    #[serde(default)]
    pub contributes: Contributes,
}

impl Extension {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.contributes.prompts.push(prompt);
        self
    }

    /// Contributed prompts keyed by `<extension>.<prompt>`.
    pub fn contributed_prompts(&self) -> impl Iterator<Item = (String, &Prompt)> {
        self.contributes
            .prompts
            .iter()
            .filter(|prompt| !prompt.name.is_empty())
            .map(|prompt| (format!("{}.{}", self.name, prompt.name), prompt))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Extension, Prompt, PromptBody, Tool, ToolKind};

    #[test]
    fn tool_accepts_grpc_and_mcp_aliases() {
        let grpc: Tool = serde_json::from_value(json!({
            "name": "Lookup",
            "module": "geo.v1.Geo",
            "type": "grpc",
            "grpc": { "url": "localhost:9000", "method": "Lookup" }
        }))
        .expect("grpc tool should decode");
        assert_eq!(grpc.kind, ToolKind::Rpc);
        assert_eq!(
            grpc.rpc.as_ref().map(|e| e.url.as_str()),
            Some("localhost:9000")
        );

        let mcp: Tool = serde_json::from_value(json!({ "name": "x", "type": "mcp" }))
            .expect("mcp tool should decode");
        assert_eq!(mcp.kind, ToolKind::Pluggable);
    }

    #[test]
    fn unknown_tool_type_fails_to_decode() {
        let result: Result<Tool, _> = serde_json::from_value(json!({ "type": "smtp" }));
        assert!(result.is_err());
    }

    #[test]
    fn prompt_body_prefers_template_and_rejects_empty() {
        let mut prompt: Prompt = serde_json::from_value(json!({
            "name": "greet",
            "userPrompt": "Hello {{args.name}}",
            "messages": [{ "role": "user", "content": "ignored" }]
        }))
        .expect("prompt should decode");

        assert_eq!(
            prompt.body().expect("body should resolve"),
            PromptBody::Template("Hello {{args.name}}")
        );

        prompt.prompt.clear();
        assert!(matches!(prompt.body(), Ok(PromptBody::Messages(m)) if m.len() == 1));

        prompt.messages = Some(Vec::new());
        assert_eq!(prompt.body(), Ok(PromptBody::Messages(&[])));

        prompt.messages = None;
        let err = prompt.body().expect_err("empty prompt should be invalid");
        assert_eq!(err.name, "greet");

        let null_messages: Prompt =
            serde_json::from_value(json!({ "name": "blank", "messages": null }))
                .expect("prompt should decode");
        assert!(null_messages.body().is_err());
    }

    #[test]
    fn extension_prompts_are_namespaced_by_extension_name() {
        let extension: Extension = serde_json::from_value(json!({
            "name": "review",
            "displayName": "Code Review",
            "version": "1.2.0",
            "contributes": {
                "prompts": [{ "name": "summarize", "userPrompt": "Summarize {{args.diff}}" }],
                "dependences": [{ "name": "git", "version": "2", "failStrategy": "ignore" }]
            }
        }))
        .expect("extension should decode");

        let ids: Vec<String> = extension.contributed_prompts().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["review.summarize".to_string()]);
        assert_eq!(extension.display_name, "Code Review");
        assert_eq!(extension.contributes.dependences[0].fail_strategy, "ignore");
    }
}
