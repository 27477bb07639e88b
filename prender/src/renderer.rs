//! Deadline-bounded prompt rendering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use pcache::{EnvironmentTree, Message, PromptBody, PromptCatalog, SnapshotCell};
use pcommon::TraceId;
use ptooling::CallContext;

use crate::clock::ToolClock;
use crate::compiler::{TemplateCompiler, TemplateSet, message_key, template_key};
use crate::error::RenderError;
use crate::functions::RenderScope;

pub const DEFAULT_RENDER_DEADLINE: Duration = Duration::from_millis(500);

const MIN_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Rendered {
    Prompt { prompt: String },
    Messages { messages: Vec<Message> },
}

impl Rendered {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt { .. } => "prompt",
            Self::Messages { .. } => "messages",
        }
    }

    pub fn as_prompt(&self) -> Option<&str> {
        match self {
            Self::Prompt { prompt } => Some(prompt),
            Self::Messages { .. } => None,
        }
    }

    pub fn as_messages(&self) -> Option<&[Message]> {
        match self {
            Self::Prompt { .. } => None,
            Self::Messages { messages } => Some(messages),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub trace_id: TraceId,
    pub cancel: CancellationToken,
    /// Overrides the renderer's default deadline.
    pub deadline: Option<Duration>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

enum RenderPlan {
    Template(String),
    Messages(Vec<(String, String)>),
}

/// Renders prompts against the current catalog, environment, and templates.
///
/// The deadline bounds template evaluation only: time spent waiting on tool
/// helpers does not count against it, and tool calls keep their own retry
/// budget. When the deadline passes, in-flight tool calls are cancelled and
/// the caller gets [`RenderError::Timeout`].
#[derive(Debug, Clone)]
pub struct Renderer {
    catalog: Arc<PromptCatalog>,
    environment: Arc<SnapshotCell<EnvironmentTree>>,
    compiler: Arc<TemplateCompiler>,
    deadline: Duration,
}

impl Renderer {
    pub fn new(
        catalog: Arc<PromptCatalog>,
        environment: Arc<SnapshotCell<EnvironmentTree>>,
        compiler: Arc<TemplateCompiler>,
    ) -> Self {
        Self {
            catalog,
            environment,
            compiler,
            deadline: DEFAULT_RENDER_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn render(
        &self,
        prompt_id: &str,
        args: Value,
        options: RenderOptions,
    ) -> Result<Rendered, RenderError> {
        let entry = self
            .catalog
            .get(prompt_id)
            .ok_or_else(|| RenderError::NotFound(prompt_id.to_string()))?;

        let plan = match entry.prompt.body()? {
            PromptBody::Template(_) => RenderPlan::Template(template_key(prompt_id)),
            PromptBody::Messages(messages) => RenderPlan::Messages(
                messages
                    .iter()
                    .enumerate()
                    .map(|(index, message)| (message.role.clone(), message_key(prompt_id, index)))
                    .collect(),
            ),
        };

        let templates = self.compiler.templates();
        if let Some(validator) = templates.validator(prompt_id) {
            validator
                .validate(&args)
                .map_err(|err| RenderError::InvalidArguments {
                    prompt_id: prompt_id.to_string(),
                    message: err.message,
                })?;
        }

        let context = build_context(&self.environment.load(), args);
        let deadline = options.deadline.unwrap_or(self.deadline);
        let token = options.cancel.child_token();
        let _cancel_on_drop = token.clone().drop_guard();
        let clock = Arc::new(ToolClock::new());
        let call_context = CallContext::new(options.trace_id.clone()).with_cancel(token.clone());

        let handle = tokio::runtime::Handle::current();
        let task_clock = Arc::clone(&clock);
        let started = Instant::now();
        let mut task = tokio::task::spawn_blocking(move || {
            let scope = RenderScope::enter(handle, call_context, task_clock);
            let result = evaluate(&templates, &plan, &context);
            match (result, scope.take_failure()) {
                (Err(_), Some(tool_error)) => Err(RenderError::Tool(tool_error)),
                (result, _) => result,
            }
        });

        loop {
            let spent = started.elapsed().saturating_sub(clock.elapsed());
            let Some(remaining) = deadline.checked_sub(spent).filter(|left| !left.is_zero()) else {
                token.cancel();
                tracing::warn!(
                    prompt_id = %prompt_id,
                    trace_id = %options.trace_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "render deadline exceeded"
                );
                return Err(RenderError::Timeout {
                    prompt_id: prompt_id.to_string(),
                    deadline,
                });
            };

            tokio::select! {
                biased;
                joined = &mut task => {
                    return joined.map_err(|err| {
                        RenderError::Internal(if err.is_panic() {
                            "template helper panicked".to_string()
                        } else {
                            err.to_string()
                        })
                    })?;
                }
                _ = options.cancel.cancelled() => {
                    token.cancel();
                    return Err(RenderError::Cancelled);
                }
                _ = tokio::time::sleep(remaining.max(MIN_POLL)) => {}
            }
        }
    }
}

/// Top-level environment values plus the caller's arguments under `args`.
fn build_context(environment: &EnvironmentTree, args: Value) -> Value {
    let mut context: Map<String, Value> = environment.top_level();
    context.insert("args".to_string(), args);
    Value::Object(context)
}

fn evaluate(
    templates: &TemplateSet,
    plan: &RenderPlan,
    context: &Value,
) -> Result<Rendered, RenderError> {
    match plan {
        RenderPlan::Template(key) => Ok(Rendered::Prompt {
            prompt: templates.render(key, context)?,
        }),
        RenderPlan::Messages(parts) => {
            let mut messages = Vec::with_capacity(parts.len());
            for (role, key) in parts {
                messages.push(Message::new(role.clone(), templates.render(key, context)?));
            }
            Ok(Rendered::Messages { messages })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use pcache::{EnvironmentTree, Message};

    use super::{Rendered, build_context};

    #[test]
    fn args_shadow_environment_values() {
        let environment = EnvironmentTree::from_entries(
            vec![
                ("company.name".to_string(), json!("Acme")),
                ("args".to_string(), json!("shadowed")),
            ],
            1,
        );

        let context = build_context(&environment, json!({"name": "Ann"}));

        assert_eq!(context["company"]["name"], "Acme");
        assert_eq!(context["args"]["name"], "Ann");
    }

    #[test]
    fn rendered_serializes_with_kind_tag() {
        let prompt = Rendered::Prompt {
            prompt: "Hello Ann".to_string(),
        };
        let messages = Rendered::Messages {
            messages: vec![Message::new("user", "hi")],
        };

        assert_eq!(
            serde_json::to_value(&prompt).expect("serialize"),
            json!({"kind": "prompt", "prompt": "Hello Ann"})
        );
        assert_eq!(
            serde_json::to_value(&messages).expect("serialize"),
            json!({"kind": "messages", "messages": [{"role": "user", "content": "hi"}]})
        );
        assert_eq!(messages.kind(), "messages");
        assert_eq!(prompt.as_prompt(), Some("Hello Ann"));
    }
}
