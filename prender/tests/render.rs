use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcache::{EnvironmentTree, Message, Prompt, PromptCatalog, Snapshot, SnapshotCell, Tool, ToolKind};
use pcommon::BoxFuture;
use prender::handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError as TemplateRenderError,
    ScopedJson,
};
use prender::{FunctionTable, RenderError, RenderOptions, Rendered, Renderer, TemplateCompiler};
use ptooling::{HttpReply, HttpTransport, ToolDispatcher, ToolError, ToolErrorKind};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct FakeHttp {
    status: u16,
    body: &'static str,
    delay: Duration,
    calls: Mutex<Vec<Value>>,
}

impl FakeHttp {
    fn replying(status: u16, body: &'static str) -> Arc<Self> {
        Self::delayed(status, body, Duration::ZERO)
    }

    fn delayed(status: u16, body: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Value> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl HttpTransport for FakeHttp {
    fn post_json<'a>(
        &'a self,
        _url: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, ToolError>> {
        Box::pin(async move {
            self.calls.lock().expect("calls lock").push(body.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(HttpReply::new(self.status, self.body))
        })
    }
}

struct PendingHttp;

impl HttpTransport for PendingHttp {
    fn post_json<'a>(
        &'a self,
        _url: &'a str,
        _body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, ToolError>> {
        Box::pin(std::future::pending())
    }
}

struct SlowHelper(Duration);

impl HelperDef for SlowHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        _: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, TemplateRenderError> {
        std::thread::sleep(self.0);
        Ok(ScopedJson::Derived(Value::String("done".to_string())))
    }
}

struct Fixture {
    renderer: Renderer,
    compiler: Arc<TemplateCompiler>,
    catalog: Arc<PromptCatalog>,
}

fn fixture(
    prompts: Vec<(&str, Prompt)>,
    environment: Vec<(&str, Value)>,
    http: Arc<dyn HttpTransport>,
) -> Fixture {
    let dispatcher = Arc::new(
        ToolDispatcher::builder()
            .http_transport(http)
            .build()
            .expect("dispatcher should build"),
    );
    let weather = Tool::new("now", ToolKind::Restful)
        .with_module("weather")
        .with_restful("http://weather.local/now");
    dispatcher.bind(&Snapshot::new(
        HashMap::from([("weather.now".to_string(), weather)]),
        1,
    ));

    let catalog = Arc::new(PromptCatalog::new());
    catalog.install_direct(
        prompts
            .into_iter()
            .map(|(id, prompt)| (id.to_string(), prompt))
            .collect(),
    );

    let compiler = Arc::new(TemplateCompiler::new());
    compiler.register_helper("slow", SlowHelper(Duration::from_millis(300)));
    compiler.bind_functions(FunctionTable::from_dispatcher(&dispatcher));
    compiler.compile(&catalog);

    let environment = Arc::new(SnapshotCell::new(EnvironmentTree::from_entries(
        environment
            .into_iter()
            .map(|(path, value)| (path.to_string(), value)),
        1,
    )));

    Fixture {
        renderer: Renderer::new(Arc::clone(&catalog), environment, Arc::clone(&compiler)),
        compiler,
        catalog,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn single_template_renders_arguments() {
    let fx = fixture(
        vec![("greet", Prompt::template("greet", "Hello {{args.name}}"))],
        vec![],
        FakeHttp::replying(200, "{}"),
    );

    let rendered = fx
        .renderer
        .render("greet", json!({"name": "Ann"}), RenderOptions::new())
        .await
        .expect("render should succeed");

    assert_eq!(
        rendered,
        Rendered::Prompt {
            prompt: "Hello Ann".to_string()
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn message_sequence_keeps_roles_and_order() {
    let fx = fixture(
        vec![(
            "ask",
            Prompt::messages(
                "ask",
                vec![
                    Message::new("system", "You are {{bot_name}}"),
                    Message::new("user", "{{args.question}}"),
                ],
            ),
        )],
        vec![("bot_name", json!("Helper"))],
        FakeHttp::replying(200, "{}"),
    );

    let rendered = fx
        .renderer
        .render("ask", json!({"question": "2+2?"}), RenderOptions::new())
        .await
        .expect("render should succeed");

    assert_eq!(
        rendered.as_messages().expect("messages"),
        &[
            Message::new("system", "You are Helper"),
            Message::new("user", "2+2?"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_prompt_is_not_found() {
    let fx = fixture(vec![], vec![], FakeHttp::replying(200, "{}"));

    let err = fx
        .renderer
        .render("ghost", json!({}), RenderOptions::new())
        .await
        .expect_err("unknown prompt");

    assert_eq!(err, RenderError::NotFound("ghost".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_without_body_is_invalid() {
    let fx = fixture(
        vec![("hollow", Prompt::default())],
        vec![],
        FakeHttp::replying(200, "{}"),
    );

    let err = fx
        .renderer
        .render("hollow", json!({}), RenderOptions::new())
        .await
        .expect_err("no body");

    assert!(matches!(err, RenderError::InvalidPrompt(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_message_list_renders_as_empty_messages() {
    let fx = fixture(
        vec![("quiet", Prompt::messages("quiet", Vec::new()))],
        vec![],
        FakeHttp::replying(200, "{}"),
    );

    let rendered = fx
        .renderer
        .render("quiet", json!({}), RenderOptions::new())
        .await
        .expect("empty message list should render");

    assert_eq!(rendered, Rendered::Messages { messages: Vec::new() });
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_template_times_out_without_partial_output() {
    let fx = fixture(
        vec![("lazy", Prompt::template("lazy", "before {{slow}} after"))],
        vec![],
        FakeHttp::replying(200, "{}"),
    );

    let err = fx
        .renderer
        .render(
            "lazy",
            json!({}),
            RenderOptions::new().with_deadline(Duration::from_millis(50)),
        )
        .await
        .expect_err("deadline should expire");

    assert!(matches!(err, RenderError::Timeout { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_helper_calls_dispatcher_with_hash_arguments() {
    let http = FakeHttp::replying(200, r#"{"summary":"sunny","temp":21}"#);
    let fx = fixture(
        vec![
            (
                "forecast",
                Prompt::template(
                    "forecast",
                    "{{#with (weather_now city=args.city)}}{{summary}} at {{temp}}{{/with}}",
                ),
            ),
            ("raw", Prompt::template("raw", "{{weather_now}}")),
        ],
        vec![],
        http.clone(),
    );

    let forecast = fx
        .renderer
        .render("forecast", json!({"city": "Oslo"}), RenderOptions::new())
        .await
        .expect("render should succeed");
    let raw = fx
        .renderer
        .render("raw", json!({"city": "Bergen"}), RenderOptions::new())
        .await
        .expect("render should succeed");

    assert_eq!(forecast.as_prompt(), Some("sunny at 21"));
    assert_eq!(raw.as_prompt(), Some(r#"{"summary":"sunny","temp":21}"#));
    assert_eq!(
        http.calls(),
        vec![json!({"city": "Oslo"}), json!({"city": "Bergen"})]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_time_does_not_count_against_render_deadline() {
    let fx = fixture(
        vec![("slowtool", Prompt::template("slowtool", "{{weather_now}}"))],
        vec![],
        FakeHttp::delayed(200, r#""ok""#, Duration::from_millis(200)),
    );

    let rendered = fx
        .renderer
        .render(
            "slowtool",
            json!({}),
            RenderOptions::new().with_deadline(Duration::from_millis(100)),
        )
        .await
        .expect("tool wait is excluded from the deadline");

    assert_eq!(rendered.as_prompt(), Some("ok"));
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_failure_aborts_render_with_tool_error() {
    let fx = fixture(
        vec![("broken", Prompt::template("broken", "x {{weather_now}}"))],
        vec![],
        FakeHttp::replying(404, "no such city"),
    );

    let err = fx
        .renderer
        .render("broken", json!({}), RenderOptions::new())
        .await
        .expect_err("tool should fail");

    let RenderError::Tool(tool_error) = err else {
        panic!("expected tool error, got {err:?}");
    };
    assert_eq!(tool_error.kind, ToolErrorKind::CallFailed);
    assert_eq!(tool_error.root_cause().kind, ToolErrorKind::Upstream);
}

#[tokio::test(flavor = "multi_thread")]
async fn caller_cancellation_aborts_pending_tool_call() {
    let fx = fixture(
        vec![("hang", Prompt::template("hang", "{{weather_now}}"))],
        vec![],
        Arc::new(PendingHttp),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = fx
        .renderer
        .render("hang", json!({}), RenderOptions::new().with_cancel(cancel))
        .await
        .expect_err("render should be cancelled");

    assert_eq!(err, RenderError::Cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_parameters_are_validated() {
    let fx = fixture(
        vec![(
            "strict",
            Prompt {
                parameters: json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {"name": {"type": "string"}}
                }),
                ..Prompt::template("strict", "Hi {{args.name}}")
            },
        )],
        vec![],
        FakeHttp::replying(200, "{}"),
    );

    let err = fx
        .renderer
        .render("strict", json!({}), RenderOptions::new())
        .await
        .expect_err("missing name");

    assert!(matches!(err, RenderError::InvalidArguments { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn recompile_picks_up_new_prompts() {
    let fx = fixture(vec![], vec![], FakeHttp::replying(200, "{}"));
    fx.catalog.install_direct(HashMap::from([(
        "late".to_string(),
        Prompt::template("late", "arrived"),
    )]));

    let before = fx
        .renderer
        .render("late", json!({}), RenderOptions::new())
        .await
        .expect_err("not compiled yet");
    assert_eq!(before, RenderError::TemplateUnavailable("late.prompt".to_string()));

    fx.compiler.compile(&fx.catalog);
    let after = fx
        .renderer
        .render("late", json!({}), RenderOptions::new())
        .await
        .expect("compiled now");
    assert_eq!(after.as_prompt(), Some("arrived"));
}
