use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use promptshell::pcommon::BoxFuture;
use promptshell::ptooling::{HttpReply, HttpTransport};
use promptshell::{DocumentStore, Engine, InMemoryDocumentStore, ToolError};
use pserver::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

struct FakeHttp {
    status: u16,
    calls: Mutex<Vec<Value>>,
}

impl HttpTransport for FakeHttp {
    fn post_json<'a>(
        &'a self,
        _url: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, ToolError>> {
        Box::pin(async move {
            self.calls.lock().expect("calls lock").push(body.clone());
            Ok(HttpReply::new(self.status, r#"{"temp":21}"#))
        })
    }
}

async fn app_with_status(status: u16) -> (Router, Arc<FakeHttp>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let documents = [
        (
            "prompt-shell:tools:weather:now",
            json!({
                "name": "now",
                "type": "restful",
                "restful": { "url": "http://weather.local/now" },
                "parameters": {
                    "type": "object",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"]
                }
            }),
        ),
        (
            "prompt-shell:tools:local:plugin",
            json!({ "name": "plugin", "type": "pluggable" }),
        ),
        (
            "prompt-shell:prompts:greet",
            json!({ "name": "greet", "prompt": "Hello {{args.name}}" }),
        ),
        (
            "prompt-shell:prompts:chatty",
            json!({
                "name": "chatty",
                "messages": [
                    { "role": "system", "content": "You are {{bot.name}}" },
                    { "role": "user", "content": "{{args.q}}" }
                ]
            }),
        ),
        (
            "prompt-shell:extensions:review",
            json!({
                "name": "review",
                "version": "1.0.0",
                "contributes": { "prompts": [{ "name": "lint", "prompt": "lint it" }] }
            }),
        ),
        ("prompt-shell:environs:bot:name", json!("Shelly")),
    ];
    for (key, value) in documents {
        store
            .put(key, value.to_string())
            .await
            .expect("put should succeed");
    }

    let http = Arc::new(FakeHttp {
        status,
        calls: Mutex::new(Vec::new()),
    });
    let engine = Engine::builder()
        .store(store)
        .http_transport(http.clone())
        .build()
        .expect("engine should build");
    engine.refresh_all().await.expect("refresh should succeed");

    (router(AppState::new(engine)), http)
}

async fn app() -> Router {
    app_with_status(200).await.0
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request should complete");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be json")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_snapshot_sizes() {
    let (status, body) = send(app().await, get("/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tools"], 2);
    assert_eq!(body["prompts"], 3);
    assert_eq!(body["chat"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_are_sorted_and_carry_ids() {
    let (status, body) = send(app().await, get("/api/tools")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|tool| tool["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["local.plugin", "weather.now"]);
    assert_eq!(body[1]["type"], "restful");

    let (_, prompts) = send(app().await, get("/api/prompts")).await;
    assert_eq!(prompts[2]["id"], "review.lint");
    assert_eq!(prompts[2]["origin"], "extension");
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_lookup_includes_origin() {
    let (status, body) = send(app().await, get("/api/prompts/greet")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"], "direct");
    assert_eq!(body["prompt"]["prompt"], "Hello {{args.name}}");

    let (status, body) = send(app().await, get("/api/prompts/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn render_returns_prompt_or_messages() {
    let (status, body) = send(
        app().await,
        post("/api/prompts/greet/render", json!({ "args": { "name": "Ann" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "kind": "prompt", "prompt": "Hello Ann" }));

    let (status, body) = send(
        app().await,
        post("/api/prompts/chatty/render", json!({ "args": { "q": "hi" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "messages");
    assert_eq!(body["messages"][0]["content"], "You are Shelly");
    assert_eq!(body["messages"][1]["content"], "hi");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_render_body_is_bad_request() {
    let request = Request::post("/api/prompts/greet/render")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");

    let (status, body) = send(app().await, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_call_validates_and_dispatches() {
    let (app, http) = app_with_status(200).await;

    let (status, body) = send(
        app.clone(),
        post("/api/tools/weather.now/call", json!({ "city": "Oslo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": { "temp": 21 } }));

    let (status, _) = send(app.clone(), post("/api/tools/weather.now/call", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(http.calls.lock().expect("calls lock").len(), 1);

    let (status, stats) = send(app, get("/api/tools/weather.now/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["count"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_errors_map_to_gateway_statuses() {
    let (app, _) = app_with_status(404).await;

    let (status, body) = send(
        app.clone(),
        post("/api/tools/weather.now/call", json!({ "city": "Oslo" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (status, _) = send(app.clone(), post("/api/tools/local.plugin/call", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, _) = send(app, post("/api/tools/nope/call", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn environment_routes_expose_tree_and_paths() {
    let (status, tree) = send(app().await, get("/api/environs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree, json!({ "bot": { "name": "Shelly" } }));

    let (status, value) = send(app().await, get("/api/environs/bot.name")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "value": "Shelly" }));

    let (status, _) = send(app().await, get("/api/environs/bot.age")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn extension_lookup_and_disabled_chat() {
    let (status, body) = send(app().await, get("/api/extensions/review")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "1.0.0");

    let (status, body) = send(
        app().await,
        post("/api/prompts/greet/chat", json!({ "model": "gpt-test" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], "not_implemented");
}
