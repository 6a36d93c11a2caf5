use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use glasschat_core::{ChatBackend, ChatError, HttpChatBackend, PayloadField};
use serde_json::{json, Value};

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/chat", addr)
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    let text = body
        .get("message")
        .or_else(|| body.get("prompt"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let field = if body.get("message").is_some() { "message" } else { "prompt" };
    Json(json!({ "response": format!("{}: {}", field, text) }))
}

#[tokio::test]
async fn test_posts_message_field_and_reads_response() {
    let url = spawn_server(Router::new().route("/chat", post(echo))).await;
    let backend = HttpChatBackend::new(&url, PayloadField::Message);

    let reply = backend.send("hello").await.unwrap();
    assert_eq!(reply.response.as_deref(), Some("message: hello"));
}

#[tokio::test]
async fn test_posts_prompt_field_when_configured() {
    let url = spawn_server(Router::new().route("/chat", post(echo))).await;
    let backend = HttpChatBackend::new(&url, PayloadField::Prompt);

    let reply = backend.send("hello").await.unwrap();
    assert_eq!(reply.response.as_deref(), Some("prompt: hello"));
}

#[tokio::test]
async fn test_missing_response_field_is_not_an_error() {
    let router = Router::new().route("/chat", post(|| async { Json(json!({ "other": 1 })) }));
    let url = spawn_server(router).await;
    let backend = HttpChatBackend::new(&url, PayloadField::Message);

    let reply = backend.send("hello").await.unwrap();
    assert_eq!(reply.response, None);
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let router = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    );
    let url = spawn_server(router).await;
    let backend = HttpChatBackend::new(&url, PayloadField::Message);

    match backend.send("hello").await {
        Err(ChatError::Status(code)) => assert_eq!(code, 503),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route("/chat", post(|| async { "definitely not json" }));
    let url = spawn_server(router).await;
    let backend = HttpChatBackend::new(&url, PayloadField::Message);

    assert!(matches!(backend.send("hello").await, Err(ChatError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpChatBackend::new(&format!("http://{}/chat", addr), PayloadField::Message);
    assert!(matches!(backend.send("hello").await, Err(ChatError::Transport(_))));
}
