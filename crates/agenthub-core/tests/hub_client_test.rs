use agenthub_core::api::{ApiError, ChatBackend, HubClient};
use agenthub_core::message_store::Message;
use agenthub_core::stream::{StreamFailure, StreamOutcome};
use agenthub_core::{AgentId, AgentStatus, Workspace};
use axum::Json;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

const SESSION_COOKIE: &str = "hub_session=7f3a";

fn authenticated(headers: &HeaderMap) -> bool {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.split("; ").any(|c| c == SESSION_COOKIE))
}

async fn auth_status(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "authenticated": authenticated(&headers) }))
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "ada" && body["password"] == "lovelace" {
        (
            [(SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
            Json(json!({ "success": true })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn logout() -> Response {
    (
        [(SET_COOKIE, "hub_session=; Path=/; Max-Age=0".to_string())],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn agents(headers: HeaderMap) -> Response {
    if !authenticated(&headers) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    Json(json!([
        {
            "id": "research",
            "name": "Research Agent",
            "color": "#3b82f6",
            "icon": "search",
            "model": "claude-sonnet",
            "status": "active",
            "group": "Knowledge"
        },
        {
            "id": "code",
            "name": "Code Reviewer",
            "color": "#10b981",
            "icon": "code",
            "model": "claude-opus",
            "status": "idle",
            "group": "Engineering"
        }
    ]))
    .into_response()
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authenticated(&headers) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    let chunks: Vec<String> = match body["agentId"].as_str() {
        // Records deliberately straddle chunk boundaries.
        Some("research") => vec![
            "data: {\"content\":\"Hel\"}\n\ndata: {\"con".to_string(),
            "tent\":\"lo\"}\n\n: ping\n\n".to_string(),
            "data: {\"done\":true}\n\n".to_string(),
        ],
        Some("code") => vec![
            "data: {\"content\":\"Analyzing\"}\n\n".to_string(),
            "data: {\"content\":\" code\"}\n\n".to_string(),
            "data: {\"error\":\"rate_limited\"}\n\n".to_string(),
        ],
        _ => {
            let turns = body["messages"].as_array().map_or(0, Vec::len);
            vec![
                format!(
                    "data: {}\n\n",
                    json!({ "content": format!("{turns} turns") })
                ),
                "data: {\"done\":true}\n\n".to_string(),
            ]
        }
    };
    let stream = futures::stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
    );
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(stream))
        .unwrap()
}

async fn spawn_hub() -> SocketAddr {
    let router = Router::new()
        .route("/api/auth/status", get(auth_status))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/agents", get(agents))
        .route("/api/chat", post(chat));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn logged_in_client() -> HubClient {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();
    client.login("ada", "lovelace").await.unwrap();
    client
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();

    assert!(!client.auth_status().await.unwrap());
    client.login("ada", "lovelace").await.unwrap();
    assert!(client.auth_status().await.unwrap());

    client.logout().await.unwrap();
    assert!(!client.auth_status().await.unwrap());
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();

    let err = client.login("ada", "babbage").await.unwrap_err();
    assert!(matches!(err, ApiError::LoginRejected(ref msg) if msg == "Invalid credentials"));
    assert!(!client.auth_status().await.unwrap());
}

#[tokio::test]
async fn agents_require_login() {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();

    let err = client.list_agents().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn lists_agents() {
    let client = logged_in_client().await;
    let agents = client.list_agents().await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].id, AgentId::from("research"));
    assert_eq!(agents[0].display_name, "Research Agent");
    assert_eq!(agents[0].status, AgentStatus::Active);
    assert_eq!(agents[1].group, "Engineering");
}

#[tokio::test]
async fn workspace_streams_over_http() {
    let client = logged_in_client().await;
    let workspace = Workspace::new(Arc::new(client.clone()));
    workspace
        .load_agents(client.list_agents().await.unwrap())
        .await;

    let research = AgentId::from("research");
    let code = AgentId::from("code");

    let r = workspace
        .send_message(&research, "Summarize X")
        .await
        .unwrap();
    let c = workspace.send_message(&code, "Review this").await.unwrap();

    assert_eq!(r.wait().await.unwrap(), StreamOutcome::Done);
    assert_eq!(
        c.wait().await.unwrap(),
        StreamOutcome::Failed(StreamFailure::Remote("rate_limited".to_string()))
    );

    assert_eq!(
        workspace.history(&research).await,
        vec![Message::user("Summarize X"), Message::assistant("Hello")]
    );
    assert_eq!(
        workspace.history(&code).await[1],
        Message::assistant("Analyzing code")
    );
}

#[tokio::test]
async fn request_carries_prior_turns() {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();
    client.login("ada", "lovelace").await.unwrap();
    let workspace = Workspace::new(Arc::new(client));
    let echo = AgentId::from("echo");

    workspace
        .send_message(&echo, "one")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    workspace
        .send_message(&echo, "two")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let history = workspace.history(&echo).await;
    assert_eq!(history[1], Message::assistant("1 turns"));
    assert_eq!(history[3], Message::assistant("3 turns"));
}

#[tokio::test]
async fn unauthenticated_chat_fails_the_session() {
    let addr = spawn_hub().await;
    let client = HubClient::new(&format!("http://{addr}")).unwrap();
    let workspace = Workspace::new(Arc::new(client));
    let research = AgentId::from("research");

    let outcome = workspace
        .send_message(&research, "hello")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StreamOutcome::Failed(StreamFailure::Transport(_))
    ));
    assert!(!workspace.is_busy(&research).await);
}

#[tokio::test]
async fn cancelled_before_send_returns_cancelled() {
    let client = logged_in_client().await;
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let request = agenthub_core::api::ChatRequest {
        agent_id: AgentId::from("research"),
        messages: vec![Message::user("hi")],
    };
    assert!(matches!(
        client.stream_chat(request, token).await,
        Err(ApiError::Cancelled)
    ));
}
