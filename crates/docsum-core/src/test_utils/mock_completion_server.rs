// src/test_utils/mock_completion_server.rs
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One scripted reply of the mock chat-completions endpoint.
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Error {
        status: u16,
        code: String,
        message: String,
        retry_after: Option<String>,
    },
}

impl MockReply {
    pub fn content(text: &str) -> Self {
        MockReply::Content(text.to_string())
    }

    pub fn error(status: u16, code: &str, message: &str) -> Self {
        MockReply::Error {
            status,
            code: code.to_string(),
            message: message.to_string(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(self, value: &str) -> Self {
        match self {
            MockReply::Error { status, code, message, .. } => MockReply::Error {
                status,
                code,
                message,
                retry_after: Some(value.to_string()),
            },
            other => other,
        }
    }
}

#[derive(Clone)]
struct MockServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
}

async fn chat_completions_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    log::debug!("Mock completion server received request: {}", payload);
    state.requests.lock().unwrap().push(payload);
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.auth_headers.lock().unwrap().push(auth.to_string());
    }

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(MockReply::Content(text)) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        Some(MockReply::Error { status, code, message, retry_after }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = Json(json!({
                "error": { "message": message, "type": "invalid_request_error", "code": code }
            }));
            match retry_after {
                Some(value) => (status, [("retry-after", value)], body).into_response(),
                None => (status, body).into_response(),
            }
        }
        None => {
            log::error!("Mock completion server ran out of replies!");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

pub struct MockCompletionServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    requests: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
}

impl MockCompletionServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = MockServerState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
            auth_headers: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = state.requests.clone();
        let auth_headers = state.auth_headers.clone();

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock completion server error: {}", e);
                });
        });

        MockCompletionServer {
            addr,
            shutdown_tx,
            requests,
            auth_headers,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock completion server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    pub fn get_requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn get_auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().unwrap().clone()
    }
}
