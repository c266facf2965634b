//! MCP server over SSE
//!
//! Clients open `GET /sse`, receive an `endpoint` event naming the message
//! URL for their session, then POST JSON-RPC requests there. Responses are
//! streamed back on the SSE channel as `message` events.

use crate::error::{Error, Result};
use crate::registry::ProviderRegistry;
use crate::rpc::{
    CallToolParams, CallToolResult, ContentBlock, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ServerInfo, ToolsListResult, WireTool, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND, PROTOCOL_VERSION,
};
use crate::tool::{ToolOutcome, ToolRequest};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared server state
#[derive(Clone)]
pub struct McpServerState {
    registry: Arc<ProviderRegistry>,
    sessions: Arc<DashMap<Uuid, mpsc::Sender<std::result::Result<Event, Infallible>>>>,
    server_name: String,
}

impl McpServerState {
    /// Create server state around a provider registry
    #[must_use]
    pub fn new(server_name: impl Into<String>, registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: Arc::new(DashMap::new()),
            server_name: server_name.into(),
        }
    }

    /// Number of connected SSE sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Build the axum router
pub fn router(state: McpServerState) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/messages", post(message_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown
pub async fn serve(state: McpServerState, port: u16) -> Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Transport(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "MCP server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

/// Event stream that unregisters its session when the client disconnects
struct SessionStream {
    inner: ReceiverStream<std::result::Result<Event, Infallible>>,
    sessions: Arc<DashMap<Uuid, mpsc::Sender<std::result::Result<Event, Infallible>>>>,
    session_id: Uuid,
}

impl Stream for SessionStream {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.sessions.remove(&self.session_id);
        info!(session_id = %self.session_id, "SSE session closed");
    }
}

async fn sse_handler(State(state): State<McpServerState>) -> Sse<SessionStream> {
    let session_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(32);

    let endpoint = format!("/messages?session_id={session_id}");
    // Handshake: tell the client where to POST for this session.
    let _ = tx
        .send(Ok(Event::default().event("endpoint").data(endpoint)))
        .await;

    state.sessions.insert(session_id, tx);
    info!(%session_id, "SSE session opened");

    let stream = SessionStream {
        inner: ReceiverStream::new(rx),
        sessions: Arc::clone(&state.sessions),
        session_id,
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: Uuid,
}

async fn message_handler(
    State(state): State<McpServerState>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let Some(tx) = state.sessions.get(&query.session_id).map(|s| s.clone()) else {
        return StatusCode::NOT_FOUND;
    };

    if let Some(response) = handle_message(&state, request).await {
        let payload = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize response");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };
        if tx
            .send(Ok(Event::default().event("message").data(payload)))
            .await
            .is_err()
        {
            // Client went away; drop the session.
            state.sessions.remove(&query.session_id);
            return StatusCode::GONE;
        }
    }

    StatusCode::ACCEPTED
}

/// Dispatch one JSON-RPC message. Notifications produce no response.
pub async fn handle_message(
    state: &McpServerState,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    if request.is_notification() {
        debug!(method = %request.method, "Notification received");
        return None;
    }
    let id = request.id.clone().unwrap_or(serde_json::Value::Null);

    let response = match request.method.as_str() {
        "initialize" => {
            let result = InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                server_info: ServerInfo {
                    name: state.server_name.clone(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                capabilities: serde_json::json!({"tools": {}}),
            };
            match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            }
        }
        "tools/list" => {
            let tools: Vec<WireTool> = state
                .registry
                .descriptors()
                .into_iter()
                .map(|d| WireTool {
                    name: d.name,
                    description: d.description,
                    input_schema: d.parameters,
                })
                .collect();
            match serde_json::to_value(ToolsListResult { tools }) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            }
        }
        "tools/call" => {
            let params: CallToolParams = match request
                .params
                .ok_or_else(|| "missing params".to_string())
                .and_then(|p| serde_json::from_value(p).map_err(|e| e.to_string()))
            {
                Ok(params) => params,
                Err(reason) => return Some(JsonRpcResponse::error(id, INVALID_PARAMS, reason)),
            };

            let tool_request =
                ToolRequest::new(Uuid::new_v4().to_string(), params.name, params.arguments);
            match state.registry.dispatch(tool_request).await {
                Ok(outcome) => {
                    let result = CallToolResult {
                        content: match outcome {
                            ToolOutcome::Answer { text, .. } => {
                                vec![ContentBlock::Text { text }]
                            }
                            ToolOutcome::NoMatch => Vec::new(),
                        },
                        is_error: false,
                    };
                    match serde_json::to_value(result) {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
                    }
                }
                Err(Error::UnknownTool(name)) => {
                    JsonRpcResponse::error(id, INVALID_PARAMS, format!("unknown tool: {name}"))
                }
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            }
        }
        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::KnowledgeBase;

    fn demo_state() -> McpServerState {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(KnowledgeBase::with_demo_facts()))
            .unwrap();
        McpServerState::new("caravan-kb", registry)
    }

    #[tokio::test]
    async fn test_initialize() {
        let state = demo_state();
        let response = handle_message(
            &state,
            JsonRpcRequest::new(1, "initialize", None),
        )
        .await
        .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "caravan-kb");
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let state = demo_state();
        let response = handle_message(
            &state,
            JsonRpcRequest::notification("notifications/initialized"),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let state = demo_state();
        let response = handle_message(&state, JsonRpcRequest::new(2, "tools/list", None))
            .await
            .unwrap();
        let result: ToolsListResult =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "knowledge-base");
    }

    #[tokio::test]
    async fn test_tools_call_answer() {
        let state = demo_state();
        let params = serde_json::json!({
            "name": "knowledge-base",
            "arguments": {"question": "What is the capital of France?"}
        });
        let response = handle_message(
            &state,
            JsonRpcRequest::new(3, "tools/call", Some(params)),
        )
        .await
        .unwrap();
        let result: CallToolResult =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.content.len(), 1);
        let ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("Paris"));
    }

    #[tokio::test]
    async fn test_tools_call_no_match_is_empty_content() {
        let state = demo_state();
        let params = serde_json::json!({
            "name": "knowledge-base",
            "arguments": {"question": "weather on Neptune"}
        });
        let response = handle_message(
            &state,
            JsonRpcRequest::new(4, "tools/call", Some(params)),
        )
        .await
        .unwrap();
        let result: CallToolResult =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert!(result.content.is_empty());
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let state = demo_state();
        let response = handle_message(&state, JsonRpcRequest::new(5, "resources/list", None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dropped_sse_stream_unregisters_session() {
        let state = demo_state();
        let sse = sse_handler(State(state.clone())).await;
        assert_eq!(state.session_count(), 1);

        // Dropping the response is what happens when the client disconnects.
        drop(sse);
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let state = demo_state();
        let params = serde_json::json!({"name": "calculator", "arguments": {}});
        let response = handle_message(
            &state,
            JsonRpcRequest::new(6, "tools/call", Some(params)),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }
}
