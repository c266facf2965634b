//! SSE client for remote MCP tool providers

use crate::error::{Error, Result};
use crate::provider::ToolProvider;
use crate::rpc::{
    CallToolParams, CallToolResult, ContentBlock, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ToolsListResult, PROTOCOL_VERSION,
};
use crate::tool::{ToolDescriptor, ToolOutcome, ToolRequest};
use dashmap::DashMap;
use futures::StreamExt;
use reqwest::Client;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// One parsed SSE frame
#[derive(Debug, Default, Clone, PartialEq)]
struct SseFrame {
    event: String,
    data: String,
}

/// Incremental SSE frame parser.
///
/// Frames are separated by blank lines; `data:` lines accumulate with
/// newline joins per the SSE spec.
#[derive(Default)]
struct SseParser {
    buffer: String,
    current: SseFrame,
}

impl SseParser {
    /// Feed a chunk, returning any frames it completes
    fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.current.data.is_empty() || !self.current.event.is_empty() {
                    frames.push(std::mem::take(&mut self.current));
                }
            } else if let Some(value) = line.strip_prefix("event:") {
                self.current.event = value.trim_start().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value.trim_start());
            }
            // comment lines (":") and unknown fields are ignored
        }

        frames
    }
}

/// A [`ToolProvider`] backed by a remote MCP server over SSE.
///
/// [`SseProviderClient::connect`] performs the handshake (endpoint discovery,
/// `initialize`, `tools/list`) and caches the remote tool descriptors; after
/// that, [`ToolProvider::call`] maps to `tools/call`.
pub struct SseProviderClient {
    http: Client,
    message_url: String,
    server_name: String,
    descriptors: Vec<ToolDescriptor>,
    pending: Arc<DashMap<i64, oneshot::Sender<JsonRpcResponse>>>,
    next_id: AtomicI64,
}

impl SseProviderClient {
    /// Connect to an MCP server at `base_url` (e.g. `http://localhost:8900`)
    pub async fn connect(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {e}")))?;

        let base = base_url.trim_end_matches('/').to_string();
        let response = http
            .get(format!("{base}/sse"))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Handshake(format!(
                "SSE endpoint returned {}",
                response.status()
            )));
        }

        let pending: Arc<DashMap<i64, oneshot::Sender<JsonRpcResponse>>> =
            Arc::new(DashMap::new());
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

        // Reader task: route message frames to pending requests by id.
        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            let mut endpoint_tx = Some(endpoint_tx);
            let mut parser = SseParser::default();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "SSE stream error");
                        break;
                    }
                };
                for frame in parser.feed(&String::from_utf8_lossy(&chunk)) {
                    match frame.event.as_str() {
                        "endpoint" => {
                            if let Some(tx) = endpoint_tx.take() {
                                let _ = tx.send(frame.data);
                            }
                        }
                        "message" | "" => {
                            match serde_json::from_str::<JsonRpcResponse>(&frame.data) {
                                Ok(response) => {
                                    if let Some(id) = response.id.as_i64() {
                                        if let Some((_, tx)) = reader_pending.remove(&id) {
                                            let _ = tx.send(response);
                                        }
                                    }
                                }
                                Err(e) => {
                                    debug!(error = %e, "Ignoring non-response SSE frame");
                                }
                            }
                        }
                        other => debug!(event = other, "Ignoring SSE event"),
                    }
                }
            }
            debug!("SSE stream closed");
        });

        let endpoint = tokio::time::timeout(HANDSHAKE_TIMEOUT, endpoint_rx)
            .await
            .map_err(|_| Error::Handshake("no endpoint event received".to_string()))?
            .map_err(|_| Error::Handshake("SSE stream closed during handshake".to_string()))?;

        let message_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("{base}{endpoint}")
        };

        let mut client = Self {
            http,
            message_url,
            server_name: String::new(),
            descriptors: Vec::new(),
            pending,
            next_id: AtomicI64::new(1),
        };

        let init = client
            .request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "caravan",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                })),
            )
            .await?;
        let init: InitializeResult = serde_json::from_value(init)
            .map_err(|e| Error::InvalidResponse(format!("initialize: {e}")))?;
        client.server_name = init.server_info.name;

        client
            .notify(JsonRpcRequest::notification("notifications/initialized"))
            .await?;

        let listed = client.request("tools/list", None).await?;
        let listed: ToolsListResult = serde_json::from_value(listed)
            .map_err(|e| Error::InvalidResponse(format!("tools/list: {e}")))?;
        client.descriptors = listed
            .tools
            .into_iter()
            .map(|t| ToolDescriptor::new(t.name, t.description, t.input_schema))
            .collect();

        info!(
            server = %client.server_name,
            tools = client.descriptors.len(),
            "Connected to MCP server"
        );
        Ok(client)
    }

    async fn notify(&self, request: JsonRpcRequest) -> Result<()> {
        self.http
            .post(&self.message_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(())
    }

    /// Send a request and wait for the matching response on the SSE stream
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = JsonRpcRequest::new(id, method, params);
        let posted = self
            .http
            .post(&self.message_url)
            .json(&request)
            .send()
            .await;
        if let Err(e) = posted {
            self.pending.remove(&id);
            return Err(Error::Transport(e.to_string()));
        }

        let response = match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(Error::Transport("response channel closed".to_string()));
            }
            Err(_) => {
                self.pending.remove(&id);
                return Err(Error::Timeout(REQUEST_TIMEOUT.as_secs()));
            }
        };

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| Error::InvalidResponse("response missing result".to_string()))
    }
}

#[async_trait::async_trait]
impl ToolProvider for SseProviderClient {
    fn name(&self) -> &str {
        &self.server_name
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        self.descriptors.clone()
    }

    async fn call(&self, request: ToolRequest) -> Result<ToolOutcome> {
        let params = serde_json::to_value(CallToolParams {
            name: request.name,
            arguments: request.arguments,
        })?;
        let result = self.request("tools/call", Some(params)).await?;
        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| Error::InvalidResponse(format!("tools/call: {e}")))?;

        if result.is_error {
            let text = result
                .content
                .iter()
                .map(|ContentBlock::Text { text }| text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::Rpc {
                code: 0,
                message: text,
            });
        }
        if result.content.is_empty() {
            return Ok(ToolOutcome::NoMatch);
        }
        let text = result
            .content
            .iter()
            .map(|ContentBlock::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutcome::answer(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_single_frame() {
        let mut parser = SseParser::default();
        let frames = parser.feed("event: endpoint\ndata: /messages?session_id=abc\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "endpoint");
        assert_eq!(frames[0].data, "/messages?session_id=abc");
    }

    #[test]
    fn test_parser_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed("event: mess").is_empty());
        assert!(parser.feed("age\ndata: {\"jsonrpc\":").is_empty());
        let frames = parser.feed("\"2.0\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, "{\"jsonrpc\":\"2.0\"}");
    }

    #[test]
    fn test_parser_multiline_data() {
        let mut parser = SseParser::default();
        let frames = parser.feed("data: line1\ndata: line2\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line1\nline2");
    }

    #[test]
    fn test_parser_crlf() {
        let mut parser = SseParser::default();
        let frames = parser.feed("event: message\r\ndata: hi\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hi");
    }
}
