//! MCP server over newline-delimited JSON-RPC: one message per input line, one
//! response per output line. Notifications get no response.

use crate::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams,
    ToolCallResult, JSONRPC_VERSION,
};
use crate::tools;
use mem_graph::KnowledgeGraphManager;
use mem_types::FileStore;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const INITIALIZE: &str = "initialize";
pub const PING: &str = "ping";
pub const TOOLS_LIST: &str = "tools/list";
pub const TOOLS_CALL: &str = "tools/call";

/// Run one `tools/call`. Operation failures become an `isError` result whose text
/// starts with the error code; they are not protocol errors.
pub async fn call_tool<S: FileStore>(
    manager: &KnowledgeGraphManager<S>,
    params: ToolCallParams,
) -> ToolCallResult {
    let arguments = params.arguments.unwrap_or_else(|| json!({}));
    match tools::dispatch(manager, &params.name, arguments).await {
        Ok(result) => ToolCallResult::text(
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string()),
        ),
        Err(e) => {
            tracing::warn!(tool = %params.name, code = e.code(), error = %e, "tool call failed");
            ToolCallResult::failure(format!("{}: {}", e.code(), e))
        }
    }
}

/// Handle one parsed message. Returns `None` for notifications.
pub async fn handle_request<S: FileStore>(
    manager: &KnowledgeGraphManager<S>,
    req: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    tracing::debug!(method = %req.method, "handling request");
    let Some(id) = req.id else {
        tracing::debug!(method = %req.method, "notification received");
        return None;
    };
    if req.jsonrpc != JSONRPC_VERSION {
        return Some(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request(format!("unsupported jsonrpc version {}", req.jsonrpc)),
        ));
    }

    let response = match req.method.as_str() {
        INITIALIZE => JsonRpcResponse::success(id, to_value(InitializeResult::default())),
        PING => JsonRpcResponse::success(id, json!({})),
        TOOLS_LIST => JsonRpcResponse::success(id, json!({ "tools": tools::tool_definitions() })),
        TOOLS_CALL => {
            let params = match req.params.map(serde_json::from_value::<ToolCallParams>) {
                Some(Ok(params)) => params,
                Some(Err(e)) => {
                    return Some(JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid params: {e}")),
                    ));
                }
                None => {
                    return Some(JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params("Missing params"),
                    ));
                }
            };
            JsonRpcResponse::success(id, to_value(call_tool(manager, params).await))
        }
        other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
    };
    Some(response)
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Handle one raw input line.
pub async fn handle_line<S: FileStore>(
    manager: &KnowledgeGraphManager<S>,
    line: &str,
) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting unparsable message");
            return Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::parse_error(format!("Parse error: {e}")),
            ));
        }
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(req) => handle_request(manager, req).await,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed request");
            Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {e}")),
            ))
        }
    }
}

/// Serve messages from `reader` until EOF, writing responses to `writer`.
pub async fn serve<S, R, W>(
    manager: &KnowledgeGraphManager<S>,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    S: FileStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(response) = handle_line(manager, line).await else {
            continue;
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }
    tracing::info!("client disconnected, stopping");
    Ok(())
}
