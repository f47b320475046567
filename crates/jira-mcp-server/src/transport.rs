//! Transport layer for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. The transport works on
//! any async byte stream so sessions can also be driven from in-memory pipes.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};

/// Message that can be received from the client.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// Line that is not a valid JSON-RPC message, with the error reply for it.
    Invalid(JsonRpcResponse),
}

/// Transport for reading/writing JSON-RPC messages.
pub struct StdioTransport {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// Create a transport with a custom reader/writer.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Read the next JSON-RPC message, skipping blank lines.
    ///
    /// Returns `Ok(None)` on EOF.
    pub async fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", line);
            return Ok(Some(parse_message(line)));
        }
    }

    /// Write a JSON-RPC response to the transport.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let mut json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await
    }
}

/// Classify one line of input.
pub fn parse_message(line: &str) -> IncomingMessage {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse message: {}", line);
            return IncomingMessage::Invalid(JsonRpcResponse::error(
                RequestId::Null,
                JsonRpcError::parse_error(&e.to_string()),
            ));
        }
    };

    // Requests carry an id, notifications don't
    if let Some(id) = value.get("id") {
        let id = serde_json::from_value::<RequestId>(id.clone()).unwrap_or(RequestId::Null);
        return match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => IncomingMessage::Request(request),
            Err(e) => {
                tracing::warn!("Invalid request: {}", e);
                IncomingMessage::Invalid(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ))
            }
        };
    }

    match serde_json::from_value::<JsonRpcNotification>(value) {
        Ok(notification) => IncomingMessage::Notification(notification),
        Err(e) => {
            tracing::warn!("Invalid message: {}", e);
            IncomingMessage::Invalid(JsonRpcResponse::error(
                RequestId::Null,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn transport(input: &str) -> StdioTransport {
        StdioTransport::new(Cursor::new(input.as_bytes().to_vec()), tokio::io::sink())
    }

    #[tokio::test]
    async fn test_read_request() {
        let mut transport =
            transport("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"resources/list\"}\n");

        match transport.read_message().await.unwrap() {
            Some(IncomingMessage::Request(req)) => {
                assert_eq!(req.method, "resources/list");
                assert_eq!(req.id, RequestId::Number(1));
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_notification() {
        let mut transport =
            transport("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n");

        match transport.read_message().await.unwrap() {
            Some(IncomingMessage::Notification(notif)) => {
                assert_eq!(notif.method, "notifications/initialized");
            }
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let mut transport =
            transport("\n   \n{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"ping\"}\n");

        assert!(matches!(
            transport.read_message().await.unwrap(),
            Some(IncomingMessage::Request(_))
        ));
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_eof() {
        let mut transport = transport("");
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage() {
        match parse_message("{not json") {
            IncomingMessage::Invalid(resp) => {
                assert_eq!(resp.id, RequestId::Null);
                assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
            }
            other => panic!("Expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_request_without_method_keeps_id() {
        match parse_message(r#"{"jsonrpc":"2.0","id":9}"#) {
            IncomingMessage::Invalid(resp) => {
                assert_eq!(resp.id, RequestId::Number(9));
                assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
            }
            other => panic!("Expected invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_response() {
        let (client, server) = tokio::io::duplex(4096);
        let mut transport = StdioTransport::new(BufReader::new(tokio::io::empty()), server);

        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({"tools": []}),
        );
        transport.write_response(&response).await.unwrap();
        drop(transport);

        let mut lines = BufReader::new(client).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["result"]["tools"], serde_json::json!([]));
    }
}
