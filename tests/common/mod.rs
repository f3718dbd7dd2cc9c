//! Shared utilities for integration tests.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one HTTP request and return its body.
async fn read_body(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body_start = header_end + 4;
            if buf.len() >= body_start + content_length {
                return Some(String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned());
            }
        }
    }
}

/// Start a mock JSON-RPC node.
///
/// `handler` receives the JSON-RPC method name and returns the HTTP status
/// and response body. Returns the bound address.
#[allow(dead_code)]
pub async fn start_rpc_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    start_rpc_backend_with_params(move |method, _| handler(method)).await
}

/// Like [`start_rpc_backend`], but `handler` also sees the request `params`.
pub async fn start_rpc_backend_with_params<F>(handler: F) -> SocketAddr
where
    F: Fn(&str, &Value) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(body) = read_body(&mut socket).await else {
                            return;
                        };
                        let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                        let method = request["method"].as_str().unwrap_or_default().to_string();

                        let (status, body) = handler(&method, &request["params"]);
                        let status_text = match status {
                            200 => "200 OK",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// JSON-RPC success body.
#[allow(dead_code)]
pub fn rpc_result(result: Value) -> (u16, String) {
    (200, json!({ "jsonrpc": "2.0", "id": "1", "result": result }).to_string())
}

/// JSON-RPC success body wrapped in `{context, value}`.
#[allow(dead_code)]
pub fn rpc_value(value: Value) -> (u16, String) {
    rpc_result(json!({ "context": { "slot": 100 }, "value": value }))
}

/// JSON-RPC error body.
#[allow(dead_code)]
pub fn rpc_error(code: i64, message: &str) -> (u16, String) {
    (
        200,
        json!({ "jsonrpc": "2.0", "id": "1", "error": { "code": code, "message": message } }).to_string(),
    )
}

/// Decode the base64 wire transaction passed to `sendTransaction`.
#[allow(dead_code)]
pub fn decode_sent_transaction(params: &Value) -> solana_sdk::transaction::Transaction {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    assert_eq!(params[1]["encoding"], "base64");
    let wire = BASE64.decode(params[0].as_str().unwrap()).unwrap();
    bincode::deserialize(&wire).unwrap()
}

/// Bare HTTP 429, as sent by rate-limiting gateways.
#[allow(dead_code)]
pub fn too_many_requests() -> (u16, String) {
    (429, json!({ "jsonrpc": "2.0", "id": "1", "error": { "code": 429, "message": "Too Many Requests" } }).to_string())
}
