//! Shared fixtures: a recording transport and a one-shot HTTP server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use whatsappgo::config::GatewayConfig;
use whatsappgo::types::RawEvent;
use whatsappgo::whatsapp::client::{GatewayRequest, GatewayResponse, GatewayTransport};
use whatsappgo::whatsapp::WhatsAppError;

pub const BASE_URL: &str = "http://gateway.test";
pub const TOKEN: &str = "tok-123";

/// Transport that records every request and replies with a canned response.
pub struct RecordingTransport {
    requests: Mutex<Vec<GatewayRequest>>,
    status: u16,
    body: Vec<u8>,
}

impl RecordingTransport {
    pub fn replying(status: u16, body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            status,
            body: body.to_vec(),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::replying(200, br#"{"success":true}"#)
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl GatewayTransport for RecordingTransport {
    async fn post(&self, request: GatewayRequest) -> Result<GatewayResponse, WhatsAppError> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
        Ok(GatewayResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn configured() -> GatewayConfig {
    GatewayConfig::new(TOKEN, BASE_URL)
}

pub fn raw(value: Value) -> RawEvent {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be a JSON object, got {other}"),
    }
}

/// Serve exactly one HTTP response and report the raw request received.
pub async fn serve_once(status_line: &str, body: &[u8]) -> (String, oneshot::Receiver<String>) {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };

    let status_line_owned = status_line.to_owned();
    let body_owned = body.to_vec();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let mut response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body_owned.len()
            )
            .into_bytes();
            response.extend_from_slice(&body_owned);
            let _ = socket.write_all(&response).await;
            let _ = tx.send(request);
        }
    });

    (format!("http://{addr}"), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0_u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}
