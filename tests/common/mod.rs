//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sanitizing_proxy::config::ProxyConfig;
use sanitizing_proxy::http::HttpServer;
use sanitizing_proxy::lifecycle::Shutdown;
use sanitizing_proxy::pipeline::ModuleRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A canned backend response.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub chunked: bool,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: "200 OK",
            content_type,
            body: body.into(),
            chunked: false,
        }
    }

    /// Send the body with chunked transfer encoding instead of a length.
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    fn to_wire(&self) -> Vec<u8> {
        let mut wire = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n",
            self.status, self.content_type
        )
        .into_bytes();

        if self.chunked {
            wire.extend_from_slice(b"Transfer-Encoding: chunked\r\n\r\n");
            if !self.body.is_empty() {
                wire.extend_from_slice(format!("{:x}\r\n", self.body.len()).as_bytes());
                wire.extend_from_slice(&self.body);
                wire.extend_from_slice(b"\r\n");
            }
            wire.extend_from_slice(b"0\r\n\r\n");
        } else {
            wire.extend_from_slice(format!("Content-Length: {}\r\n\r\n", self.body.len()).as_bytes());
            wire.extend_from_slice(&self.body);
        }
        wire
    }
}

/// Start a mock backend on an ephemeral port.
///
/// `respond` sees the raw request head and picks the response.
pub async fn start_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let response = respond(&head);
                        let _ = socket.write_all(&response.to_wire()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that always answers with `response`.
#[allow(dead_code)]
pub async fn start_mock_backend(response: MockResponse) -> SocketAddr {
    start_backend(move |_| response.clone()).await
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Run a proxy in front of `backend` and return its address.
pub async fn start_proxy(
    backend: SocketAddr,
    registry: ModuleRegistry,
    configure: impl FnOnce(&mut ProxyConfig),
) -> (SocketAddr, Shutdown) {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backend.address = backend.to_string();
    configure(&mut config);

    let server = HttpServer::new(config, Arc::new(registry)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
