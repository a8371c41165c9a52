//! End-to-end tests: a real proxy in front of mock backends.

use std::io::Read;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use sanitizing_proxy::config::PipelineConfig;
use sanitizing_proxy::pipeline::{standard_registry, Module, ModuleRegistry};

mod common;

use common::MockResponse;

fn pipeline(configure: impl FnOnce(&mut PipelineConfig)) -> ModuleRegistry {
    let mut config = PipelineConfig::default();
    configure(&mut config);
    standard_registry(&config)
}

fn brotli_decode(body: &[u8]) -> String {
    let mut plain = String::new();
    brotli::Decompressor::new(body, 4096)
        .read_to_string(&mut plain)
        .unwrap();
    plain
}

#[tokio::test]
async fn redacts_addresses_end_to_end() {
    let backend = common::start_mock_backend(MockResponse::ok(
        "text/plain",
        "client 192.168.1.20 via 2001:db8:85a3:0:0:8a2e:370:7334",
    ))
    .await;
    let registry = pipeline(|p| p.compressor.enabled = false);
    let (proxy, shutdown) = common::start_proxy(backend, registry, |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/status"))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    let length: usize = res.headers()["content-length"].to_str().unwrap().parse().unwrap();
    let body = res.text().await.unwrap();
    assert_eq!(body, "client [REDACTED] via [REDACTED]");
    assert_eq!(body.len(), length);

    shutdown.trigger();
}

#[tokio::test]
async fn compresses_text_over_the_wire() {
    let backend = common::start_mock_backend(MockResponse::ok(
        "text/html; charset=utf-8",
        "<html><body>origin 10.20.30.40</body></html>",
    ))
    .await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["content-encoding"], "br");
    assert_eq!(res.headers()["vary"], "Accept-Encoding");
    let body = res.bytes().await.unwrap();
    assert_eq!(
        brotli_decode(&body),
        "<html><body>origin [REDACTED]</body></html>"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn binary_content_is_not_compressed() {
    let image: Vec<u8> = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec();
    let backend = common::start_mock_backend(MockResponse::ok("image/png", image.clone())).await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/logo.png"))
        .send()
        .await
        .unwrap();

    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.bytes().await.unwrap().as_ref(), image.as_slice());

    shutdown.trigger();
}

#[tokio::test]
async fn zero_length_backend_response_passes_through() {
    let backend = common::start_mock_backend(MockResponse::ok("text/plain", "")).await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-encoding").is_none());
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn chunked_empty_body_becomes_no_content() {
    let backend =
        common::start_mock_backend(MockResponse::ok("text/plain", "").chunked()).await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn chunked_body_is_redacted_with_fixed_length() {
    let backend = common::start_mock_backend(
        MockResponse::ok("application/octet-stream", "peer 172.16.0.9 done").chunked(),
    )
    .await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert!(res.headers().get("transfer-encoding").is_none());
    assert_eq!(res.headers()["content-length"], "20");
    assert_eq!(res.text().await.unwrap(), "peer [REDACTED] done");

    shutdown.trigger();
}

#[tokio::test]
async fn emptying_module_yields_no_content() {
    let backend = common::start_mock_backend(MockResponse::ok("text/plain", "classified")).await;
    let mut registry = ModuleRegistry::new();
    registry.register(
        Module::new("blackout", |_: Bytes, _: &mut HeaderMap| Bytes::new())
            .with_description("Drops every body"),
    );
    let (proxy, shutdown) = common::start_proxy(backend, registry, |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn size_limit_applies_before_compression() {
    let body = "x".repeat(4096);
    let backend = common::start_mock_backend(MockResponse::ok("text/plain", body)).await;
    let registry = pipeline(|p| p.size_limiter.max_bytes = 1000);
    let (proxy, shutdown) = common::start_proxy(backend, registry, |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["content-encoding"], "br");
    let plain = brotli_decode(&res.bytes().await.unwrap());
    assert_eq!(plain.len(), 1000);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_answers_bad_gateway() {
    let backend = common::unused_addr().await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}

#[tokio::test]
async fn forwards_request_id_and_strips_accept_encoding() {
    let seen = Arc::new(Mutex::new(String::new()));
    let recorder = seen.clone();
    let backend = common::start_backend(move |head| {
        *recorder.lock().unwrap() = head.to_ascii_lowercase();
        MockResponse::ok("text/plain", "ok")
    })
    .await;
    let (proxy, shutdown) = common::start_proxy(backend, pipeline(|_| {}), |_| {}).await;

    let res = common::client()
        .get(format!("http://{proxy}/items?page=2"))
        .header("accept-encoding", "gzip, br")
        .send()
        .await
        .unwrap();

    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(request_id.len(), 36);

    let head = seen.lock().unwrap().clone();
    assert!(head.starts_with("get /items?page=2 http/1.1"));
    assert!(head.contains(&format!("x-request-id: {request_id}")));
    assert!(!head.contains("accept-encoding"));
    assert!(head.contains(&format!("host: {backend}")));

    shutdown.trigger();
}

#[tokio::test]
async fn reject_policy_turns_slow_pipeline_into_bad_gateway() {
    let backend = common::start_mock_backend(MockResponse::ok("text/plain", "slow")).await;
    let mut registry = ModuleRegistry::new();
    registry.register(Module::new("stall", |content: Bytes, _: &mut HeaderMap| {
        std::thread::sleep(std::time::Duration::from_millis(300));
        content
    }));
    let (proxy, shutdown) = common::start_proxy(backend, registry, |config| {
        config.pipeline.budget_ms = Some(20);
        config.pipeline.budget_policy = sanitizing_proxy::config::BudgetPolicy::Reject;
    })
    .await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}
