use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rsubscan::{
    scan_subdomains, DomainVerifier, FoundSubdomain, MemorySink, ProbeOutcome, RetryPolicy,
    ScanConfig, ScanEngine, ScanError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type RequestLog = Arc<Mutex<HashMap<String, usize>>>;

/// 本地HTTP代理, 只有 a.example.com 返回200, 其他主机直接断开连接
async fn start_mock_proxy() -> (SocketAddr, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(HashMap::new()));

    let server_log = log.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let log = server_log.clone();
            tokio::spawn(async move {
                let _ = handle_connection(stream, log).await;
            });
        }
    });

    (addr, log)
}

async fn handle_connection(mut stream: TcpStream, log: RequestLog) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request = String::from_utf8_lossy(&buf);
    let host = request_host(&request);
    *log.lock().unwrap().entry(host.clone()).or_insert(0) += 1;

    if host == "a.example.com" {
        let body = "<html><head><title>Hi</title></head><body></body></html>";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
    }
    Ok(())
}

/// 代理请求行使用绝对地址: `GET http://host/ HTTP/1.1`
fn request_host(request: &str) -> String {
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default();
    target
        .trim_start_matches("http://")
        .split(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn proxied_config(addr: SocketAddr) -> ScanConfig {
    ScanConfig {
        proxy: Some(format!("http://{}", addr)),
        timeout: Duration::from_secs(2),
        retry_base_delay: Duration::from_millis(5),
        min_length: 1,
        max_length: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_end_to_end_single_live_host() {
    let (addr, log) = start_mock_proxy().await;
    let engine = ScanEngine::new(proxied_config(addr)).unwrap();

    let mut sink = MemorySink::new();
    let reports = engine
        .run(&["example.com".to_string()], &mut sink)
        .await
        .unwrap();

    let expected = FoundSubdomain {
        subdomain: "a.example.com".to_string(),
        title: "Hi".to_string(),
        domain: "example.com".to_string(),
    };
    assert_eq!(sink.rows, vec![expected]);
    assert_eq!(sink.batches, vec![("example.com".to_string(), 1)]);
    assert_eq!(reports[0].found, 1);
    assert_eq!(reports[0].probed, 36);

    let log = log.lock().unwrap().clone();
    assert_eq!(log.len(), 36);
    assert_eq!(log["a.example.com"], 1);
    assert!(log
        .iter()
        .filter(|(host, _)| host.as_str() != "a.example.com")
        .all(|(_, count)| *count == 2));
}

#[tokio::test]
async fn test_rescan_on_same_engine_sends_no_requests() {
    let (addr, log) = start_mock_proxy().await;
    let engine = ScanEngine::new(proxied_config(addr)).unwrap();

    let first = engine.scan_domain("example.com", 1, 1).await.unwrap();
    assert_eq!(first.len(), 1);
    let requests_after_first: usize = log.lock().unwrap().values().sum();

    let second = engine.scan_domain("example.com", 1, 1).await.unwrap();
    assert!(second.is_empty());
    let requests_after_second: usize = log.lock().unwrap().values().sum();
    assert_eq!(requests_after_first, requests_after_second);
}

#[tokio::test]
async fn test_fresh_engines_find_the_same_hosts() {
    let (addr, _log) = start_mock_proxy().await;

    let first = scan_subdomains(vec!["example.com".to_string()], proxied_config(addr))
        .await
        .unwrap();
    let second = scan_subdomains(vec!["example.com".to_string()], proxied_config(addr))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn test_verifier_retries_through_proxy() {
    let (addr, log) = start_mock_proxy().await;
    let verifier = DomainVerifier::new(&proxied_config(addr)).unwrap();
    let policy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
    };

    let outcome = rsubscan::verify::probe_with_retry(&verifier, "b.example.com", &policy).await;
    assert_eq!(outcome, ProbeOutcome::Absent);
    assert_eq!(log.lock().unwrap()["b.example.com"], 3);

    let outcome = rsubscan::verify::probe_with_retry(&verifier, "a.example.com", &policy).await;
    assert_eq!(
        outcome,
        ProbeOutcome::Found {
            fqc: "a.example.com".to_string(),
            title: "Hi".to_string(),
        }
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = ScanConfig {
        min_length: 2,
        max_length: 1,
        ..Default::default()
    };
    assert!(matches!(
        ScanEngine::new(config),
        Err(ScanError::InvalidConfig(_))
    ));

    let result = scan_subdomains(Vec::new(), ScanConfig::default()).await;
    assert!(matches!(result, Err(ScanError::NoDomains)));
}
