//! EndOfLifeClient against a loopback HTTP responder.

use eol_source::{EndOfLifeClient, EolConfig, ReleaseSource, SourceError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one canned response and return the base URL plus the
/// request line the client sent.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();

        let text = String::from_utf8_lossy(&request).to_string();
        text.lines().next().unwrap_or_default().to_string()
    });

    (format!("http://{addr}/api/v1"), handle)
}

#[tokio::test]
async fn fetch_decodes_releases_in_order() {
    let body = concat!(
        r#"{"result":{"releases":[{"name":"41","isEol":false},"#,
        r#"{"name":"40","isEol":false},{"name":"39","isEol":true}]}}"#
    );
    let (base_url, server) = serve_once("HTTP/1.1 200 OK", body).await;

    let client = EndOfLifeClient::new(EolConfig::new(&base_url)).expect("client");
    let releases = client.fetch("fedora").await.expect("fetch");

    let names: Vec<&str> = releases.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["41", "40", "39"]);
    assert!(releases[2].is_eol);

    let request_line = server.await.expect("server task");
    assert_eq!(request_line, "GET /api/v1/products/fedora HTTP/1.1");
}

#[tokio::test]
async fn non_success_status_is_reported_per_family() {
    let (base_url, server) = serve_once("HTTP/1.1 502 Bad Gateway", "{}").await;

    let client = EndOfLifeClient::new(EolConfig::new(&base_url)).expect("client");
    let err = client.fetch("debian").await.unwrap_err();

    match err {
        SourceError::Status { family, status } => {
            assert_eq!(family, "debian");
            assert_eq!(status, 502);
        }
        other => panic!("expected status error, got {other:?}"),
    }
    server.await.expect("server task");
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (base_url, server) = serve_once("HTTP/1.1 200 OK", "not json").await;

    let client = EndOfLifeClient::new(EolConfig::new(&base_url)).expect("client");
    let err = client.fetch("ubuntu").await.unwrap_err();

    assert!(matches!(err, SourceError::Decode { .. }));
    server.await.expect("server task");
}

#[tokio::test]
async fn unreachable_host_is_http_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let config = EolConfig::new(&format!("http://{addr}/api/v1")).with_timeout_secs(2);
    let client = EndOfLifeClient::new(config).expect("client");
    let err = client.fetch("ubuntu").await.unwrap_err();

    assert!(matches!(err, SourceError::Http { .. }));
    assert_eq!(err.family(), Some("ubuntu"));
}
