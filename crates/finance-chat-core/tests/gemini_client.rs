use finance_chat_core::ai::{GenerateError, Generator};
use finance_chat_core::GeminiClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single canned HTTP response and hands back the raw request.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
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
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn successful_generation_returns_text() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "A Roth IRA is..."}]}}]}"#,
    )
    .await;

    let client = GeminiClient::new("test-key").with_base_url(&base_url);
    let answer = client
        .generate("gemini-2.5-flash", "What is a Roth IRA?")
        .await
        .unwrap();
    assert_eq!(answer, "A Roth IRA is...");

    let request = server.await.unwrap();
    let lowered = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent HTTP/1.1"));
    assert!(lowered.contains("x-goog-api-key: test-key"));
    assert!(request.contains("What is a Roth IRA?"));
    assert!(!request.contains("key=test-key"));
}

#[tokio::test]
async fn rate_limited_response_is_quota_exceeded() {
    let (base_url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}"#,
    )
    .await;

    let client = GeminiClient::new("test-key").with_base_url(&base_url);
    let result = client.generate("gemini-2.5-flash", "prompt").await;

    match result {
        Err(GenerateError::QuotaExceeded(description)) => {
            assert!(description.contains("RESOURCE_EXHAUSTED"));
        }
        other => panic!("expected quota error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn rejected_key_is_invalid_credential() {
    let (base_url, server) = serve_once(
        "400 Bad Request",
        r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT", "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]}}"#,
    )
    .await;

    let client = GeminiClient::new("bad-key").with_base_url(&base_url);
    let result = client.generate("gemini-2.5-flash", "prompt").await;

    assert!(matches!(result, Err(GenerateError::InvalidCredential(_))));
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_success_body_is_other() {
    let (base_url, server) = serve_once("200 OK", "not json").await;

    let client = GeminiClient::new("test-key").with_base_url(&base_url);
    let result = client.generate("gemini-2.5-flash", "prompt").await;

    assert!(matches!(result, Err(GenerateError::Other(_))));
    server.await.unwrap();
}
