/*!
 * Minimal HTTP server answering every request with a canned response
 *
 * Used to exercise the real HTTP clients without leaving the machine.
 */

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request line, e.g. `POST /translate HTTP/1.1`
    pub request_line: String,
    /// Raw header block
    pub headers: String,
    /// Body
    pub body: String,
}

impl RecordedRequest {
    /// Body parsed as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Running stub server; stops when dropped
pub struct StubServer {
    /// Base URL, e.g. `http://127.0.0.1:40123`
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Start a server answering with `status` and `body`
    pub async fn start(status: u16, body: impl Into<String>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let body = body.into();

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                tokio::spawn(async move {
                    // Recorded before answering so callers see it once the response arrives
                    if let Some(request) = read_request(&mut stream).await {
                        recorded.lock().push(request);
                        let _ = write_response(&mut stream, status, &body).await;
                    }
                });
            }
        });

        StubServer { url, requests, handle }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = find(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let mut lines = head.splitn(2, "\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers = lines.next().unwrap_or_default().to_string();
    let end = (header_end + content_length).min(buffer.len());

    Some(RecordedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&buffer[header_end..end]).to_string(),
    })
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
