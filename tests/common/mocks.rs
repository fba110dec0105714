use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// One request as seen by the mock server.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub range: Option<String>,
}

/// Canned answer; `content_type: None` omits the header.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
        }
    }

    pub fn with_content_type(status: u16, content_type: &str) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
        }
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Option<MockResponse> + Send + Sync;

/// Minimal HTTP/1.1 server on a loopback port.
///
/// The responder decides the answer per request; returning `None` leaves the
/// connection open without ever answering.
pub struct MockHttpServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Option<MockResponse> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let log = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, log, responder).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Answers every request the same way.
    pub async fn fixed(response: MockResponse) -> Self {
        Self::start(move |_| Some(response.clone())).await
    }

    /// 405 on HEAD, `get` for everything else.
    pub async fn head_not_allowed(get: MockResponse) -> Self {
        Self::start(move |request| {
            if request.method == "HEAD" {
                Some(MockResponse::status(405))
            } else {
                Some(get.clone())
            }
        })
        .await
    }

    /// Accepts connections but never answers.
    pub async fn silent() -> Self {
        Self::start(|_| None).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..read]);
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let range = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .map(|(_, value)| value.trim().to_string());

    let request = RecordedRequest {
        method,
        path,
        range,
    };
    log.lock().unwrap().push(request.clone());

    let Some(response) = responder(&request) else {
        tokio::time::sleep(Duration::from_secs(30)).await;
        return Ok(());
    };

    let mut reply = format!("HTTP/1.1 {} Mock\r\n", response.status);
    if let Some(content_type) = &response.content_type {
        reply.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    reply.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");

    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}
