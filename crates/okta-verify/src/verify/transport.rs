//! HTTP seam between the enrollment client and the network.
//!
//! The enrollment protocol only needs "send a request, get status and body
//! back". [`HttpTransport`] captures exactly that so the host can supply its
//! own pipeline; [`ReqwestTransport`] is the stand-alone implementation.
//! Status codes are returned as-is, interpretation is the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};

use crate::verify::types::*;

/// HTTP method subset used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Builder: append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request, once. No retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Only failures to complete the exchange are errors; any status code
    /// is a successful return.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VerifyError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  reqwest implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// [`HttpTransport`] over a shared `reqwest::Client`.
///
/// TLS validation is the client's (rustls with native roots). Compressed
/// responses are negotiated and inflated by the client. Redirects are never
/// followed: a 3xx is returned to the caller like any other status.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout` of `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, VerifyError> {
        let client = client_builder(timeout).build().map_err(|e| VerifyError::Connection {
            url: String::new(),
            message: format!("Failed to create HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }

    /// Wrap a caller-built client. Its redirect policy is used as-is.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn client_builder(timeout: Option<Duration>) -> ClientBuilder {
    let builder = Client::builder()
        .gzip(true)
        .deflate(true)
        .redirect(reqwest::redirect::Policy::none());
    match timeout {
        Some(t) => builder.timeout(t),
        None => builder,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VerifyError> {
        let url = request.url.clone();
        let connection_error = |e: reqwest::Error| VerifyError::Connection {
            url: url.clone(),
            message: e.to_string(),
        };

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(connection_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(connection_error)?;

        log::debug!("{:?} {} -> HTTP {}", request.method, request.url, status);
        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one request off `stream`, body included. Returns the request line.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let body_len = head
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < head_end + body_len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        head.lines().next().unwrap_or_default().to_string()
    }

    /// Loopback server: `/login` answers 200, every other path 302 to it.
    /// Returns the base URL and the number of requests served.
    async fn redirecting_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let line = read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = if line.contains(" /login ") {
                    "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}"
                } else {
                    "HTTP/1.1 302 Found\r\nLocation: /login\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                };
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (base, served)
    }

    /// The production client settings, minus any proxy from the environment.
    fn loopback_transport(timeout: Option<Duration>) -> ReqwestTransport {
        ReqwestTransport::from_client(client_builder(timeout).no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn keys_redirect_is_returned_not_followed() {
        let (base, served) = redirecting_server().await;
        let transport = loopback_transport(Some(Duration::from_secs(5)));

        let resp = transport
            .send(HttpRequest::get(format!("{}/oauth2/v1/keys", base)))
            .await
            .unwrap();
        assert_eq!(resp.status, 302);
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registration_redirect_sends_token_once() {
        let (base, served) = redirecting_server().await;
        let transport = loopback_transport(Some(Duration::from_secs(5)));

        let request = HttpRequest::post(format!("{}/idp/authenticators", base), "{\"k\":1}")
            .with_header("Authorization", "OTDT token")
            .with_header("Content-Type", "application/json");
        let resp = transport.send(request).await.unwrap();
        assert_eq!(resp.status, 302);
        assert!(resp.body.is_empty());
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plain_success_reads_body() {
        let (base, served) = redirecting_server().await;
        let transport = loopback_transport(None);

        let resp = transport.send(HttpRequest::get(format!("{}/login", base))).await.unwrap();
        assert_eq!(resp, HttpResponse { status: 200, body: "{}".into() });
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_builders() {
        let req = HttpRequest::post("https://acme.okta.com/x", "{}")
            .with_header("Authorization", "OTDT abc")
            .with_header("Content-Type", "application/json");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("authorization"), Some("OTDT abc"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("Accept"), None);
        assert_eq!(req.body.as_deref(), Some("{}"));

        let get = HttpRequest::get("https://acme.okta.com/y");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());
    }
}
