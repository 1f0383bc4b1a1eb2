//! Minimal scripted HTTP/1.1 server for exercising the fetcher and the tracker.
//! Shared with `hwf-core/tests` through `#[path]`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Vec<u8>,
    declared_len: usize,
    location: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            declared_len: body.len(),
            body,
            location: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"error".to_vec(),
            declared_len: 5,
            location: None,
        }
    }

    /// Announces `declared_len` bytes but closes the connection after `body`.
    pub fn truncated(body: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        Self {
            status: 200,
            body: body.into(),
            declared_len,
            location: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            body: Vec::new(),
            declared_len: 0,
            location: Some(location.into()),
        }
    }
}

type Routes = HashMap<String, Vec<Reply>>;
type Shared<T> = Arc<Mutex<HashMap<String, T>>>;

pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<Mutex<Routes>>,
    hits: Shared<usize>,
    /// Lower-cased header name/value pairs of the latest request per path.
    headers: Shared<Vec<(String, String)>>,
}

impl TestServer {
    /// Each path answers with its replies in order; the last one repeats.
    pub async fn start(routes: Vec<(&str, Vec<Reply>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = routes
            .into_iter()
            .map(|(path, replies)| (path.to_string(), replies))
            .collect();
        let routes = Arc::new(Mutex::new(routes));
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let headers = Arc::new(Mutex::new(HashMap::new()));

        let (task_routes, task_hits, task_headers) = (
            Arc::clone(&routes),
            Arc::clone(&hits),
            Arc::clone(&headers),
        );
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&task_routes);
                let hits = Arc::clone(&task_hits);
                let headers = Arc::clone(&task_headers);
                tokio::spawn(async move {
                    let _ = serve(stream, routes, hits, headers).await;
                });
            }
        });

        Self {
            addr,
            routes,
            hits,
            headers,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Value of header `name` on the latest request to `path`.
    pub fn last_header(&self, path: &str, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.headers
            .lock()
            .unwrap()
            .get(path)?
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
    }

    /// Replaces the script for `path` and resets its hit count.
    pub fn set_route(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), replies);
        self.hits.lock().unwrap().remove(path);
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<Routes>>,
    hits: Shared<usize>,
    headers: Shared<Vec<(String, String)>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let request_headers = head
        .lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    headers.lock().unwrap().insert(path.clone(), request_headers);

    let reply = {
        let mut hits = hits.lock().unwrap();
        let count = hits.entry(path.clone()).or_insert(0);
        let index = *count;
        *count += 1;
        routes
            .lock()
            .unwrap()
            .get(&path)
            .and_then(|replies| replies.get(index).or_else(|| replies.last()).cloned())
            .unwrap_or_else(|| Reply::status(404))
    };

    let mut response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status, reply.declared_len
    );
    if let Some(location) = &reply.location {
        response.push_str(&format!("Location: {location}\r\n"));
    }
    response.push_str("\r\n");
    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&reply.body).await?;
    stream.flush().await?;
    stream.shutdown().await
}
