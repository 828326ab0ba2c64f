//! Scripted HTTP transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use diskspeed_fetch::{
    ApiRequest, ApiResponse, HttpClient, ManualClock, Method, StreamingResponse, UploadBody,
};
use futures_util::{StreamExt, stream};

#[derive(Debug)]
pub struct FakeError(pub String);

impl std::fmt::Display for FakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeError {}

/// What a route answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Text(u16, String),
    Bytes {
        status: u16,
        data: Vec<u8>,
        content_length: Option<u64>,
        /// Size of the pieces the body stream yields.
        piece: usize,
        /// Clock advance per piece pulled from the body.
        per_piece: Duration,
    },
    /// Body that yields `data` in `piece`-sized pieces, then fails.
    Cut {
        data: Vec<u8>,
        content_length: Option<u64>,
        piece: usize,
        error: String,
    },
    Fail(String),
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn body(data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        Reply::Bytes {
            status: 200,
            data,
            content_length: Some(len),
            piece: 8192,
            per_piece: Duration::ZERO,
        }
    }

    pub fn href(url: &str) -> Self {
        Reply::Text(200, format!(r#"{{"href":"{url}","method":"GET","templated":false}}"#))
    }
}

struct Route {
    method: Method,
    prefix: String,
    replies: VecDeque<Reply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Answers requests from routes matched by method and URL prefix.
///
/// A route's replies are consumed in order; the last one repeats. Requests
/// that match no route get a 404.
#[derive(Default)]
pub struct FakeClient {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Call>>,
    uploads: Mutex<Vec<u64>>,
    clock: Option<Arc<ManualClock>>,
    latency: Duration,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by `latency` on every request.
    pub fn with_clock(mut self, clock: Arc<ManualClock>, latency: Duration) -> Self {
        self.clock = Some(clock);
        self.latency = latency;
        self
    }

    pub fn on(self, method: Method, prefix: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.prefix == prefix)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    prefix: prefix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, prefix: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.url.starts_with(prefix))
            .collect()
    }

    /// Bytes received by each completed upload.
    pub fn uploaded(&self) -> Vec<u64> {
        self.uploads.lock().unwrap().clone()
    }

    fn reply(&self, method: Method, url: &str, headers: &[(String, String)]) -> Reply {
        self.calls.lock().unwrap().push(Call {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
        });
        if let Some(clock) = &self.clock {
            clock.advance(self.latency);
        }

        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && url.starts_with(&r.prefix))
        else {
            return Reply::Status(404);
        };
        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap_or(Reply::Status(500))
        } else {
            route.replies.front().cloned().unwrap_or(Reply::Status(500))
        }
    }

    async fn respond(reply: Reply) -> Result<ApiResponse, FakeError> {
        match reply {
            Reply::Hang => std::future::pending().await,
            Reply::Fail(message) => Err(FakeError(message)),
            Reply::Status(status) => Ok(ApiResponse {
                status,
                content_length: None,
                body: String::new(),
            }),
            Reply::Text(status, body) => Ok(ApiResponse {
                status,
                content_length: Some(body.len() as u64),
                body,
            }),
            Reply::Bytes {
                status,
                content_length,
                ..
            } => Ok(ApiResponse {
                status,
                content_length,
                body: String::new(),
            }),
            Reply::Cut { content_length, .. } => Ok(ApiResponse {
                status: 200,
                content_length,
                body: String::new(),
            }),
        }
    }
}

impl HttpClient for FakeClient {
    type Error = FakeError;

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, FakeError> {
        let reply = self.reply(request.method, &request.url, &request.headers);
        Self::respond(reply).await
    }

    async fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<StreamingResponse<FakeError>, FakeError> {
        match self.reply(Method::Get, url, headers) {
            Reply::Hang => std::future::pending().await,
            Reply::Fail(message) => Err(FakeError(message)),
            Reply::Status(status) => Ok(StreamingResponse {
                status,
                content_length: None,
                body: Box::pin(stream::empty::<Result<Bytes, FakeError>>()),
            }),
            Reply::Text(status, body) => Ok(StreamingResponse {
                status,
                content_length: Some(body.len() as u64),
                body: Box::pin(stream::iter([Ok::<_, FakeError>(Bytes::from(body))])),
            }),
            Reply::Bytes {
                status,
                data,
                content_length,
                piece,
                per_piece,
            } => {
                let pieces: Vec<Bytes> = data
                    .chunks(piece.max(1))
                    .map(Bytes::copy_from_slice)
                    .collect();
                let clock = self.clock.clone();
                let body = stream::iter(pieces).map(move |piece| {
                    if let Some(clock) = &clock {
                        clock.advance(per_piece);
                    }
                    Ok::<_, FakeError>(piece)
                });
                Ok(StreamingResponse {
                    status,
                    content_length,
                    body: Box::pin(body),
                })
            }
            Reply::Cut {
                data,
                content_length,
                piece,
                error,
            } => {
                let pieces = data
                    .chunks(piece.max(1))
                    .map(|p| Ok::<_, FakeError>(Bytes::copy_from_slice(p)))
                    .collect::<Vec<_>>();
                let body = stream::iter(pieces).chain(stream::once(async move {
                    Err::<Bytes, _>(FakeError(error))
                }));
                Ok(StreamingResponse {
                    status: 200,
                    content_length,
                    body: Box::pin(body),
                })
            }
        }
    }

    async fn upload(
        &self,
        url: &str,
        headers: &[(String, String)],
        mut body: UploadBody,
    ) -> Result<ApiResponse, FakeError> {
        let mut received = 0u64;
        while let Some(chunk) = body.stream.next().await {
            match chunk {
                Ok(bytes) => received += bytes.len() as u64,
                Err(e) => return Err(FakeError(e.to_string())),
            }
        }
        self.uploads.lock().unwrap().push(received);

        let reply = self.reply(Method::Put, url, headers);
        Self::respond(reply).await
    }
}

/// A file of `len` bytes in a fresh temp dir.
pub fn temp_file(len: usize) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, vec![0xA5u8; len]).unwrap();
    (dir, path)
}
