use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

/// A small, fully-buffered request: API calls, probes and pings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` body.
    pub form: Option<Vec<(String, String)>>,
    /// Overrides the client-wide timeout.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            form: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        let mut request = Self::new(Method::Post, url);
        request.form = Some(form);
        request
    }

    #[must_use]
    pub fn header(mut self, (key, value): (String, String)) -> Self {
        self.headers.push((key, value));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    /// Response text; empty for `HEAD`.
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response whose body has not been read yet.
pub struct StreamingResponse<E> {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, E>>,
}

impl<E> StreamingResponse<E> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request body produced chunk by chunk while it is being sent.
pub struct UploadBody {
    pub length: u64,
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

/// Asynchronous HTTP transport.
///
/// The engine only talks to the network through this trait, so tests and
/// embedders can substitute their own transport.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Scripted fakes in the integration tests
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a request and buffer the whole response.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, Self::Error>> + Send;

    /// `GET` that completes as soon as the response headers arrive.
    ///
    /// Non-success statuses are returned, not turned into errors.
    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<StreamingResponse<Self::Error>, Self::Error>> + Send;

    /// `PUT` with a streamed body.
    fn upload(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: UploadBody,
    ) -> impl Future<Output = Result<ApiResponse, Self::Error>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    type Error = C::Error;

    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, Self::Error>> + Send {
        (**self).send(request)
    }

    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<StreamingResponse<Self::Error>, Self::Error>> + Send {
        (**self).stream(url, headers)
    }

    fn upload(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: UploadBody,
    ) -> impl Future<Output = Result<ApiResponse, Self::Error>> + Send {
        (**self).upload(url, headers, body)
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
    use serde::{Deserialize, Serialize};

    use super::*;

    /// Transport settings for [`ReqwestClient`].
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ClientSettings {
        pub timeout_secs: u64,
        pub max_redirects: usize,
        pub user_agent: String,
        /// Proxy URLs. `https://` proxies carry HTTPS traffic, the rest HTTP.
        pub proxies: Vec<String>,
    }

    impl Default for ClientSettings {
        fn default() -> Self {
            Self {
                timeout_secs: 60,
                max_redirects: 3,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                    .to_string(),
                proxies: Vec::new(),
            }
        }
    }

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a client with [`ClientSettings::default`].
        pub fn new() -> Result<Self, reqwest::Error> {
            Self::with_settings(&ClientSettings::default())
        }

        pub fn with_settings(settings: &ClientSettings) -> Result<Self, reqwest::Error> {
            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
                .user_agent(settings.user_agent.as_str());

            let (secure, plain): (Vec<&String>, Vec<&String>) = settings
                .proxies
                .iter()
                .partition(|p| p.starts_with("https://"));
            for proxy in secure {
                builder = builder.proxy(reqwest::Proxy::https(proxy.as_str())?);
            }
            for proxy in plain {
                builder = builder.proxy(reqwest::Proxy::http(proxy.as_str())?);
            }

            Ok(Self {
                client: builder.build()?,
            })
        }

        fn builder(
            &self,
            method: Method,
            url: &str,
            headers: &[(String, String)],
        ) -> reqwest::RequestBuilder {
            let method = match method {
                Method::Get => reqwest::Method::GET,
                Method::Head => reqwest::Method::HEAD,
                Method::Put => reqwest::Method::PUT,
                Method::Post => reqwest::Method::POST,
                Method::Delete => reqwest::Method::DELETE,
            };
            let mut request = self.client.request(method, url);
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }
            request
        }
    }

    fn content_length(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Self::Error> {
            let mut builder = self.builder(request.method, &request.url, &request.headers);
            if let Some(form) = &request.form {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(form)
                    .finish();
                builder = builder
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(encoded);
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let content_length = content_length(response.headers());
            let body = if request.method == Method::Head {
                String::new()
            } else {
                response.text().await?
            };

            Ok(ApiResponse {
                status,
                content_length,
                body,
            })
        }

        async fn stream(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<StreamingResponse<Self::Error>, Self::Error> {
            let response = self.builder(Method::Get, url, headers).send().await?;
            let status = response.status().as_u16();
            let content_length = content_length(response.headers());

            Ok(StreamingResponse {
                status,
                content_length,
                body: Box::pin(response.bytes_stream()),
            })
        }

        async fn upload(
            &self,
            url: &str,
            headers: &[(String, String)],
            body: UploadBody,
        ) -> Result<ApiResponse, Self::Error> {
            let response = self
                .builder(Method::Put, url, headers)
                .header(CONTENT_LENGTH, body.length)
                .body(reqwest::Body::wrap_stream(body.stream))
                .send()
                .await?;
            let status = response.status().as_u16();
            let content_length = content_length(response.headers());
            let body = response.text().await?;

            Ok(ApiResponse {
                status,
                content_length,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{ClientSettings, ReqwestClient};
