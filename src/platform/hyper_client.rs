// ABOUTME: PlatformClient implementation on the pooled hyper-util client.
// ABOUTME: Speaks http and https; one instance is shared by every call of a run.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use snafu::ResultExt;

use super::client::{Method, PlatformClient, PlatformRequest, PlatformResponse};
use super::error::{PlatformError, TlsSetupSnafu};

/// HTTP/1 client with connection pooling. No request timeout is applied.
///
/// `https` urls are verified against the bundled webpki roots.
#[derive(Clone)]
pub struct HyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperClient {
    pub fn new() -> Result<Self, PlatformError> {
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .context(TlsSetupSnafu)?
            .https_or_http()
            .enable_http1()
            .build();
        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self { inner })
    }
}

fn to_hyper_method(method: Method) -> hyper::Method {
    match method {
        Method::Get => hyper::Method::GET,
        Method::Post => hyper::Method::POST,
        Method::Put => hyper::Method::PUT,
        Method::Delete => hyper::Method::DELETE,
    }
}

fn transport(url: &str, message: impl ToString) -> PlatformError {
    PlatformError::Transport {
        url: url.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl PlatformClient for HyperClient {
    async fn execute(&self, request: PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        let PlatformRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = hyper::Request::builder()
            .method(to_hyper_method(method))
            .uri(url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = Full::new(Bytes::from(body.unwrap_or_default()));
        let req = builder
            .body(body)
            .map_err(|e| transport(&url, format!("failed to build request: {e}")))?;

        tracing::debug!("{} {}", method, url);

        let resp = self
            .inner
            .request(req)
            .await
            .map_err(|e| transport(&url, e))?;

        let status = resp.status().as_u16();
        let collected = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| transport(&url, format!("failed to read response: {e}")))?;
        let body_bytes = collected.to_bytes();

        tracing::debug!("{} {} -> {}", method, url, status);

        Ok(PlatformResponse {
            status,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        })
    }
}
