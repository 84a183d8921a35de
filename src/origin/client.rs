//! Shared origin HTTP client.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::origin::target::OriginTarget;
use crate::security::VerifiedResource;

/// Errors reaching the origin before its response headers arrive.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("invalid origin URI: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    #[error("failed to build origin request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("origin request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

/// Connection-pooling client for the internal origin.
///
/// Cloning is cheap and shares the pool. No request timeout is applied since a
/// stream may run for hours; only connection setup is bounded.
#[derive(Clone, Debug)]
pub struct OriginClient {
    client: Client<HttpConnector, Body>,
}

impl OriginClient {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }

    /// Issue the single GET for `resource`, forwarding every `Range` value verbatim.
    ///
    /// Resolves once response headers are available; the body is left unread.
    pub async fn fetch(
        &self,
        target: &OriginTarget,
        resource: &VerifiedResource,
        ranges: Vec<HeaderValue>,
    ) -> Result<Response<Incoming>, OriginError> {
        let request = origin_request(target, resource, ranges)?;
        Ok(self.client.request(request).await?)
    }
}

fn origin_request(
    target: &OriginTarget,
    resource: &VerifiedResource,
    ranges: Vec<HeaderValue>,
) -> Result<Request<Body>, OriginError> {
    let uri = target.uri_for(resource)?;

    let mut builder = Request::builder().method(Method::GET).uri(uri);
    for range in ranges {
        builder = builder.header(header::RANGE, range);
    }
    Ok(builder.body(Body::empty())?)
}
