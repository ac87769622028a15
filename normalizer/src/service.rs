use crate::errors::NormalizerError;
use crate::metrics_defs::{PASS_THROUGH, REDIRECTS, REQUEST_DURATION, UPSTREAM_ERRORS};
use crate::rules::{Decision, Normalizer};
use http::header::LOCATION;
use http::{Uri, Version};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use shared::headers::{add_via_header, filter_hop_by_hop};
use shared::http::{empty_body, full_body, make_boxed_error_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

const VIA_NAME: &str = "slugmap";

type ServiceResponse = Response<BoxBody<Bytes, NormalizerError>>;

fn redirect_response(location: &str) -> Result<ServiceResponse, NormalizerError> {
    Ok(Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .body(empty_body())?)
}

fn upstream_error_status(error: &NormalizerError) -> StatusCode {
    match error {
        NormalizerError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// The content application behind the normalizer.
struct Upstream {
    client: Client<HttpConnector, Incoming>,
    base: Url,
    timeout: Duration,
}

impl Upstream {
    fn new(base: Url, timeout: Duration) -> Self {
        Upstream {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            base,
            timeout,
        }
    }

    fn name(&self) -> String {
        self.base.host_str().unwrap_or(self.base.as_str()).to_string()
    }

    /// Configured base with the path and query of the incoming request.
    fn target(&self, uri: &Uri) -> Result<Uri, NormalizerError> {
        let mut url = self.base.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url.as_str()
            .parse::<Uri>()
            .map_err(|e| NormalizerError::InternalError(format!("invalid upstream uri {url}: {e}")))
    }

    /// Sends the request on unchanged apart from hop-by-hop headers and collects the whole
    /// response. The timeout covers the body too.
    async fn forward(&self, req: Request<Incoming>) -> Result<Response<Bytes>, NormalizerError> {
        let (mut parts, body) = req.into_parts();
        parts.uri = self.target(&parts.uri)?;
        filter_hop_by_hop(&mut parts.headers, parts.version);
        add_via_header(&mut parts.headers, parts.version, VIA_NAME);
        // The pooled client only speaks HTTP/1.1 to the upstream
        parts.version = Version::HTTP_11;

        let exchange = async {
            let response = self
                .client
                .request(Request::from_parts(parts, body))
                .await
                .map_err(|e| NormalizerError::UpstreamRequestFailed(self.name(), e.to_string()))?;

            let (mut parts, body) = response.into_parts();
            filter_hop_by_hop(&mut parts.headers, parts.version);
            add_via_header(&mut parts.headers, parts.version, VIA_NAME);

            let body = body
                .collect()
                .await
                .map_err(|e| NormalizerError::ResponseBodyError(e.to_string()))?
                .to_bytes();
            Ok::<_, NormalizerError>(Response::from_parts(parts, body))
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| NormalizerError::UpstreamTimeout(self.name()))?
    }
}

/// Answers with a permanent redirect when the normalizer rewrites the path, and forwards
/// the request to the content application otherwise.
pub struct NormalizerService {
    normalizer: Normalizer,
    upstream: Arc<Upstream>,
}

impl NormalizerService {
    pub fn new(normalizer: Normalizer, upstream: Url, upstream_timeout: Duration) -> Self {
        Self {
            normalizer,
            upstream: Arc::new(Upstream::new(upstream, upstream_timeout)),
        }
    }
}

impl Service<Request<Incoming>> for NormalizerService {
    type Response = ServiceResponse;
    type Error = NormalizerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let started = Instant::now();
        let decision = self.normalizer.decide(req.uri().path(), req.uri().query());

        match decision {
            Decision::Redirect { location, rule } => {
                tracing::debug!(
                    path = %req.uri().path(),
                    %location,
                    rule = rule.as_str(),
                    "redirecting"
                );
                counter!(REDIRECTS, "rule" => rule.as_str()).increment(1);
                let res = redirect_response(&location);
                histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
                Box::pin(async move { res })
            }
            Decision::PassThrough => {
                counter!(PASS_THROUGH).increment(1);
                let upstream = self.upstream.clone();

                Box::pin(async move {
                    let path = req.uri().path().to_string();
                    let res = match upstream.forward(req).await {
                        Ok(response) => response.map(full_body),
                        Err(e) => {
                            tracing::warn!(%path, error = %e, "upstream request failed");
                            counter!(UPSTREAM_ERRORS).increment(1);
                            make_boxed_error_response(upstream_error_status(&e))
                        }
                    };
                    histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
                    Ok(res)
                })
            }
        }
    }
}
