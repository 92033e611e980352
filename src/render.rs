// src/render.rs
// Rendering handlers used by the binary: proxy to an upstream renderer, or plain 404

use actix_web::http::header::{self, HeaderName};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::time::Duration;

use crate::fallback::RenderHandler;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

thread_local! {
    // awc clients are not Send; each worker keeps its own pool.
    static CLIENT: awc::Client = awc::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .disable_redirects()
        .finish();
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    name == header::CONNECTION
        || name == header::TRANSFER_ENCODING
        || name == header::TE
        || name == header::TRAILER
        || name == header::UPGRADE
        || name == header::PROXY_AUTHENTICATE
        || name == header::PROXY_AUTHORIZATION
        || name.as_str() == "keep-alive"
}

fn has_body(req: &HttpRequest) -> bool {
    let headers = req.headers();
    headers.contains_key(header::TRANSFER_ENCODING)
        || headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .is_some_and(|len| len > 0)
}

/// Forwards requests to an HTTP rendering process and streams its answer back.
#[derive(Debug, Clone)]
pub struct UpstreamRenderer {
    upstream: String,
}

impl UpstreamRenderer {
    pub fn new(upstream: &str) -> Self {
        Self {
            upstream: upstream.trim_end_matches('/').to_string(),
        }
    }

    /// Full upstream URL for a request target.
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.upstream, path_and_query)
    }

    async fn forward(url: String, req: HttpRequest, payload: web::Payload) -> HttpResponse {
        let client = CLIENT.with(|client| client.clone());

        // Pass encoded bodies through untouched; Content-Encoding is copied back verbatim.
        let mut upstream_req = client.request(req.method().clone(), &url).no_decompress();
        for (name, value) in req.headers() {
            if !is_hop_by_hop(name) && name != header::HOST && name != header::CONTENT_LENGTH {
                upstream_req = upstream_req.append_header((name.clone(), value.clone()));
            }
        }
        if let Some(peer) = req.peer_addr() {
            upstream_req = upstream_req.insert_header(("x-forwarded-for", peer.ip().to_string()));
        }
        if let Some(host) = req.headers().get(header::HOST) {
            upstream_req = upstream_req.insert_header(("x-forwarded-host", host.clone()));
        }
        let scheme = req.connection_info().scheme().to_string();
        upstream_req = upstream_req.insert_header(("x-forwarded-proto", scheme));

        let sent = if has_body(&req) {
            upstream_req.send_stream(payload).await
        } else {
            upstream_req.send().await
        };
        let upstream_res = match sent {
            Ok(res) => res,
            Err(err) => {
                log::error!("Upstream request to {} failed: {}", url, err);
                return HttpResponse::BadGateway().body("Bad gateway");
            }
        };

        let mut builder = HttpResponse::build(upstream_res.status());
        for (name, value) in upstream_res.headers() {
            if !is_hop_by_hop(name) && name != header::CONTENT_LENGTH {
                builder.append_header((name.clone(), value.clone()));
            }
        }
        builder.streaming(upstream_res)
    }
}

impl RenderHandler for UpstreamRenderer {
    fn render(&self, req: HttpRequest, payload: web::Payload) -> LocalBoxFuture<'static, HttpResponse> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target_url(path_and_query);
        Self::forward(url, req, payload).boxed_local()
    }
}

/// Used when no rendering process is configured.
#[derive(Debug, Clone, Default)]
pub struct NotFoundRenderer;

impl RenderHandler for NotFoundRenderer {
    fn render(&self, _req: HttpRequest, _payload: web::Payload) -> LocalBoxFuture<'static, HttpResponse> {
        async { HttpResponse::NotFound().body("Not found") }.boxed_local()
    }
}
