//! Test server management utilities
//!
//! In-process frontdoor servers on ephemeral ports, plus a rendering handler
//! that records how often it was called.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpRequest, HttpResponse};
use frontdoor::server::{self, RunningServer, ServerOptions};
use frontdoor::tls::TlsConfig;
use frontdoor::{RenderHandler, TrailingSlash};
use futures_util::future::{FutureExt, LocalBoxFuture};
use reqwest::Client;

use super::filesystem::ASSETS_DIR;

/// Answers every delegated request with 404 `rendered <METHOD> <target>`.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenderHandler for CountingRenderer {
    fn render(&self, req: HttpRequest, _payload: web::Payload) -> LocalBoxFuture<'static, HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = format!("rendered {} {}", req.method(), req.uri());
        async move { HttpResponse::NotFound().body(body) }.boxed_local()
    }
}

/// Options for a loopback server on an ephemeral port with one worker.
pub fn test_options(root: &Path, trailing_slash: TrailingSlash) -> ServerOptions {
    let mut options = ServerOptions::new(root.to_path_buf());
    options.port = 0;
    options.workers = Some(1);
    options.assets = ASSETS_DIR.to_string();
    options.trailing_slash = trailing_slash;
    options
}

pub struct TestServer {
    pub running: RunningServer,
    pub renderer: Arc<CountingRenderer>,
    pub base_url: String,
}

impl TestServer {
    /// Start a server; must run inside `#[actix_web::test]`.
    pub async fn start(options: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let renderer = CountingRenderer::new();
        let running = server::start(options, renderer.clone()).await?;
        let scheme = if running.is_tls() { "https" } else { "http" };
        let base_url = format!("{}://127.0.0.1:{}", scheme, running.port());

        Ok(TestServer {
            running,
            renderer,
            base_url,
        })
    }

    pub async fn start_tls(
        mut options: ServerOptions,
        tls: TlsConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        options.tls = Some(tls);
        Self::start(options).await
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Plain HTTP client that reports redirects instead of following them
pub fn http_client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}
