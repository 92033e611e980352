// src/fallback.rs
// Delegation to the server-rendering handler when no static file answers a request

use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::future::Future;
use std::sync::Arc;

/// The external rendering handler.
///
/// Receives the original request and its body; whatever it returns is sent
/// to the client untouched.
pub trait RenderHandler: Send + Sync + 'static {
    fn render(&self, req: HttpRequest, payload: web::Payload) -> LocalBoxFuture<'static, HttpResponse>;
}

impl<F, Fut> RenderHandler for F
where
    F: Fn(HttpRequest, web::Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + 'static,
{
    fn render(&self, req: HttpRequest, payload: web::Payload) -> LocalBoxFuture<'static, HttpResponse> {
        (self)(req, payload).boxed_local()
    }
}

#[derive(Clone)]
pub struct FallbackDispatcher {
    handler: Arc<dyn RenderHandler>,
}

impl FallbackDispatcher {
    pub fn new(handler: Arc<dyn RenderHandler>) -> Self {
        Self { handler }
    }

    /// Hand the request over. Takes ownership so a request can only be delegated once.
    pub async fn delegate(&self, req: HttpRequest, payload: web::Payload) -> HttpResponse {
        log::debug!("Delegating {} {} to renderer", req.method(), req.uri());
        self.handler.render(req, payload).await
    }
}

impl std::fmt::Debug for FallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackDispatcher").finish_non_exhaustive()
    }
}
