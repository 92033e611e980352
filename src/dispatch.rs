// src/dispatch.rs
// Per-request dispatch: static file, redirect, rendering handler, or an error response

use actix_web::http::{header, Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::{AssetOutcome, AssetStreamer};
use crate::config::{BasePath, TrailingSlash};
use crate::fallback::{FallbackDispatcher, RenderHandler};
use crate::path;
use crate::policy::{self, RouteDecision};

pub const BAD_REQUEST_BODY: &str = "Bad request.";
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// Everything a worker needs to route a request. Immutable after construction.
#[derive(Debug)]
pub struct Dispatcher {
    base: BasePath,
    trailing_slash: TrailingSlash,
    streamer: AssetStreamer,
    fallback: FallbackDispatcher,
}

impl Dispatcher {
    pub fn new(
        client_dir: PathBuf,
        base: BasePath,
        assets_dir: &str,
        trailing_slash: TrailingSlash,
        renderer: Arc<dyn RenderHandler>,
    ) -> Self {
        Self {
            base,
            trailing_slash,
            streamer: AssetStreamer::new(client_dir, assets_dir),
            fallback: FallbackDispatcher::new(renderer),
        }
    }

    /// Decide how a raw request target is routed before touching any file.
    pub async fn route(&self, raw_target: &str) -> RouteDecision {
        match path::normalize(raw_target, self.streamer.root(), &self.base).await {
            Ok(target) => policy::decide(
                self.trailing_slash,
                &target.url_path,
                target.query.as_deref(),
                target.is_directory,
            ),
            Err(err) => {
                log::debug!("Malformed request target {:?}: {}", raw_target, err);
                RouteDecision::BadRequest
            }
        }
    }

    pub async fn handle(&self, req: HttpRequest, payload: web::Payload) -> HttpResponse {
        if !matches!(*req.method(), Method::GET | Method::HEAD) {
            return self.fallback.delegate(req, payload).await;
        }

        let Some(raw_target) = req.uri().path_and_query().map(|pq| pq.as_str().to_string())
        else {
            return self.fallback.delegate(req, payload).await;
        };

        let pathname = match self.route(&raw_target).await {
            RouteDecision::Redirect { location, status } => return redirect(status, &location),
            RouteDecision::BadRequest => return bad_request(),
            decision => match decision.pathname() {
                Some(pathname) => self.base.remove(pathname),
                None => return bad_request(),
            },
        };

        let outcome = self.streamer.stream(&req, &pathname).await;
        match self.reply_for(outcome, &raw_target, &pathname) {
            Reply::Direct(response) => response,
            Reply::Delegate => self.fallback.delegate(req, payload).await,
        }
    }

    /// Map a streamer outcome to the single response it calls for.
    fn reply_for(&self, outcome: AssetOutcome, raw_target: &str, pathname: &str) -> Reply {
        match outcome {
            AssetOutcome::File(response) => Reply::Direct(response),
            AssetOutcome::DirectoryRedirect(stripped) => {
                let (_, query) = path::split_target(raw_target);
                let location = match query {
                    Some(query) => format!("{}?{}", self.base.apply(&stripped), query),
                    None => self.base.apply(&stripped),
                };
                Reply::Direct(redirect(StatusCode::MOVED_PERMANENTLY, &location))
            }
            AssetOutcome::Miss => Reply::Delegate,
            AssetOutcome::BadRequest => Reply::Direct(bad_request()),
            AssetOutcome::Fault(err) => {
                log::error!("Failed to open {} for {}: {}", pathname, raw_target, err);
                Reply::Direct(HttpResponse::InternalServerError().body(INTERNAL_ERROR_BODY))
            }
        }
    }
}

enum Reply {
    Direct(HttpResponse),
    Delegate,
}

fn redirect(status: StatusCode, location: &str) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header((header::LOCATION, location))
        .finish()
}

fn bad_request() -> HttpResponse {
    HttpResponse::BadRequest().body(BAD_REQUEST_BODY)
}

/// Default service handler.
pub async fn dispatch(
    req: HttpRequest,
    payload: web::Payload,
    dispatcher: web::Data<Dispatcher>,
) -> HttpResponse {
    dispatcher.handle(req, payload).await
}

/// Register the dispatcher as the catch-all service of an `App`.
pub fn configure(dispatcher: Arc<Dispatcher>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(dispatcher))
            .default_service(web::route().to(dispatch));
    }
}
