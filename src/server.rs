// src/server.rs
// Listening server lifecycle: plain or TLS transport, closed notification and forced stop

use actix_web::dev::ServerHandle;
use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::access_log::AccessLog;
use crate::config::{BasePath, TrailingSlash};
use crate::dispatch::{self, Dispatcher};
use crate::fallback::RenderHandler;
use crate::tls::{TlsConfig, TlsError};

pub const SERVER_SIGNATURE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Interface the listening socket binds to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListenHost {
    Named(String),
    All,
    /// Host exposure disabled: loopback only.
    #[default]
    Local,
}

impl ListenHost {
    /// `None` and `"false"` keep the server on loopback, `"true"` exposes it
    /// on every interface, anything else is used as the bind host.
    pub fn from_config(host: Option<&str>) -> Self {
        match host.map(str::trim) {
            None | Some("") | Some("false") => ListenHost::Local,
            Some("true") | Some("0.0.0.0") => ListenHost::All,
            Some(name) => ListenHost::Named(name.to_string()),
        }
    }

    pub fn bind_host(&self) -> &str {
        match self {
            ListenHost::Named(name) => name,
            ListenHost::All => "0.0.0.0",
            ListenHost::Local => "127.0.0.1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub client_dir: PathBuf,
    pub host: ListenHost,
    /// 0 picks an ephemeral port.
    pub port: u16,
    pub base: BasePath,
    pub assets: String,
    pub trailing_slash: TrailingSlash,
    pub tls: Option<TlsConfig>,
    pub workers: Option<usize>,
}

impl ServerOptions {
    pub fn new(client_dir: PathBuf) -> Self {
        Self {
            client_dir,
            host: ListenHost::default(),
            port: 4321,
            base: BasePath::new("/"),
            assets: "_assets".to_string(),
            trailing_slash: TrailingSlash::default(),
            tls: None,
            workers: None,
        }
    }
}

/// States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Created,
    Listening,
    Closing,
    Closed,
}

fn advance(state: &Mutex<LifecycleState>, next: LifecycleState) {
    let mut current = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if next > *current {
        log::debug!("Server state {:?} -> {:?}", *current, next);
        *current = next;
    }
}

#[derive(Debug, Clone)]
pub enum ServerError {
    Bind(Arc<io::Error>),
    Tls(Arc<TlsError>),
    /// The server terminated with an error, or connection teardown failed.
    Closed(Arc<io::Error>),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "Failed to bind listening socket: {}", e),
            ServerError::Tls(e) => write!(f, "{}", e),
            ServerError::Closed(e) => write!(f, "Server closed with an error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<TlsError> for ServerError {
    fn from(err: TlsError) -> Self {
        ServerError::Tls(Arc::new(err))
    }
}

type ClosedFuture = Shared<LocalBoxFuture<'static, Result<(), Arc<io::Error>>>>;

/// Stops a running server. Cheap to clone and `Send`, so it can be handed to
/// a signal watcher on another task.
#[derive(Clone)]
pub struct Stopper {
    handle: ServerHandle,
    state: Arc<Mutex<LifecycleState>>,
}

impl Stopper {
    /// Tear down every open connection, idle keep-alive ones included,
    /// without waiting for in-flight responses to finish.
    pub async fn stop(&self) {
        advance(&self.state, LifecycleState::Closing);
        self.handle.stop(false).await;
    }
}

impl fmt::Debug for Stopper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopper").field("state", &self.state).finish_non_exhaustive()
    }
}

pub struct RunningServer {
    host: String,
    port: u16,
    is_tls: bool,
    stopper: Stopper,
    closed: ClosedFuture,
}

impl RunningServer {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    pub fn state(&self) -> LifecycleState {
        *self
            .stopper
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    /// Resolves once the listening socket has fully closed. Every call
    /// observes the same outcome.
    pub fn closed(&self) -> impl Future<Output = Result<(), ServerError>> + 'static {
        let closed = self.closed.clone();
        async move { closed.await.map_err(ServerError::Closed) }
    }

    /// Forced shutdown; completes when the server has closed.
    pub async fn stop(&self) -> Result<(), ServerError> {
        self.stopper.stop().await;
        self.closed().await
    }
}

impl fmt::Debug for RunningServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("is_tls", &self.is_tls)
            .field("state", &self.state())
            .finish()
    }
}

/// Bind the listening socket and start serving. Must be called from within
/// an actix runtime (`#[actix_web::main]` or `#[actix_web::test]`).
pub async fn start(
    options: ServerOptions,
    renderer: Arc<dyn RenderHandler>,
) -> Result<RunningServer, ServerError> {
    let state = Arc::new(Mutex::new(LifecycleState::Created));

    // Unreadable certificate material aborts startup instead of downgrading to plain HTTP.
    let rustls_config = match options.tls {
        Some(ref tls) => Some(tls.load_server_config()?),
        None => None,
    };
    let is_tls = rustls_config.is_some();

    let dispatcher = Arc::new(Dispatcher::new(
        options.client_dir.clone(),
        options.base.clone(),
        &options.assets,
        options.trailing_slash,
        renderer,
    ));

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(AccessLog)
            .wrap(DefaultHeaders::new().add((header::SERVER, SERVER_SIGNATURE)))
            .configure(dispatch::configure(Arc::clone(&dispatcher)))
    })
    .disable_signals()
    .shutdown_timeout(0);

    if let Some(workers) = options.workers {
        server = server.workers(workers);
    }

    let host = options.host.bind_host().to_string();
    let server = match rustls_config {
        Some(config) => server.bind_rustls_0_23((host.as_str(), options.port), config),
        None => server.bind((host.as_str(), options.port)),
    }
    .map_err(|e| ServerError::Bind(Arc::new(e)))?;

    let port = server
        .addrs()
        .first()
        .map(|addr| addr.port())
        .unwrap_or(options.port);

    let server = server.run();
    let handle = server.handle();
    advance(&state, LifecycleState::Listening);
    log::debug!(
        "Listening on {}:{} ({})",
        host,
        port,
        if is_tls { "https" } else { "http" }
    );

    let task_state = Arc::clone(&state);
    let task = actix_web::rt::spawn(async move {
        let result = server.await;
        advance(&task_state, LifecycleState::Closed);
        result
    });

    let closed = async move {
        match task.await {
            Ok(result) => result.map_err(Arc::new),
            Err(join_error) => Err(Arc::new(io::Error::new(io::ErrorKind::Other, join_error))),
        }
    }
    .boxed_local()
    .shared();

    Ok(RunningServer {
        host,
        port,
        is_tls,
        stopper: Stopper { handle, state },
        closed,
    })
}
