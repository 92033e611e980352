// src/lib.rs
// frontdoor: request dispatch in front of a server-rendering handler

pub mod access_log;
pub mod assets;
pub mod config;
pub mod dispatch;
pub mod fallback;
pub mod logger;
pub mod network;
pub mod path;
pub mod policy;
pub mod render;
pub mod server;
pub mod shutdown;
pub mod tls;

pub use config::{BasePath, TrailingSlash};
pub use dispatch::Dispatcher;
pub use fallback::RenderHandler;
pub use server::{start, ListenHost, RunningServer, ServerError, ServerOptions};
