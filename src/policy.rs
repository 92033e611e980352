// src/policy.rs
// Trailing slash policy: decides between serving, rewriting to index.html and redirecting

use crate::config::TrailingSlash;
use actix_web::http::StatusCode;

/// What to do with a request before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Hand the pathname to the static layer unchanged.
    Serve(String),
    /// Hand `<path>/index.html` to the static layer.
    RewriteToIndex(String),
    Redirect { location: String, status: StatusCode },
    BadRequest,
}

impl RouteDecision {
    /// The pathname to look up on disk, if this decision leads to a lookup.
    pub fn pathname(&self) -> Option<&str> {
        match self {
            RouteDecision::Serve(path) | RouteDecision::RewriteToIndex(path) => Some(path),
            RouteDecision::Redirect { .. } | RouteDecision::BadRequest => None,
        }
    }
}

fn with_query(path: String, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    }
}

fn redirect(path: String, query: Option<&str>) -> RouteDecision {
    RouteDecision::Redirect {
        location: with_query(path, query),
        status: StatusCode::MOVED_PERMANENTLY,
    }
}

/// Apply `policy` to a canonical pathname (base included).
///
/// | policy | dir, slash    | dir, no slash        | file or unknown |
/// |--------|---------------|----------------------|-----------------|
/// | never  | 301 stripped  | rewrite `/index.html`| serve           |
/// | ignore | serve         | rewrite `/index.html`| serve           |
/// | always | serve         | 301 appended         | serve           |
///
/// The root path `/` is always served as-is.
pub fn decide(
    policy: TrailingSlash,
    path: &str,
    query: Option<&str>,
    is_directory: bool,
) -> RouteDecision {
    let has_slash = path.ends_with('/');

    if !is_directory || path == "/" {
        return RouteDecision::Serve(path.to_string());
    }

    match (policy, has_slash) {
        (TrailingSlash::Never, true) => {
            redirect(path.trim_end_matches('/').to_string(), query)
        }
        (TrailingSlash::Never | TrailingSlash::Ignore, false) => {
            RouteDecision::RewriteToIndex(format!("{}/index.html", path))
        }
        (TrailingSlash::Ignore | TrailingSlash::Always, true) => {
            RouteDecision::Serve(path.to_string())
        }
        (TrailingSlash::Always, false) => redirect(format!("{}/", path), query),
    }
}
