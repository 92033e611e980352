// src/assets.rs
// Static asset streaming with dotfile policy and immutable caching for build output

use actix_files::NamedFile;
use actix_web::body::{BodySize, BoxBody, MessageBody};
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::path;

pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const WELL_KNOWN_PREFIX: &str = "/.well-known/";
const DIRECTORY_INDEX: &str = "index.html";

/// Result of trying to answer a request from the asset directory.
#[derive(Debug)]
pub enum AssetOutcome {
    /// A file was opened; the response is committed to it.
    File(HttpResponse),
    /// A directory was requested without a trailing slash.
    /// Carries the base-stripped pathname with `/` appended.
    DirectoryRedirect(String),
    Miss,
    BadRequest,
    /// The candidate file exists but could not be opened.
    Fault(io::Error),
}

#[derive(Debug, Clone)]
pub struct AssetStreamer {
    root: PathBuf,
    immutable_prefix: String,
}

impl AssetStreamer {
    pub fn new(root: PathBuf, assets_dir: &str) -> Self {
        Self {
            root,
            immutable_prefix: format!("/{}/", assets_dir.trim_matches('/')),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when responses for `pathname` get the immutable Cache-Control header.
    pub fn is_immutable(&self, pathname: &str) -> bool {
        pathname.starts_with(&self.immutable_prefix)
    }

    /// Answer `pathname` (base already removed) from disk.
    pub async fn stream(&self, req: &HttpRequest, pathname: &str) -> AssetOutcome {
        let pathname = match path::canonicalize(pathname) {
            Ok(pathname) => pathname,
            Err(err) => {
                log::debug!("Rejecting {:?}: {}", pathname, err);
                return AssetOutcome::BadRequest;
            }
        };

        let Some(candidate) = path::resolve_file_path(&self.root, &pathname) else {
            return AssetOutcome::Miss;
        };

        if !dotfiles_allowed(&pathname) && has_dotfile_segment(&self.root, &candidate) {
            log::debug!("Dotfile access denied: {}", pathname);
            return AssetOutcome::Miss;
        }

        let metadata = match tokio::fs::metadata(&candidate).await {
            Ok(metadata) => metadata,
            Err(err) => {
                log::trace!("stat {} failed: {}", candidate.display(), err);
                return AssetOutcome::Miss;
            }
        };

        let file_path = if metadata.is_dir() {
            if !pathname.ends_with('/') {
                return AssetOutcome::DirectoryRedirect(format!("{}/", pathname));
            }
            let index = candidate.join(DIRECTORY_INDEX);
            match tokio::fs::metadata(&index).await {
                Ok(meta) if meta.is_file() => index,
                _ => return AssetOutcome::Miss,
            }
        } else {
            candidate
        };

        let file = match NamedFile::open_async(&file_path).await {
            Ok(file) => file,
            Err(err) => return AssetOutcome::Fault(err),
        };

        let mut response = file.disable_content_disposition().into_response(req);
        if self.is_immutable(&pathname) {
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
            );
        }

        let response = response.map_body(|_, body| {
            BoxBody::new(FaultLoggingBody::new(body, file_path.clone()))
        });
        AssetOutcome::File(response)
    }
}

/// Dotfiles are only served under `/.well-known/`.
pub fn dotfiles_allowed(pathname: &str) -> bool {
    pathname.starts_with(WELL_KNOWN_PREFIX)
}

fn has_dotfile_segment(root: &Path, candidate: &Path) -> bool {
    candidate
        .strip_prefix(root)
        .map(|relative| {
            relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        })
        .unwrap_or(false)
}

/// Passes a file body through, logging read errors that happen after the
/// status line and headers have already gone out.
pub struct FaultLoggingBody {
    inner: BoxBody,
    path: PathBuf,
}

impl FaultLoggingBody {
    pub fn new(inner: BoxBody, path: PathBuf) -> Self {
        Self { inner, path }
    }
}

impl MessageBody for FaultLoggingBody {
    type Error = Box<dyn StdError>;

    fn size(&self) -> BodySize {
        self.inner.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Err(err))) => {
                log::error!(
                    "Stream error while sending {}: {}",
                    this.path.display(),
                    err
                );
                Poll::Ready(Some(Err(err)))
            }
            other => other,
        }
    }
}
