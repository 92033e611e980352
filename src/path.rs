// src/path.rs
// Request target normalization: canonical pathnames and contained filesystem paths

use crate::config::BasePath;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Characters that stay literal when a decoded pathname is re-encoded.
/// Everything outside `A-Z a-z 0-9 ; , / ? : @ & = + $ - _ . ! ~ * ' ( ) #` is escaped.
const URI_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Escapes for these bytes are kept verbatim when decoding, so that `%2F`
/// never turns into a path separator.
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// The request target could not be turned into a valid URL pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedTarget {
    InvalidEscape(usize),
    InvalidUtf8,
}

impl fmt::Display for MalformedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedTarget::InvalidEscape(at) => {
                write!(f, "Malformed percent-escape at byte {}", at)
            }
            MalformedTarget::InvalidUtf8 => write!(f, "Escaped bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for MalformedTarget {}

/// A request target resolved against the client root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTarget {
    /// Canonical pathname, base included.
    pub url_path: String,
    pub query: Option<String>,
    /// Candidate file for the base-stripped pathname; `None` when no file can match.
    pub file_path: Option<PathBuf>,
    pub is_directory: bool,
}

impl NormalizedTarget {
    pub fn has_trailing_slash(&self) -> bool {
        self.url_path.ends_with('/')
    }
}

/// Split a raw request target into path and query at the first `?`.
pub fn split_target(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Percent-decode a pathname, keeping escapes of reserved characters intact.
pub fn decode_uri(input: &str) -> Result<String, MalformedTarget> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let high = bytes.get(i + 1).copied().and_then(hex_value);
        let low = bytes.get(i + 2).copied().and_then(hex_value);
        let byte = match (high, low) {
            (Some(h), Some(l)) => (h << 4) | l,
            _ => return Err(MalformedTarget::InvalidEscape(i)),
        };

        if URI_RESERVED.contains(&byte) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(byte);
        }
        i += 3;
    }

    String::from_utf8(out).map_err(|_| MalformedTarget::InvalidUtf8)
}

/// Percent-encode a decoded pathname.
pub fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Resolve `.` and `..` segments the way URL parsing does: `..` never climbs above `/`.
pub fn remove_dot_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut parts = path.split('/').skip(1).peekable();
    let mut ends_in_directory = false;

    while let Some(segment) = parts.next() {
        let last = parts.peek().is_none();
        match segment {
            "." => ends_in_directory = last,
            ".." => {
                segments.pop();
                ends_in_directory = last;
            }
            other => {
                segments.push(other);
                ends_in_directory = false;
            }
        }
    }

    let mut out = String::with_capacity(path.len());
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if ends_in_directory || out.is_empty() {
        out.push('/');
    }
    out
}

fn collapse_leading_slashes(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Canonical pathname: decoded, dot segments resolved, re-encoded.
///
/// Equivalent escape forms map to the same pathname, and applying this twice
/// yields the same result as applying it once.
pub fn canonicalize(pathname: &str) -> Result<String, MalformedTarget> {
    let decoded = decode_uri(pathname)?;
    let resolved = remove_dot_segments(&collapse_leading_slashes(&decoded));
    Ok(encode_uri(&resolved))
}

/// Join a canonical, base-stripped pathname onto `root`.
///
/// Each segment is fully decoded. Segments that cannot name a single file
/// (embedded separators or NUL) yield `None`. `..` never escapes `root`.
pub fn resolve_file_path(root: &Path, pathname: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for segment in pathname.split('/') {
        let decoded = urlencoding::decode(segment).ok()?;
        if decoded.contains(['/', '\\', '\0']) {
            return None;
        }

        for component in Path::new(decoded.as_ref()).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
    }

    Some(root.join(relative))
}

/// Non-following status check; any failure counts as "not a directory".
pub async fn is_directory(path: &Path) -> bool {
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata.is_dir(),
        Err(err) => {
            log::trace!("lstat {} failed: {}", path.display(), err);
            false
        }
    }
}

/// Resolve a raw request target against the client root and base.
pub async fn normalize(
    raw_target: &str,
    root: &Path,
    base: &BasePath,
) -> Result<NormalizedTarget, MalformedTarget> {
    let (raw_path, query) = split_target(raw_target);
    let url_path = canonicalize(raw_path)?;

    let file_path = resolve_file_path(root, &base.remove(&url_path));
    let is_directory = match file_path {
        Some(ref path) => is_directory(path).await,
        None => false,
    };

    Ok(NormalizedTarget {
        url_path,
        query: query.map(str::to_string),
        file_path,
        is_directory,
    })
}
