// src/tls.rs
// TLS certificate loading and rustls server configuration

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug)]
pub enum TlsError {
    IoError(PathBuf, io::Error),
    InvalidCertificate(String),
    InvalidPrivateKey(String),
    ConfigError(String),
}

impl std::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsError::IoError(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            TlsError::InvalidCertificate(msg) => write!(f, "Invalid certificate: {}", msg),
            TlsError::InvalidPrivateKey(msg) => write!(f, "Invalid private key: {}", msg),
            TlsError::ConfigError(msg) => write!(f, "TLS configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<rustls::Error> for TlsError {
    fn from(err: rustls::Error) -> Self {
        TlsError::ConfigError(format!("Rustls error: {}", err))
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| TlsError::IoError(path.to_path_buf(), e))
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// TLS is enabled only when both a certificate and a key are configured.
    pub fn from_paths(cert: Option<&Path>, key: Option<&Path>) -> Option<Self> {
        match (cert, key) {
            (Some(cert), Some(key)) => Some(Self::new(cert, key)),
            (Some(_), None) => {
                log::warn!("Certificate configured without a private key, serving plain HTTP");
                None
            }
            (None, Some(_)) => {
                log::warn!("Private key configured without a certificate, serving plain HTTP");
                None
            }
            (None, None) => None,
        }
    }

    fn load_certificates(&self) -> Result<Vec<CertificateDer<'static>>, TlsError> {
        let mut reader = open(&self.cert_path)?;
        let chain = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                TlsError::InvalidCertificate(format!("Failed to parse certificates: {}", e))
            })?;

        if chain.is_empty() {
            return Err(TlsError::InvalidCertificate(format!(
                "No certificates found in {}",
                self.cert_path.display()
            )));
        }
        Ok(chain)
    }

    fn load_private_key(&self) -> Result<PrivateKeyDer<'static>, TlsError> {
        let mut reader = open(&self.key_path)?;
        rustls_pemfile::private_key(&mut reader)
            .map_err(|e| TlsError::InvalidPrivateKey(format!("Failed to parse private key: {}", e)))?
            .ok_or_else(|| {
                TlsError::InvalidPrivateKey(format!(
                    "No private key found in {}",
                    self.key_path.display()
                ))
            })
    }

    /// Read the PEM material and build the rustls server configuration.
    pub fn load_server_config(&self) -> Result<ServerConfig, TlsError> {
        let cert_chain = self.load_certificates()?;
        let private_key = self.load_private_key()?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(cert_chain, private_key)?;

        Ok(config)
    }
}
