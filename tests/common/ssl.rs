//! SSL/TLS testing utilities
//!
//! Self-signed certificates for the TLS lifecycle tests and a client that
//! accepts them.

use std::path::Path;
use std::time::Duration;

use frontdoor::tls::TlsConfig;
use reqwest::Client;

pub struct SslTestHelper;

impl SslTestHelper {
    /// Generate a self-signed certificate for localhost
    pub fn generate_test_certificate() -> Result<(String, String), Box<dyn std::error::Error>> {
        use rcgen::{Certificate, CertificateParams};

        let mut params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()]);
        params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;

        let cert = Certificate::from_params(params)?;
        let cert_pem = cert.serialize_pem()?;
        let key_pem = cert.serialize_private_key_pem();

        Ok((cert_pem, key_pem))
    }

    /// Write cert.pem and key.pem into `dir`
    pub fn write_cert_files(dir: &Path) -> Result<TlsConfig, Box<dyn std::error::Error>> {
        let (cert_pem, key_pem) = Self::generate_test_certificate()?;
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        std::fs::write(&cert_path, cert_pem)?;
        std::fs::write(&key_path, key_pem)?;
        Ok(TlsConfig::new(cert_path, key_path))
    }

    /// HTTPS client that accepts self-signed certificates
    pub fn create_https_client() -> Result<Client, Box<dyn std::error::Error>> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(client)
    }
}
