//! Common test utilities for frontdoor integration tests
//!
//! Site fixtures on disk, in-process servers with a counting renderer,
//! and self-signed certificates for the TLS tests.

#![allow(dead_code)] // Not every test binary uses every helper
#![allow(unused_imports)]

pub mod filesystem;
pub mod server;
pub mod ssl;

pub use filesystem::SiteFixture;
pub use server::{CountingRenderer, TestServer};
pub use ssl::SslTestHelper;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_fixture_builder() {
        let site = SiteFixture::new()
            .file("index.html", "<h1>Home</h1>")
            .file("nested/deeper/page.html", "page")
            .dir("empty");

        assert!(site.root().join("index.html").is_file());
        assert!(site.root().join("nested/deeper/page.html").is_file());
        assert!(site.root().join("empty").is_dir());
    }

    #[test]
    fn test_ssl_certificate_generation() {
        let (cert_pem, key_pem) = SslTestHelper::generate_test_certificate().unwrap();
        assert!(cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(key_pem.contains("BEGIN PRIVATE KEY"));
    }
}
