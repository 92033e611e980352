//! Site fixtures
//!
//! Builds a throwaway build-output directory that looks like what a static
//! site generator emits: hashed assets, directory indexes and a few dotfiles.

use std::path::Path;

use tempfile::TempDir;

pub const ASSETS_DIR: &str = "_astro";
pub const APP_JS: &str = "console.log('app');";

pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Layout shared by most dispatch tests.
    pub fn build_output() -> Self {
        Self::new()
            .file("index.html", "<h1>Home</h1>")
            .file("about/index.html", "<h1>About</h1>")
            .file("docs/index.html", "<h1>Docs</h1>")
            .file("docs/guide/index.html", "<h1>Guide</h1>")
            .file("_astro/app.abc123.js", APP_JS)
            .file("_astro/style.def456.css", "body{}")
            .file("robots.txt", "User-agent: *")
            .file("with space.txt", "spaced")
            .file(".env", "SECRET=1")
            .file(".well-known/security.txt", "Contact: mailto:security@example.test")
            .dir("empty")
    }

    pub fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&path, contents).expect("Failed to write fixture file");
        self
    }

    pub fn dir(self, relative: &str) -> Self {
        std::fs::create_dir_all(self.dir.path().join(relative)).expect("Failed to create dir");
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self::new()
    }
}
