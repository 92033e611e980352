// src/config.rs
// Configuration for frontdoor: trailing slash policy, base path and the config file loader

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the configuration file looked up in the serve directory.
pub const CONFIG_FILE_NAME: &str = "frontdoor.json";

/// How URLs that name a directory are treated with respect to their trailing `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    Never,
    #[default]
    Ignore,
    Always,
}

impl TrailingSlash {
    /// Resolve an optional configured value, falling back to `ignore`
    /// when the value is absent or not one of the known policies.
    pub fn resolve(value: Option<&str>) -> Self {
        match value {
            None => TrailingSlash::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Unknown trailingSlash policy {:?}, using \"ignore\"", raw);
                TrailingSlash::default()
            }),
        }
    }
}

impl FromStr for TrailingSlash {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(TrailingSlash::Never),
            "ignore" => Ok(TrailingSlash::Ignore),
            "always" => Ok(TrailingSlash::Always),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid trailingSlash policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TrailingSlash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailingSlash::Never => write!(f, "never"),
            TrailingSlash::Ignore => write!(f, "ignore"),
            TrailingSlash::Always => write!(f, "always"),
        }
    }
}

fn lenient_trailing_slash<'de, D>(deserializer: D) -> Result<TrailingSlash, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(TrailingSlash::resolve(value.as_deref()))
}

/// URL prefix every request path is expected to start with.
///
/// Stored without a trailing slash; the root base is stored as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasePath {
    prefix: String,
}

impl BasePath {
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim().trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Strip the base from `pathname`. The result always starts with `/`.
    /// Paths outside the base are returned unchanged.
    pub fn remove(&self, pathname: &str) -> String {
        let stripped = if self.is_root() {
            pathname
        } else if pathname == self.prefix {
            ""
        } else {
            match pathname.strip_prefix(&self.prefix) {
                Some(rest) if rest.starts_with('/') => rest,
                _ => pathname,
            }
        };
        prepend_forward_slash(stripped)
    }

    /// Re-apply the base to a base-stripped pathname.
    pub fn apply(&self, pathname: &str) -> String {
        format!("{}{}", self.prefix, prepend_forward_slash(pathname))
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.prefix)
        }
    }
}

fn prepend_forward_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Static asset root, relative to the serve directory.
    #[serde(default)]
    pub client: Option<String>,

    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default = "default_assets")]
    pub assets: String,

    #[serde(default, deserialize_with = "lenient_trailing_slash")]
    pub trailing_slash: TrailingSlash,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub upstream: Option<String>,
}

fn default_base() -> String {
    "/".to_string()
}
fn default_assets() -> String {
    "_assets".to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            client: None,
            base: default_base(),
            assets: default_assets(),
            trailing_slash: TrailingSlash::default(),
            host: None,
            upstream: None,
        }
    }
}

/// Values given on the command line; each one present replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base: Option<String>,
    pub assets: Option<String>,
    pub trailing_slash: Option<String>,
    pub host: Option<String>,
    pub upstream: Option<String>,
}

impl Configuration {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base) = overrides.base {
            self.base = base;
        }
        if let Some(assets) = overrides.assets {
            self.assets = assets;
        }
        if let Some(ref policy) = overrides.trailing_slash {
            // Same leniency as the config file: unknown values fall back to `ignore`.
            self.trailing_slash = TrailingSlash::resolve(Some(policy));
        }
        if overrides.host.is_some() {
            self.host = overrides.host;
        }
        if overrides.upstream.is_some() {
            self.upstream = overrides.upstream;
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(String),
    ParseError(String),
    ValidationError(String),
    IoError(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Configuration file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse configuration: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation failed: {}", msg)
            }
            ConfigError::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

pub struct ConfigLoader {
    serve_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(serve_dir: PathBuf) -> Self {
        Self { serve_dir }
    }

    pub fn load_configuration(
        &self,
        custom_config_path: Option<&str>,
    ) -> Result<Configuration, ConfigError> {
        let config_path = match custom_config_path {
            Some(custom) => {
                let path = PathBuf::from(custom);
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(
                        path.to_string_lossy().to_string(),
                    ));
                }
                Some(path)
            }
            None => {
                let path = self.serve_dir.join(CONFIG_FILE_NAME);
                path.exists().then_some(path)
            }
        };

        let config = match config_path {
            Some(path) => {
                let contents = fs::read_to_string(&path)?;
                log::info!("Loading configuration from: {}", path.display());
                serde_json::from_str(&contents).map_err(|e| {
                    ConfigError::ParseError(format!("{}: {}", path.display(), e))
                })?
            }
            None => Configuration::default(),
        };

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Absolute or serve-dir-relative location of the static asset root.
    pub fn client_dir(&self, config: &Configuration) -> PathBuf {
        match config.client {
            Some(ref client) if Path::new(client).is_absolute() => PathBuf::from(client),
            Some(ref client) => self.serve_dir.join(client),
            None => self.serve_dir.clone(),
        }
    }

    /// Checks applied after the file is loaded; call again once CLI overrides are merged.
    pub fn validate_config(&self, config: &Configuration) -> Result<(), ConfigError> {
        let client_dir = self.client_dir(config);
        if !client_dir.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "Client directory does not exist: {}",
                client_dir.display()
            )));
        }

        if !config.base.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "Base must start with '/': {}",
                config.base
            )));
        }

        if config.assets.is_empty() || config.assets.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "Assets directory must be a single path segment: {:?}",
                config.assets
            )));
        }

        if let Some(ref upstream) = config.upstream {
            if !upstream.starts_with("http://") && !upstream.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "Upstream must be an http(s) URL: {}",
                    upstream
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_trailing_slash_parse() {
        assert_eq!("never".parse::<TrailingSlash>().unwrap(), TrailingSlash::Never);
        assert_eq!("Always".parse::<TrailingSlash>().unwrap(), TrailingSlash::Always);
        assert_eq!(" ignore ".parse::<TrailingSlash>().unwrap(), TrailingSlash::Ignore);
        assert_matches!(
            "sometimes".parse::<TrailingSlash>(),
            Err(ConfigError::ValidationError(_))
        );
    }

    #[test]
    fn test_trailing_slash_resolve_defaults_to_ignore() {
        assert_eq!(TrailingSlash::resolve(None), TrailingSlash::Ignore);
        assert_eq!(TrailingSlash::resolve(Some("bogus")), TrailingSlash::Ignore);
        assert_eq!(TrailingSlash::resolve(Some("never")), TrailingSlash::Never);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Configuration {
            trailing_slash: TrailingSlash::Always,
            ..Configuration::default()
        };
        config.apply_overrides(ConfigOverrides {
            base: Some("/docs".to_string()),
            trailing_slash: Some("never".to_string()),
            upstream: Some("http://127.0.0.1:4000".to_string()),
            ..ConfigOverrides::default()
        });

        assert_eq!(config.base, "/docs");
        assert_eq!(config.assets, "_assets");
        assert_eq!(config.trailing_slash, TrailingSlash::Never);
        assert_eq!(config.upstream.as_deref(), Some("http://127.0.0.1:4000"));
        assert_eq!(config.host, None);
    }

    #[test]
    fn test_unknown_trailing_slash_override_falls_back_to_ignore() {
        let mut config = Configuration {
            trailing_slash: TrailingSlash::Always,
            ..Configuration::default()
        };
        config.apply_overrides(ConfigOverrides {
            trailing_slash: Some("sometimes".to_string()),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.trailing_slash, TrailingSlash::Ignore);
    }

    #[test]
    fn test_base_path_root() {
        let base = BasePath::new("/");
        assert!(base.is_root());
        assert_eq!(base.remove("/about"), "/about");
        assert_eq!(base.remove("/"), "/");
        assert_eq!(base.apply("/about"), "/about");
        assert_eq!(base.to_string(), "/");
    }

    #[test]
    fn test_base_path_remove() {
        let base = BasePath::new("/docs/");
        assert_eq!(base.remove("/docs/intro"), "/intro");
        assert_eq!(base.remove("/docs/"), "/");
        assert_eq!(base.remove("/docs"), "/");
        // Only strips on a segment boundary
        assert_eq!(base.remove("/docsify/x"), "/docsify/x");
        assert_eq!(base.remove("/other"), "/other");
    }

    #[test]
    fn test_base_path_apply() {
        let base = BasePath::new("docs");
        assert_eq!(base.apply("/intro/"), "/docs/intro/");
        assert_eq!(base.apply("intro"), "/docs/intro");
        assert_eq!(base.to_string(), "/docs");
    }

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.base, "/");
        assert_eq!(config.assets, "_assets");
        assert_eq!(config.trailing_slash, TrailingSlash::Ignore);
        assert!(config.upstream.is_none());
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let serve_dir = temp_dir.path().to_path_buf();
        fs::create_dir_all(serve_dir.join("dist/client")).unwrap();

        let config_content = r#"{
            "client": "dist/client",
            "base": "/docs",
            "assets": "_astro",
            "trailingSlash": "never",
            "upstream": "http://127.0.0.1:4321"
        }"#;
        fs::write(serve_dir.join(CONFIG_FILE_NAME), config_content).unwrap();

        let loader = ConfigLoader::new(serve_dir.clone());
        let config = loader.load_configuration(None).unwrap();

        assert_eq!(config.base, "/docs");
        assert_eq!(config.assets, "_astro");
        assert_eq!(config.trailing_slash, TrailingSlash::Never);
        assert_eq!(loader.client_dir(&config), serve_dir.join("dist/client"));
    }

    #[test]
    fn test_unknown_trailing_slash_in_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let serve_dir = temp_dir.path().to_path_buf();
        fs::write(
            serve_dir.join(CONFIG_FILE_NAME),
            r#"{"trailingSlash": "sideways"}"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(serve_dir);
        let config = loader.load_configuration(None).unwrap();
        assert_eq!(config.trailing_slash, TrailingSlash::Ignore);
    }

    #[test]
    fn test_load_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        let config = loader.load_configuration(None).unwrap();
        assert_eq!(loader.client_dir(&config), temp_dir.path());
    }

    #[test]
    fn test_custom_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        let result = loader.load_configuration(Some("nonexistent.json"));
        assert_matches!(result, Err(ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ invalid json }").unwrap();

        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        assert_matches!(
            loader.load_configuration(None),
            Err(ConfigError::ParseError(_))
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            r#"{"client": "missing-dir"}"#,
            r#"{"base": "docs"}"#,
            r#"{"assets": ""}"#,
            r#"{"assets": "a/b"}"#,
            r#"{"upstream": "ftp://example.com"}"#,
        ];

        for case in cases {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join(CONFIG_FILE_NAME), case).unwrap();
            let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
            assert_matches!(
                loader.load_configuration(None),
                Err(ConfigError::ValidationError(_)),
                "expected validation error for {}",
                case
            );
        }
    }

    #[test]
    fn test_absolute_client_directory() {
        let temp_dir = TempDir::new().unwrap();
        let abs_client = temp_dir.path().join("absolute_client");
        fs::create_dir_all(&abs_client).unwrap();

        let config_content = format!(r#"{{ "client": "{}" }}"#, abs_client.to_string_lossy());
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        let config = loader.load_configuration(None).unwrap();
        assert_eq!(loader.client_dir(&config), abs_client);
    }
}
