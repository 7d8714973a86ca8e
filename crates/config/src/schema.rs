use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "LETTERBOX_";

/// Google's JWKS endpoint for Firebase ID token signing keys.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Persistent storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` file path (defaults to `~/.letterbox/letterbox.db`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_jwks_url() -> String {
    FIREBASE_JWKS_URL.to_string()
}
fn default_leeway() -> u64 {
    60
}

/// Trust settings for inbound bearer credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity-provider project; derives the default issuer and audience.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Expected `iss` claim (overrides the project-derived value).
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected `aud` claim (overrides the project-derived value).
    #[serde(default)]
    pub audience: Option<String>,
    /// Where the public signing keys are fetched from at startup.
    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
    /// HS256 secret for local development; never set this in production.
    #[serde(default)]
    pub shared_secret: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            issuer: None,
            audience: None,
            jwks_url: default_jwks_url(),
            leeway_secs: default_leeway(),
            shared_secret: None,
        }
    }
}

impl IdentityConfig {
    /// Expected issuer: explicit value, else derived from `project_id`.
    #[must_use]
    pub fn expected_issuer(&self) -> Option<String> {
        self.issuer.clone().or_else(|| {
            self.project_id
                .as_ref()
                .map(|p| format!("https://securetoken.google.com/{p}"))
        })
    }

    /// Expected audience: explicit value, else `project_id`.
    #[must_use]
    pub fn expected_audience(&self) -> Option<String> {
        self.audience.clone().or_else(|| self.project_id.clone())
    }
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

/// Google OAuth client settings for Drive access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Default redirect URI registered with Google.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Browser app that receives the authorization code.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_page_size() -> u32 {
    30
}

/// Export behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Grant `anyone with the link` read access after creating a file.
    #[serde(default = "default_true")]
    pub share_publicly: bool,
    /// Page size for `GET /drive/files`.
    #[serde(default = "default_page_size")]
    pub list_page_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            share_publicly: true,
            list_page_size: default_page_size(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

/// Browser origins allowed to call the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_level() -> String {
    "info".to_string()
}

/// Logging settings; `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (defaults to 5000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (defaults to `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            google: GoogleConfig::default(),
            export: ExportConfig::default(),
            cors: CorsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Serialized, Yaml},
        };
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from defaults, an optional YAML file, then the
    /// environment (`LETTERBOX_PORT`, `LETTERBOX_GOOGLE__CLIENT_ID`, …).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or a value fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Env, Format as _, Serialized, Yaml},
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}
