use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Authentication is handled by the platform's SSO reverse proxy; the
/// service only trusts the username it forwards in a request header.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub remote_user_header: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { limit: 30 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmtpConfig {
    #[serde(default)]
    pub enabled: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
}

/// Where the course/group membership snapshot is pulled from. Left
/// unset, the cache starts empty and stays empty (fail closed).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MembershipConfig {
    pub snapshot_url: Option<String>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_secs() -> u64 {
    300
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.remote_user_header", "x-remote-user")?
            .set_default("feed.limit", 30)?
            .set_default("smtp.enabled", false)?
            .set_default("membership.refresh_interval_secs", 300)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with NOTICEBOARD__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("NOTICEBOARD").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://noticeboard.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                remote_user_header: "x-remote-user".to_string(),
            },
            feed: FeedConfig::default(),
            smtp: SmtpConfig::default(),
            membership: MembershipConfig::default(),
        }
    }
}
