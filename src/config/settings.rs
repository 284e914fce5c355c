use std::env;
use std::net::SocketAddr;
use serde::{Serialize, Deserialize};

use crate::config::constants::*;
use crate::error::{IdentityError, Result};

/// Main configuration container for the application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration settings
    pub server: ServerConfig,
    /// Database configuration settings
    pub database: DatabaseConfig,
    /// Session token signing settings
    pub token: TokenConfig,
    /// Verification mail settings
    pub mail: MailConfig,
    /// Avatar storage settings
    pub avatar: AvatarConfig,
    /// Signup throttling settings
    pub limiter: RateLimitConfig,
    /// Logging configuration settings
    pub logging: LoggingConfig,
    /// Deployment environment
    pub environment: Environment,
}

impl Config {
    /// Load configuration from environment variables or use defaults
    pub fn load() -> Self {
        Self {
            server: ServerConfig::load(),
            database: DatabaseConfig::load(),
            token: TokenConfig::load(),
            mail: MailConfig::load(),
            avatar: AvatarConfig::load(),
            limiter: RateLimitConfig::load(),
            logging: LoggingConfig::load(),
            environment: Environment::current(),
        }
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(IdentityError::config("Server host cannot be empty"));
        }

        if self.server.port < MIN_VALID_PORT {
            return Err(IdentityError::config(format!(
                "Invalid port: {}. Must be between {} and {}",
                self.server.port, MIN_VALID_PORT, MAX_VALID_PORT
            )));
        }

        if self.server.worker_threads == 0 || self.server.worker_threads > 256 {
            return Err(IdentityError::config(format!(
                "Invalid worker_threads: {}. Must be between 1 and 256",
                self.server.worker_threads
            )));
        }

        if self.token.expiry_hours <= 0 {
            return Err(IdentityError::config("AUTH_TOKEN_EXPIRY_HOURS must be positive"));
        }

        if self.environment.is_cloud() {
            if self.token.signing_secret == DEV_SIGNING_SECRET {
                return Err(IdentityError::config(
                    "JWT_SECRET_KEY must be set outside development",
                ));
            }
            if self.token.signing_secret.len() < MIN_SIGNING_SECRET_BYTES {
                return Err(IdentityError::config(format!(
                    "JWT_SECRET_KEY must be at least {} bytes",
                    MIN_SIGNING_SECRET_BYTES
                )));
            }
        }

        if self.avatar.max_bytes == 0 {
            return Err(IdentityError::config("AVATAR_MAX_BYTES must be greater than 0"));
        }

        url::Url::parse(&self.mail.app_base_url)
            .map_err(|e| IdentityError::config(format!("Invalid APP_BASE_URL: {}", e)))?;
        if let Some(api_url) = &self.mail.api_url {
            url::Url::parse(api_url)
                .map_err(|e| IdentityError::config(format!("Invalid MAIL_API_URL: {}", e)))?;
        }

        Ok(())
    }
}

/// Environment type for configuration loading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Get current environment from ENVIRONMENT environment variable
    pub fn current() -> Self {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// Check if this is a cloud environment (staging or production)
    pub fn is_cloud(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

/// Server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to listen on
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Number of worker threads
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables or use defaults
    pub fn load() -> Self {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_HTTP_HOST.to_string());
        let port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);
        let worker_threads = env::var("WORKER_THREADS")
            .ok()
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or_else(num_cpus::get);

        Self {
            host,
            port,
            worker_threads,
        }
    }

    /// Get socket address from host and port
    pub fn address(&self) -> std::result::Result<SocketAddr, std::io::Error> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }
}

/// Database configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; memory storage is used when absent
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables or use defaults
    pub fn load() -> Self {
        let url = env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty());
        let max_connections = env::var("DB_POOL")
            .ok()
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(DEFAULT_DB_POOL);
        let connection_timeout = env::var("DATABASE_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DB_CONN_TIMEOUT_SECS);

        Self {
            url,
            max_connections,
            connection_timeout,
        }
    }

    /// Whether the configured URL points at MySQL
    pub fn is_mysql(&self) -> bool {
        self.url
            .as_deref()
            .map(|u| u.starts_with("mysql://"))
            .unwrap_or(false)
    }
}

/// Session token signing configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HMAC signing secret
    pub signing_secret: String,
    /// Session token lifetime in hours
    pub expiry_hours: i64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_secret", &"<redacted>")
            .field("expiry_hours", &self.expiry_hours)
            .finish()
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing_secret: DEV_SIGNING_SECRET.to_string(),
            expiry_hours: DEFAULT_AUTH_TOKEN_EXPIRY_HOURS,
        }
    }
}

impl TokenConfig {
    pub fn load() -> Self {
        let signing_secret =
            env::var("JWT_SECRET_KEY").unwrap_or_else(|_| DEV_SIGNING_SECRET.to_string());
        let expiry_hours = env::var("AUTH_TOKEN_EXPIRY_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(DEFAULT_AUTH_TOKEN_EXPIRY_HOURS);

        Self {
            signing_secret,
            expiry_hours,
        }
    }
}

/// Verification mail configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Public base URL used to build verification links
    pub app_base_url: String,
    /// Mail relay endpoint (log-only transport when absent)
    pub api_url: Option<String>,
    /// Mail relay API key
    pub api_key: Option<String>,
    /// Sender address
    pub from: String,
    /// Request timeout for the relay in seconds
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("app_base_url", &self.app_base_url)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            api_url: None,
            api_key: None,
            from: DEFAULT_MAIL_FROM.to_string(),
            timeout_seconds: DEFAULT_MAIL_TIMEOUT_SECONDS,
        }
    }
}

impl MailConfig {
    pub fn load() -> Self {
        Self {
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_APP_BASE_URL.to_string()),
            api_url: env::var("MAIL_API_URL").ok().filter(|u| !u.is_empty()),
            api_key: env::var("MAIL_API_KEY").ok(),
            from: env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string()),
            timeout_seconds: env::var("MAIL_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAIL_TIMEOUT_SECONDS),
        }
    }
}

/// Image store backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageStoreType {
    /// Keep images in process memory
    #[default]
    Memory,
    /// Store images in AWS S3 or an S3-compatible service
    S3,
}

impl std::str::FromStr for ImageStoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(ImageStoreType::Memory),
            "s3" => Ok(ImageStoreType::S3),
            _ => Err(format!("Invalid avatar store type: {}", s)),
        }
    }
}

/// Avatar storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Backend to use
    pub store_type: ImageStoreType,
    /// Largest accepted upload in bytes
    pub max_bytes: usize,
    /// S3 configuration (when store_type is S3)
    pub s3: S3Config,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            store_type: ImageStoreType::Memory,
            max_bytes: DEFAULT_AVATAR_MAX_BYTES,
            s3: S3Config::default(),
        }
    }
}

impl AvatarConfig {
    pub fn load() -> Self {
        let store_type = env::var("AVATAR_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .unwrap_or(ImageStoreType::Memory);
        let max_bytes = env::var("AVATAR_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_AVATAR_MAX_BYTES);

        Self {
            store_type,
            max_bytes,
            s3: S3Config::load(),
        }
    }
}

/// S3 configuration settings
#[derive(Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// S3 object key prefix
    pub key_prefix: String,
    /// AWS access key ID (optional - can use IAM role)
    pub access_key_id: Option<String>,
    /// AWS secret access key (optional - can use IAM role)
    pub secret_access_key: Option<String>,
    /// S3 endpoint URL (for S3-compatible services)
    pub endpoint_url: Option<String>,
    /// Base URL objects are publicly served from
    pub public_base_url: Option<String>,
    /// Force path style addressing
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint_url", &self.endpoint_url)
            .field("public_base_url", &self.public_base_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_S3_REGION.to_string(),
            bucket: DEFAULT_S3_BUCKET.to_string(),
            key_prefix: DEFAULT_S3_KEY_PREFIX.to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            public_base_url: None,
            force_path_style: false,
        }
    }
}

impl S3Config {
    /// Load S3 configuration from environment variables or use defaults
    pub fn load() -> Self {
        Self {
            region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| DEFAULT_S3_BUCKET.to_string()),
            key_prefix: env::var("S3_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_S3_KEY_PREFIX.to_string()),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            endpoint_url: env::var("S3_ENDPOINT_URL").ok(),
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
        }
    }

    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => match &self.endpoint_url {
                Some(endpoint) => {
                    format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
                }
                None => format!(
                    "https://{}.s3.{}.amazonaws.com/{}",
                    self.bucket, self.region, key
                ),
            },
        }
    }
}

/// Signup throttling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Signups allowed per window and client address
    pub max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_SIGNUP_RATE_LIMIT,
            window_seconds: DEFAULT_SIGNUP_RATE_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    pub fn load() -> Self {
        Self {
            max_requests: env::var("SIGNUP_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SIGNUP_RATE_LIMIT),
            window_seconds: env::var("SIGNUP_RATE_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SIGNUP_RATE_WINDOW_SECS),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive
    pub level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "cosmic_identity_server=info,info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn load() -> Self {
        Self {
            level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "cosmic_identity_server=info,info".to_string()),
            json: env::var("LOG_FORMAT").unwrap_or_default() == "json",
        }
    }
}
