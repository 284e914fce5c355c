// Centralized configuration constants

// Network
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const MIN_VALID_PORT: u16 = 1024;
pub const MAX_VALID_PORT: u16 = 65535;

// Server
pub const DEFAULT_WORKER_THREADS: usize = 4;
pub const HTTP_KEEPALIVE_SECS: u64 = 75;
pub const HTTP_CLIENT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 3600;

// Session tokens
pub const DEFAULT_AUTH_TOKEN_EXPIRY_HOURS: i64 = 24;
pub const MIN_SIGNING_SECRET_BYTES: usize = 32;
pub const DEV_SIGNING_SECRET: &str = "development-only-signing-secret-change-me";

// Verification tokens: 32 random bytes, hex encoded
pub const VERIFICATION_TOKEN_BYTES: usize = 32;

// Database
pub const DEFAULT_DB_POOL: u32 = 5;
pub const DEFAULT_DB_CONN_TIMEOUT_SECS: u64 = 30;

// Mail
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAIL_FROM: &str = "no-reply@localhost";
pub const DEFAULT_MAIL_TIMEOUT_SECONDS: u64 = 10;

// Avatars
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_S3_BUCKET: &str = "cosmic-identity-avatars";
pub const DEFAULT_S3_KEY_PREFIX: &str = "avatars/";
/// 5MB
pub const DEFAULT_AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const AVATAR_FORM_FIELD: &str = "avatar";

// Signup throttling: 2 registrations per hour per client address
pub const DEFAULT_SIGNUP_RATE_LIMIT: u32 = 2;
pub const DEFAULT_SIGNUP_RATE_WINDOW_SECS: u64 = 3600;

// Accounts
pub const DEFAULT_DISPLAY_NAME: &str = "Guest";
