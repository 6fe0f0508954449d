use std::net::SocketAddr;

/// Documents larger than this are rejected at upload time (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Postgres URL. When absent the portal runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub blob: BlobConfig,
    pub max_upload_bytes: u64,
    pub cors_allowed_origin: Option<String>,
}

/// Object storage used for uploaded documents.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub bucket: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),
    #[error("invalid listen address: {0}")]
    InvalidAddr(#[from] std::net::AddrParseError),
    #[error("invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let database_max_connections =
            parse_number(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(20);

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".into()))?;
        let jwt_audience = lookup("JWT_AUDIENCE").filter(|v| !v.is_empty());

        let blob = BlobConfig {
            base_url: lookup("BLOB_STORE_URL").filter(|v| !v.is_empty()),
            token: lookup("BLOB_STORE_TOKEN").filter(|v| !v.is_empty()),
            bucket: lookup("BLOB_BUCKET").unwrap_or_else(|| "documents".to_string()),
        };
        let max_upload_bytes =
            parse_number(&lookup, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let cors_allowed_origin = lookup("CORS_ALLOWED_ORIGIN").filter(|v| !v.is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_audience,
            blob,
            max_upload_bytes,
            cors_allowed_origin,
        })
    }
}

fn parse_number<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
