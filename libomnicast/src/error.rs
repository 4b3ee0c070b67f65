//! Error types for Omnicast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OmnicastError>;

#[derive(Error, Debug)]
pub enum OmnicastError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal state: {0}")]
    State(String),

    #[error("Publish error: {0}")]
    Publish(#[from] PublisherError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OmnicastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OmnicastError::Validation(_) => 3,
            OmnicastError::Publish(PublisherError::Auth(_)) => 2,
            OmnicastError::Publish(_) => 1,
            OmnicastError::NotFound(_) => 1,
            OmnicastError::State(_) => 1,
            OmnicastError::Config(_) => 1,
            OmnicastError::Storage(_) => 1,
        }
    }
}

/// Failure reported by a platform publisher collaborator.
///
/// The variant determines whether the auto-publish loop will retry the
/// attempt: rate limits and network failures are transient, authentication
/// and content validation failures are permanent.
#[derive(Error, Debug, Clone)]
pub enum PublisherError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Content rejected: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl PublisherError {
    /// Whether a later attempt could plausibly succeed
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            PublisherError::RateLimit(_) | PublisherError::Network(_)
        )
    }

    /// Stable machine-readable code recorded on failed posts
    pub fn code(&self) -> &'static str {
        match self {
            PublisherError::Auth(_) => "auth",
            PublisherError::RateLimit(_) => "rate_limit",
            PublisherError::Validation(_) => "validation",
            PublisherError::Network(_) => "network",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializeError(#[from] serde_json::Error),
}
