//! Error types for Encore

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EncoreError>;

#[derive(Error, Debug)]
pub enum EncoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EncoreError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            EncoreError::InvalidInput(_) => 3,
            EncoreError::Api(ApiError::Unauthorized(_)) => 2,
            EncoreError::Api(ApiError::Status { status: 401, .. }) => 2,
            EncoreError::Api(_) => 1,
            EncoreError::Config(_) => 1,
            EncoreError::Storage(_) => 1,
        }
    }

    /// Short text suitable for an alert dialog or a one-line CLI message
    pub fn user_message(&self) -> String {
        match self {
            EncoreError::Api(e) => e.user_message(),
            EncoreError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
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

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("OS keyring unavailable: {0}")]
    KeyringUnavailable(String),

    #[error("Keyring operation failed: {0}")]
    Keyring(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed: wrong master password or corrupted file")]
    DecryptionFailed,

    #[error("Master password must be at least 8 characters")]
    WeakPassword,

    #[error("Master password not set")]
    MasterPasswordNotSet,

    #[error("No token storage backend available")]
    NoStoreAvailable,
}

/// Failures talking to the remote API
///
/// Kept `Clone` so a failure can sit inside a list state snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Human-readable alert text, without transport details
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Network request failed".to_string(),
            ApiError::Timeout(_) => "The server took too long to respond".to_string(),
            ApiError::Status { status: 401, .. } | ApiError::Unauthorized(_) => {
                "Session expired, please log in again".to_string()
            }
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Status { status, .. } => format!("Server returned an error ({})", status),
            ApiError::Decode(_) => "Unexpected response from server".to_string(),
            ApiError::Cancelled => "Request cancelled".to_string(),
        }
    }

    /// True when the server rejected our credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::Status { status: 401, .. }
        )
    }
}
