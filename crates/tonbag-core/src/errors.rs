//! Unified error type for tonbag core operations.
//!
//! Effect traits return their own narrow error enums; everything converges on
//! [`TonbagError`] once it leaves the effect boundary.

use serde::{Deserialize, Serialize};

use crate::effects::{BackendError, StorageError, WalletError};

/// Unified error type for all tonbag operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TonbagError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// The backend collaborator failed or rejected a call
    #[error("Backend error: {message}")]
    Backend {
        /// Error message describing the backend failure
        message: String,
    },

    /// The wallet collaborator rejected or timed out a signature request
    #[error("Wallet error: {message}")]
    Wallet {
        /// Error message describing the wallet failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl TonbagError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a wallet error
    pub fn wallet(message: impl Into<String>) -> Self {
        Self::Wallet {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for tonbag operations
pub type Result<T> = std::result::Result<T, TonbagError>;

impl From<serde_json::Error> for TonbagError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for TonbagError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

impl From<BackendError> for TonbagError {
    fn from(err: BackendError) -> Self {
        Self::backend(err.to_string())
    }
}

impl From<WalletError> for TonbagError {
    fn from(err: WalletError) -> Self {
        Self::wallet(err.to_string())
    }
}

impl From<StorageError> for TonbagError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}
