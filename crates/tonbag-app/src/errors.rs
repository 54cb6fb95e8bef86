//! Categorized application errors
//!
//! Provides structured error types that enable:
//! - Categorized error handling (input vs network vs wallet)
//! - Appropriate toast severity routing
//! - Recovery hints for user-actionable errors

use std::fmt;
use tonbag_core::effects::{BackendError, WalletError};
use tonbag_core::TonbagError;

// ============================================================================
// Toast levels
// ============================================================================

/// Severity of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToastLevel {
    /// Informational
    Info,
    /// Something needs attention but nothing was lost
    Warning,
    /// The requested operation failed
    Error,
}

// ============================================================================
// Error Categories
// ============================================================================

/// High-level error categories for frontend error handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// User input validation errors (correctable by user)
    Input,
    /// Configuration errors (correctable by modifying settings)
    Config,
    /// Resource not found errors
    NotFound,
    /// Backend connectivity errors (often transient)
    Network,
    /// Wallet rejected, expired or is missing
    Wallet,
    /// General operation failures (catch-all)
    Operation,
    /// The user or a scope change cancelled the operation
    Cancelled,
}

impl ErrorCategory {
    /// Whether the user can resolve this by changing input or settings.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Input | Self::Config)
    }

    /// Whether a retry may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::NotFound | Self::Wallet)
    }

    /// Get the appropriate toast severity for this category.
    #[must_use]
    pub fn toast_severity(&self) -> ToastLevel {
        match self {
            Self::Input => ToastLevel::Info,
            Self::Config => ToastLevel::Warning,
            Self::NotFound => ToastLevel::Warning,
            Self::Network => ToastLevel::Warning,
            Self::Wallet => ToastLevel::Warning,
            Self::Operation => ToastLevel::Error,
            Self::Cancelled => ToastLevel::Info,
        }
    }

    /// Get a short label for this category.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Config => "Config",
            Self::NotFound => "Not Found",
            Self::Network => "Network",
            Self::Wallet => "Wallet",
            Self::Operation => "Operation",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Get a hint for the user on how to resolve this category of error.
    #[must_use]
    pub fn resolution_hint(&self) -> &'static str {
        match self {
            Self::Input => "Check your input and try again",
            Self::Config => "Review your configuration settings",
            Self::NotFound => "The requested item could not be found",
            Self::Network => "Check that the storage daemon is running and retry",
            Self::Wallet => "Confirm the transaction in your wallet and retry",
            Self::Operation => "An unexpected error occurred",
            Self::Cancelled => "Nothing was submitted",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// AppError
// ============================================================================

/// Categorized application errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    /// A value typed by the user was rejected before anything was sent
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// Which input was rejected
        field: String,
        /// Why it was rejected
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A referenced item does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// The missing item
        what: String,
    },

    /// The backend could not be reached or failed
    #[error("Backend error: {message}")]
    Backend {
        /// Failure description
        message: String,
        /// Whether retrying may help
        recoverable: bool,
    },

    /// The candidate provider declined the content item
    #[error("Provider rejected the request: {reason}")]
    ProviderRejected {
        /// Reason reported by the provider
        reason: String,
    },

    /// The wallet did not produce a signature
    #[error("Wallet error: {message}")]
    Wallet {
        /// Failure description
        message: String,
    },

    /// Another operation of the same kind is still running
    #[error("{operation} is already in progress")]
    Busy {
        /// The running operation
        operation: String,
    },

    /// The operation was cancelled before it completed
    #[error("Cancelled: {operation}")]
    Cancelled {
        /// The cancelled operation
        operation: String,
    },

    /// Unexpected condition
    #[error("{source_name}: {message}")]
    Internal {
        /// Component that failed
        source_name: String,
        /// Failure description
        message: String,
    },
}

impl AppError {
    /// Create an input validation error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a recoverable backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            recoverable: true,
        }
    }

    /// Create a provider rejection
    pub fn provider_rejected(reason: impl Into<String>) -> Self {
        Self::ProviderRejected {
            reason: reason.into(),
        }
    }

    /// Create a wallet error
    pub fn wallet(message: impl Into<String>) -> Self {
        Self::Wallet {
            message: message.into(),
        }
    }

    /// Create a busy error
    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an internal error
    pub fn internal(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Category used for UI routing.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Input,
            Self::Config { .. } => ErrorCategory::Config,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Backend { .. } => ErrorCategory::Network,
            Self::ProviderRejected { .. } => ErrorCategory::Operation,
            Self::Wallet { .. } => ErrorCategory::Wallet,
            Self::Busy { .. } => ErrorCategory::Operation,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::Internal { .. } => ErrorCategory::Operation,
        }
    }

    /// Get the appropriate toast severity for this error
    pub fn toast_level(&self) -> ToastLevel {
        match self {
            Self::Backend { recoverable, .. } => {
                if *recoverable {
                    ToastLevel::Warning
                } else {
                    ToastLevel::Error
                }
            }
            Self::ProviderRejected { .. } => ToastLevel::Warning,
            other => other.category().toast_severity(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Backend { recoverable, .. } => *recoverable,
            Self::Internal { .. } => false,
            _ => true,
        }
    }

    /// Get a short error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INPUT_INVALID",
            Self::Config { .. } => "CONFIG",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Backend { .. } => "BACKEND",
            Self::ProviderRejected { .. } => "PROVIDER_REJECTED",
            Self::Wallet { .. } => "WALLET",
            Self::Busy { .. } => "BUSY",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}

impl From<TonbagError> for AppError {
    fn from(err: TonbagError) -> Self {
        match err {
            TonbagError::Invalid { message } => Self::invalid_input("value", message),
            TonbagError::NotFound { message } => Self::not_found(message),
            TonbagError::Backend { message } => Self::backend(message),
            TonbagError::Wallet { message } => Self::wallet(message),
            TonbagError::Storage { message } => Self::internal("storage", message),
            TonbagError::Serialization { message } => Self::internal("serialization", message),
            TonbagError::Internal { message } => Self::internal("core", message),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        let recoverable = matches!(err, BackendError::Unavailable | BackendError::Timeout);
        Self::Backend {
            message: err.to_string(),
            recoverable,
        }
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        Self::wallet(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_routing() {
        let err: AppError = BackendError::Unavailable.into();
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.toast_level(), ToastLevel::Warning);
        assert!(err.is_recoverable());

        let err: AppError = BackendError::rejected("bad provider set").into();
        assert_eq!(err.toast_level(), ToastLevel::Error);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_wallet_rejection_is_transient() {
        let err: AppError = WalletError::Rejected.into();
        assert_eq!(err.code(), "WALLET");
        assert!(err.category().is_transient());
        assert!(!err.category().is_user_correctable());
    }

    #[test]
    fn test_input_errors_are_user_correctable() {
        let err = AppError::invalid_input("provider key", "must be 64 hex characters");
        assert!(err.category().is_user_correctable());
        assert_eq!(err.toast_level(), ToastLevel::Info);
        assert_eq!(
            err.to_string(),
            "Invalid provider key: must be 64 hex characters"
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let err: AppError = TonbagError::invalid("amount is empty").into();
        assert_eq!(err.category(), ErrorCategory::Input);
        let err: AppError = TonbagError::storage("disk full").into();
        assert_eq!(err.code(), "INTERNAL");
    }

    #[test]
    fn test_category_labels_and_hints() {
        assert_eq!(ErrorCategory::Wallet.to_string(), "Wallet");
        assert_eq!(ErrorCategory::Cancelled.resolution_hint(), "Nothing was submitted");
        assert_eq!(ErrorCategory::Cancelled.toast_severity(), ToastLevel::Info);
    }
}
