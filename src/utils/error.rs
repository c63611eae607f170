use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerApiError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Ledger data inconsistency: {message}")]
    Inconsistency { message: String },

    #[error("Delivery of title {title_id} failed: {message}")]
    DeliveryFailure { title_id: String, message: String },

    #[error("Ledger connection failed: {message}")]
    ConnectionFailure { message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field} was not set")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    DataIntegrity,
    Delivery,
    Connection,
    Serialization,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LedgerApiError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn inconsistency(message: impl Into<String>) -> Self {
        Self::Inconsistency {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::Lookup,
            Self::Inconsistency { .. } => ErrorCategory::DataIntegrity,
            Self::DeliveryFailure { .. } => ErrorCategory::Delivery,
            Self::ConnectionFailure { .. } | Self::HttpError(_) => ErrorCategory::Connection,
            Self::SerializationError(_) => ErrorCategory::Serialization,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup => ErrorSeverity::Low,
            ErrorCategory::Delivery => ErrorSeverity::Medium,
            ErrorCategory::DataIntegrity | ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Connection | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lookup => "Check the title number and try again",
            ErrorCategory::DataIntegrity => {
                "Inspect the ledger vault for the missing linked record"
            }
            ErrorCategory::Delivery => {
                "Re-submit the logged payload to the registry once it is reachable"
            }
            ErrorCategory::Connection => {
                "Check the ledger node is running and restart this process"
            }
            ErrorCategory::Serialization => "Check the ledger record schema matches this service",
            ErrorCategory::Configuration => {
                "Set the CONFIG_RPC_* and TITLE_API_URL environment variables"
            }
            ErrorCategory::System => "Check host resources and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { resource } => format!("{} does not exist", resource),
            Self::MissingConfigError { field } => format!("{} env var was not set.", field),
            Self::ConnectionFailure { .. } | Self::HttpError(_) => {
                "Could not reach the ledger node".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Process exit code for errors that end `main`.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_taxonomy() {
        assert_eq!(
            LedgerApiError::not_found("Title TN1").category(),
            ErrorCategory::Lookup
        );
        assert_eq!(
            LedgerApiError::inconsistency("no payment").category(),
            ErrorCategory::DataIntegrity
        );
        assert_eq!(
            LedgerApiError::connection("feed dropped").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            LedgerApiError::MissingConfigError {
                field: "TITLE_API_URL".to_string()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_user_friendly_message() {
        let err = LedgerApiError::MissingConfigError {
            field: "CONFIG_RPC_HOST".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "CONFIG_RPC_HOST env var was not set.");
        assert_eq!(
            LedgerApiError::not_found("Title TN9").user_friendly_message(),
            "Title TN9 does not exist"
        );
    }
}
