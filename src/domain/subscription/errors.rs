//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotConfirmed | 400 |
//! | Validation | 400 |
//! | NotFound | 404 |
//! | Provider | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, ValidationError};

/// Errors surfaced by subscription operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The provider (or the local store) has no such subscription.
    NotFound { subscription_id: String },

    /// No subscription record exists for this tenant.
    NotFoundForTenant(TenantId),

    /// Provider-side fault: timeout, 5xx, rate limit.
    Provider { message: String, retryable: bool },

    /// Cancellation was requested without explicit confirmation.
    NotConfirmed,

    /// Malformed input.
    Validation { field: String, message: String },

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found(subscription_id: impl Into<String>) -> Self {
        SubscriptionError::NotFound {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn not_found_for_tenant(tenant_id: TenantId) -> Self {
        SubscriptionError::NotFoundForTenant(tenant_id)
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        SubscriptionError::Provider {
            message: message.into(),
            retryable,
        }
    }

    pub fn not_confirmed() -> Self {
        SubscriptionError::NotConfirmed
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFound { .. } | SubscriptionError::NotFoundForTenant(_) => {
                ErrorCode::SubscriptionNotFound
            }
            SubscriptionError::Provider { .. } => ErrorCode::ProviderError,
            SubscriptionError::NotConfirmed => ErrorCode::ConfirmationRequired,
            SubscriptionError::Validation { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::NotFound { subscription_id } => {
                format!("Subscription not found: {}", subscription_id)
            }
            SubscriptionError::NotFoundForTenant(tenant_id) => {
                format!("No subscription record for tenant: {}", tenant_id)
            }
            SubscriptionError::Provider { message, .. } => {
                format!("Billing provider error: {}", message)
            }
            SubscriptionError::NotConfirmed => {
                "Cancellation must be explicitly confirmed".to_string()
            }
            SubscriptionError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubscriptionError::Provider { retryable, .. } => *retryable,
            SubscriptionError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => SubscriptionError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { field } => SubscriptionError::Validation {
                field,
                message: "cannot be empty".to_string(),
            },
            ValidationError::InvalidFormat { field, reason } => SubscriptionError::Validation {
                field,
                message: reason,
            },
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_confirmed_maps_to_confirmation_code() {
        let err = SubscriptionError::not_confirmed();
        assert_eq!(err.code(), ErrorCode::ConfirmationRequired);
        assert!(!err.is_retryable());
    }

    #[test]
    fn provider_retryability_follows_flag() {
        assert!(SubscriptionError::provider("timeout", true).is_retryable());
        assert!(!SubscriptionError::provider("card declined", false).is_retryable());
    }

    #[test]
    fn not_found_message_names_subscription() {
        let err = SubscriptionError::not_found("sub_123");
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
        assert_eq!(err.to_string(), "Subscription not found: sub_123");
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: SubscriptionError = ValidationError::empty_field("tenant_id").into();
        assert_eq!(
            err,
            SubscriptionError::validation("tenant_id", "cannot be empty")
        );
    }

    #[test]
    fn database_domain_error_becomes_infrastructure() {
        let err: SubscriptionError = DomainError::database("connection reset").into();
        assert!(matches!(err, SubscriptionError::Infrastructure(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn converts_into_domain_error_with_code() {
        let err: DomainError = SubscriptionError::provider("503", true).into();
        assert_eq!(err.code, ErrorCode::ProviderError);
    }
}
