//! Access-layer error types.

use crm_core::Ability;
use crm_core::error::CrmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no authenticated actor")]
    Unauthenticated,

    #[error("unknown actor")]
    UnknownActor,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not a member of the requested team")]
    NotAMember,

    #[error("{ability} is not permitted")]
    Forbidden { ability: Ability },

    #[error("only the team owner may {action}")]
    OwnerOnly { action: &'static str },

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

impl From<AccessError> for CrmError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated
            | AccessError::UnknownActor
            | AccessError::InvalidCredentials => CrmError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AccessError::NotAMember
            | AccessError::Forbidden { .. }
            | AccessError::OwnerOnly { .. } => CrmError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AccessError::PasswordTooShort { .. } => CrmError::Validation {
                message: err.to_string(),
            },
        }
    }
}
