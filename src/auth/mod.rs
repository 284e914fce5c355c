use crate::error::IdentityError;

pub mod password;
pub mod token;

pub use password::{hash_blocking, verify_blocking, Argon2Hasher, CredentialHasher};
pub use token::{generate_verification_token, token_prefix, SessionClaims, TokenService};

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    Expired,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Authentication result type
pub type Result<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for IdentityError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) | AuthError::Expired => {
                IdentityError::Unauthorized("Not authorized".to_string())
            }
            AuthError::Signing(msg) | AuthError::Hashing(msg) => IdentityError::Internal(msg),
        }
    }
}
