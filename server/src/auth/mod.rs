//! Authentication: token issue and verification, plus the request extractor.

mod middleware;
mod token;

pub use middleware::AuthUser;
pub use token::{AuthGuard, Claims};

/// Reasons a request's credentials are refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingToken,

    #[error("Invalid authorization header format")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Claims must include a string or numeric sub")]
    MissingSubject,
}
