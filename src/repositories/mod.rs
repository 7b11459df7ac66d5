// Repository exports
pub mod auth;
pub mod chat;
pub mod matches;

pub use auth::AuthRepository;
pub use chat::{ChatRepository, DEFAULT_PAGE_SIZE};
pub use matches::MatchRepository;

use crate::core::RepositoryError;
use crate::services::SessionStore;

/// `Authorization` header for the stored token, checked before any network call
pub(crate) fn bearer(session: &SessionStore) -> Result<String, RepositoryError> {
    session.auth_header().ok_or(RepositoryError::NotAuthenticated)
}
