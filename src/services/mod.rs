// Service exports
pub mod api;
pub mod session_store;

pub use api::{ApiClient, ApiError};
pub use session_store::{Credentials, KeyWatch, Session, SessionKey, SessionStore, StorageError};
