use crate::core::{Outcome, RepositoryError};
use crate::models::{ChatHistory, Message, MessageRequest};
use crate::repositories::bearer;
use crate::services::{ApiClient, SessionKey, SessionStore};
use std::sync::Arc;
use validator::Validate;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Message history and sending for a single match
///
/// Every message handed out has `is_sent_by_me` recomputed against the
/// stored user id, whatever the server said.
pub struct ChatRepository {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl ChatRepository {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Fetch one page of history, oldest first
    pub async fn messages(&self, match_id: &str, limit: u32, offset: u32) -> Outcome<ChatHistory> {
        self.try_messages(match_id, limit, offset).await.into()
    }

    pub async fn send_message(&self, match_id: &str, content: &str) -> Outcome<Message> {
        self.try_send_message(match_id, content).await.into()
    }

    pub async fn mark_as_read(&self, match_id: &str) -> Outcome<()> {
        self.try_mark_as_read(match_id).await.into()
    }

    async fn try_messages(
        &self,
        match_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ChatHistory, RepositoryError> {
        let auth = bearer(&self.session)?;
        let mut history = self.api.messages(&auth, match_id, limit, offset).await?;

        let me = self.session.get(SessionKey::UserId);
        history.messages = history
            .messages
            .into_iter()
            .map(|m| m.attribute_to(me.as_deref()))
            .collect();
        history.messages.sort_by_key(|m| m.sent_at);

        Ok(history)
    }

    async fn try_send_message(&self, match_id: &str, content: &str) -> Result<Message, RepositoryError> {
        let auth = bearer(&self.session)?;
        let request = MessageRequest {
            content: content.to_string(),
        };
        request.validate()?;

        let message = self.api.send_message(&auth, match_id, &request).await?;
        let me = self.session.get(SessionKey::UserId);
        Ok(message.attribute_to(me.as_deref()))
    }

    async fn try_mark_as_read(&self, match_id: &str) -> Result<(), RepositoryError> {
        let auth = bearer(&self.session)?;
        self.api.mark_read(&auth, match_id).await?;
        Ok(())
    }
}
