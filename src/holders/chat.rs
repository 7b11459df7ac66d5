use crate::core::Outcome;
use crate::holders::{begin, fail, LoadState};
use crate::models::{Match, Message};
use crate::repositories::{ChatRepository, MatchRepository, DEFAULT_PAGE_SIZE};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub match_info: Option<Match>,
    pub messages: Vec<Message>,
    pub is_sending: bool,
}

impl LoadState for ChatState {
    fn loading(&mut self) -> &mut bool {
        &mut self.is_loading
    }

    fn error(&mut self) -> &mut Option<String> {
        &mut self.error_message
    }
}

/// Conversation with one match
pub struct ChatHolder {
    match_id: String,
    matches: Arc<MatchRepository>,
    chat: Arc<ChatRepository>,
    state: watch::Sender<ChatState>,
}

impl ChatHolder {
    pub fn new(match_id: impl Into<String>, matches: Arc<MatchRepository>, chat: Arc<ChatRepository>) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            match_id: match_id.into(),
            matches,
            chat,
            state,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    /// Load the match header and the history side by side
    pub async fn load(&self) {
        if self.match_id.is_empty() {
            return;
        }
        tokio::join!(self.load_match(), self.load_messages());
    }

    async fn load_match(&self) {
        match self.matches.get_match(&self.match_id).await {
            Outcome::Success(info) => self.state.send_modify(|s| s.match_info = Some(info)),
            Outcome::Error { message, .. } => {
                self.state.send_modify(|s| s.error_message = Some(message));
            }
        }
    }

    pub async fn load_messages(&self) {
        if !begin(&self.state) {
            return;
        }

        match self.chat.messages(&self.match_id, DEFAULT_PAGE_SIZE, 0).await {
            Outcome::Success(history) => {
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.messages = history.messages;
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    /// Blank input is ignored, as is a second send while one is in flight.
    pub async fn send_message(&self, content: &str) {
        if content.trim().is_empty() {
            return;
        }

        let started = self.state.send_if_modified(|s| {
            if s.is_sending {
                return false;
            }
            s.is_sending = true;
            true
        });
        if !started {
            tracing::debug!("Send already in flight for {}, ignoring", self.match_id);
            return;
        }

        match self.chat.send_message(&self.match_id, content).await {
            Outcome::Success(message) => {
                self.state.send_modify(|s| {
                    s.is_sending = false;
                    if !s.messages.iter().any(|m| m.id == message.id) {
                        s.messages.push(message);
                    }
                });
            }
            Outcome::Error { message, .. } => {
                self.state.send_modify(|s| {
                    s.is_sending = false;
                    s.error_message = Some(message);
                });
            }
        }
    }

    pub async fn mark_as_read(&self) {
        if let Outcome::Error { message, .. } = self.chat.mark_as_read(&self.match_id).await {
            tracing::debug!("Mark as read failed for {}: {}", self.match_id, message);
        }
    }
}
