use crate::core::Outcome;
use crate::holders::{begin, fail, LoadState};
use crate::models::{Match, QueueStatus};
use crate::repositories::{AuthRepository, MatchRepository};
use std::sync::Arc;
use tokio::sync::watch;

const DEFAULT_USER_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq)]
pub struct HomeState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub user_name: String,
    pub queue_status: Option<QueueStatus>,
    pub matches: Vec<Match>,
}

impl Default for HomeState {
    fn default() -> Self {
        Self {
            is_loading: false,
            error_message: None,
            user_name: DEFAULT_USER_NAME.to_string(),
            queue_status: None,
            matches: Vec::new(),
        }
    }
}

impl LoadState for HomeState {
    fn loading(&mut self) -> &mut bool {
        &mut self.is_loading
    }

    fn error(&mut self) -> &mut Option<String> {
        &mut self.error_message
    }
}

/// Landing screen: queue position plus any matches
pub struct HomeHolder {
    auth: Arc<AuthRepository>,
    matches: Arc<MatchRepository>,
    state: watch::Sender<HomeState>,
}

impl HomeHolder {
    pub fn new(auth: Arc<AuthRepository>, matches: Arc<MatchRepository>) -> Self {
        let user_name = auth
            .user_name()
            .current()
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());

        let (state, _) = watch::channel(HomeState {
            user_name,
            ..HomeState::default()
        });

        Self { auth, matches, state }
    }

    pub fn snapshot(&self) -> HomeState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeState> {
        self.state.subscribe()
    }

    /// Rank card text, once the queue status has loaded
    pub fn rank_label(&self) -> Option<String> {
        self.state.borrow().queue_status.as_ref().map(QueueStatus::rank_label)
    }

    /// Keep `user_name` in step with the session store until it goes away
    pub async fn follow_user_name(&self) {
        let mut name = self.auth.user_name();
        while let Some(value) = name.changed().await {
            let value = value.unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
            self.state.send_modify(|s| s.user_name = value);
        }
    }

    pub async fn load_queue_status(&self) {
        if !begin(&self.state) {
            return;
        }

        match self.auth.queue_status().await {
            Outcome::Success(status) => {
                tracing::debug!("Queue rank {}", status.rank);
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.queue_status = Some(status);
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    /// Failures are swallowed: a user still waiting in the queue has no matches.
    pub async fn load_matches(&self) {
        match self.matches.matches().await {
            Outcome::Success(list) => {
                self.state.send_modify(|s| s.matches = list.matches);
            }
            Outcome::Error { message, code } => {
                tracing::debug!("Match refresh failed ({:?}): {}", code, message);
            }
        }
    }

    pub async fn refresh(&self) {
        tokio::join!(self.load_queue_status(), self.load_matches());
    }
}
