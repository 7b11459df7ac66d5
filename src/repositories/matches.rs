use crate::core::{Outcome, RepositoryError};
use crate::models::{Match, MatchList};
use crate::repositories::bearer;
use crate::services::{ApiClient, SessionStore};
use std::sync::Arc;

pub struct MatchRepository {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl MatchRepository {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    pub async fn matches(&self) -> Outcome<MatchList> {
        self.try_matches().await.into()
    }

    pub async fn get_match(&self, match_id: &str) -> Outcome<Match> {
        self.try_get_match(match_id).await.into()
    }

    async fn try_matches(&self) -> Result<MatchList, RepositoryError> {
        let auth = bearer(&self.session)?;
        let list = self.api.matches(&auth).await?;
        tracing::debug!("Fetched {} matches (total: {})", list.matches.len(), list.total);
        Ok(list)
    }

    async fn try_get_match(&self, match_id: &str) -> Result<Match, RepositoryError> {
        let auth = bearer(&self.session)?;
        Ok(self.api.get_match(&auth, match_id).await?)
    }
}
