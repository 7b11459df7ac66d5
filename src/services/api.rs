use crate::models::{
    ChatHistory, ErrorResponse, Match, MatchList, Message, MessageRequest, ProfileSetupRequest,
    QueueStatus, RegisterRequest, RegisterResponse, TokenResponse, User, VerifyOtpRequest,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the Concort API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { message: String, status: u16 },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Concort API client
///
/// One method per endpoint. Authenticated methods take the full
/// `Authorization` header value. No retries happen here.
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://host/api/v1/`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // ===== Auth =====

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let builder = self.client.post(self.url("auth/register")?).json(request);
        parse(self.execute(builder, None).await?).await
    }

    pub async fn resend_otp(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let builder = self.client.post(self.url("auth/resend-otp")?).json(request);
        parse(self.execute(builder, None).await?).await
    }

    pub async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<TokenResponse, ApiError> {
        let builder = self.client.post(self.url("auth/verify-otp")?).json(request);
        parse(self.execute(builder, None).await?).await
    }

    pub async fn setup_profile(
        &self,
        auth: &str,
        request: &ProfileSetupRequest,
    ) -> Result<User, ApiError> {
        let builder = self.client.post(self.url("auth/profile-setup")?).json(request);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    // ===== Users =====

    pub async fn current_user(&self, auth: &str) -> Result<User, ApiError> {
        let builder = self.client.get(self.url("users/me")?);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    pub async fn queue_status(&self, auth: &str) -> Result<QueueStatus, ApiError> {
        let builder = self.client.get(self.url("users/queue-status")?);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    // ===== Matches =====

    pub async fn matches(&self, auth: &str) -> Result<MatchList, ApiError> {
        let builder = self.client.get(self.url("matches")?);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    pub async fn get_match(&self, auth: &str, match_id: &str) -> Result<Match, ApiError> {
        let path = format!("matches/{}", urlencoding::encode(match_id));
        let builder = self.client.get(self.url(&path)?);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    // ===== Chat =====

    pub async fn messages(
        &self,
        auth: &str,
        match_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ChatHistory, ApiError> {
        let path = format!("chat/{}/messages", urlencoding::encode(match_id));
        let builder = self
            .client
            .get(self.url(&path)?)
            .query(&[("limit", limit), ("offset", offset)]);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    pub async fn send_message(
        &self,
        auth: &str,
        match_id: &str,
        request: &MessageRequest,
    ) -> Result<Message, ApiError> {
        let path = format!("chat/{}/messages", urlencoding::encode(match_id));
        let builder = self.client.post(self.url(&path)?).json(request);
        parse(self.execute(builder, Some(auth)).await?).await
    }

    pub async fn mark_read(&self, auth: &str, match_id: &str) -> Result<(), ApiError> {
        let path = format!("chat/{}/read", urlencoding::encode(match_id));
        let builder = self.client.post(self.url(&path)?);
        self.execute(builder, Some(auth)).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Send the request and turn any non-2xx status into `ApiError::Rejected`
    async fn execute(&self, builder: RequestBuilder, auth: Option<&str>) -> Result<Response, ApiError> {
        let builder = match auth {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|b| b.text())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        tracing::warn!("{} returned {}: {}", url, status, message);

        Err(ApiError::Rejected {
            message,
            status: status.as_u16(),
        })
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
}
