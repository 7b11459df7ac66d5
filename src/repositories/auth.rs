use crate::core::{Outcome, RepositoryError};
use crate::models::{
    Gender, ProfileSetupRequest, QueueStatus, RegisterRequest, RegisterResponse, TokenResponse,
    User, VerifyOtpRequest,
};
use crate::repositories::bearer;
use crate::services::{ApiClient, KeyWatch, SessionKey, SessionStore};
use std::sync::Arc;
use validator::Validate;

/// Registration, OTP and profile endpoints plus the signed-in user's own data
pub struct AuthRepository {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthRepository {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Request an OTP for `phone_number`; remembers the number on success.
    pub async fn register(&self, phone_number: &str) -> Outcome<RegisterResponse> {
        self.try_register(phone_number, false).await.into()
    }

    pub async fn resend_otp(&self, phone_number: &str) -> Outcome<RegisterResponse> {
        self.try_register(phone_number, true).await.into()
    }

    /// Verify the OTP and store the issued token together with the user id.
    pub async fn verify_otp(&self, phone_number: &str, otp_code: &str) -> Outcome<TokenResponse> {
        self.try_verify_otp(phone_number, otp_code).await.into()
    }

    pub async fn setup_profile(
        &self,
        name: &str,
        gender: Gender,
        age: Option<u8>,
        city: Option<&str>,
    ) -> Outcome<User> {
        self.try_setup_profile(name, gender, age, city).await.into()
    }

    pub async fn current_user(&self) -> Outcome<User> {
        self.try_current_user().await.into()
    }

    pub async fn queue_status(&self) -> Outcome<QueueStatus> {
        self.try_queue_status().await.into()
    }

    pub async fn logout(&self) -> Outcome<()> {
        tracing::info!("Logging out");
        self.session
            .clear()
            .await
            .map_err(RepositoryError::from)
            .into()
    }

    /// The API has no deletion endpoint yet, so this only forgets the session.
    pub async fn delete_account(&self) -> Outcome<()> {
        tracing::info!("Deleting account locally");
        self.session
            .clear()
            .await
            .map_err(RepositoryError::from)
            .into()
    }

    /// Observable access token; `None` means signed out
    pub fn is_logged_in(&self) -> KeyWatch {
        self.session.read(SessionKey::AccessToken)
    }

    pub fn user_name(&self) -> KeyWatch {
        self.session.read(SessionKey::UserName)
    }

    async fn try_register(
        &self,
        phone_number: &str,
        resend: bool,
    ) -> Result<RegisterResponse, RepositoryError> {
        let request = RegisterRequest {
            phone_number: phone_number.trim().to_string(),
        };
        request.validate()?;

        let response = if resend {
            self.api.resend_otp(&request).await?
        } else {
            self.api.register(&request).await?
        };

        // The echoed number is the one the OTP is bound to
        self.session.save_phone_number(&response.phone_number).await?;
        tracing::info!("OTP dispatched to {}", response.phone_number);
        Ok(response)
    }

    async fn try_verify_otp(
        &self,
        phone_number: &str,
        otp_code: &str,
    ) -> Result<TokenResponse, RepositoryError> {
        let request = VerifyOtpRequest {
            phone_number: phone_number.trim().to_string(),
            otp_code: otp_code.trim().to_string(),
        };
        request.validate()?;

        let token = self.api.verify_otp(&request).await?;
        self.session
            .save_verification(&token.access_token, &token.user_id, token.is_profile_complete)
            .await?;
        if token.is_profile_complete {
            self.remember_user_name().await;
        }

        tracing::info!(
            "Verified user {} (profile complete: {})",
            token.user_id,
            token.is_profile_complete
        );
        Ok(token)
    }

    async fn try_setup_profile(
        &self,
        name: &str,
        gender: Gender,
        age: Option<u8>,
        city: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let auth = bearer(&self.session)?;
        let request = ProfileSetupRequest {
            name: name.trim().to_string(),
            gender,
            age,
            city: city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        };
        request.validate()?;

        let user = self.api.setup_profile(&auth, &request).await?;
        self.session.save_profile(&request.name).await?;
        Ok(user.normalized())
    }

    /// Fetch the display name of a returning user. Failure only costs the greeting.
    async fn remember_user_name(&self) {
        let name = match self.try_current_user().await {
            Ok(user) => user.name,
            Err(e) => {
                tracing::warn!("Could not fetch profile after verification: {}", e);
                return;
            }
        };

        if let Some(name) = name {
            if let Err(e) = self.session.save_user_name(&name).await {
                tracing::warn!("Could not store user name: {}", e);
            }
        }
    }

    async fn try_current_user(&self) -> Result<User, RepositoryError> {
        let auth = bearer(&self.session)?;
        Ok(self.api.current_user(&auth).await?.normalized())
    }

    async fn try_queue_status(&self) -> Result<QueueStatus, RepositoryError> {
        let auth = bearer(&self.session)?;
        Ok(self.api.queue_status(&auth).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn repository(base_url: &str) -> (AuthRepository, Arc<SessionStore>) {
        let api = Arc::new(ApiClient::new(base_url, Duration::from_secs(5)).unwrap());
        let session = Arc::new(SessionStore::in_memory());
        (AuthRepository::new(api, session.clone()), session)
    }

    #[tokio::test]
    async fn test_invalid_phone_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/auth/register").expect(0).create_async().await;

        let (repo, session) = repository(&server.url());
        let outcome = repo.register("123").await;

        assert!(!outcome.is_success());
        assert!(session.snapshot().phone_number.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_verify_stores_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/verify-otp")
            .with_status(400)
            .with_body(r#"{"detail":"Invalid OTP"}"#)
            .create_async()
            .await;

        let (repo, session) = repository(&server.url());
        let outcome = repo.verify_otp("+919999999999", "654321").await;

        assert_eq!(outcome, Outcome::error("Invalid OTP", Some(400)));
        assert!(session.snapshot().credentials.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (repo, session) = repository("http://localhost:8000/api/v1/");
        session.save_credentials("tok", "u1").await.unwrap();
        let logged_in = repo.is_logged_in();
        assert_eq!(logged_in.current().as_deref(), Some("tok"));

        assert!(repo.logout().await.is_success());
        assert_eq!(logged_in.current(), None);
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_verify_records_profile_completeness() {
        let mut server = mockito::Server::new_async().await;
        let _verify = server
            .mock("POST", "/auth/verify-otp")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","user_id":"u1","is_profile_complete":true}"#)
            .create_async()
            .await;
        let me = server
            .mock("GET", "/users/me")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                r#"{"id":"0b6f5d1e-8a43-4f7a-9a52-3f1e2d4c5b6a","phone_number":"+919999999999",
                "name":"Asha","status":"WAITING","registered_at":"2024-05-01T10:15:30"}"#,
            )
            .create_async()
            .await;

        let (repo, session) = repository(&server.url());
        assert!(repo.verify_otp("+919999999999", "123456").await.is_success());

        let stored = session.snapshot();
        assert_eq!(stored.credentials.unwrap().access_token, "tok");
        assert!(stored.profile_complete);
        assert_eq!(stored.user_name.as_deref(), Some("Asha"));
        me.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_stores_echoed_number() {
        let mut server = mockito::Server::new_async().await;
        let _register = server
            .mock("POST", "/auth/register")
            .with_status(200)
            .with_body(r#"{"message":"OTP sent","phone_number":"+919999999999"}"#)
            .create_async()
            .await;

        let (repo, session) = repository(&server.url());
        let response = repo.register("+91 99999 99999").await.success().unwrap();

        assert_eq!(response.phone_number, "+919999999999");
        assert_eq!(session.get(SessionKey::PhoneNumber).as_deref(), Some("+919999999999"));
    }
}
