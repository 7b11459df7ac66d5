use crate::core::{EventKind, Outcome, SessionEvent, SessionMachine, SessionState};
use crate::holders::{begin, fail, LoadState, ResendCooldown};
use crate::models::Gender;
use crate::repositories::AuthRepository;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub is_otp_sent: bool,
    pub is_verified: bool,
    pub is_profile_complete: bool,
    pub phone_number: String,
}

impl LoadState for AuthState {
    fn loading(&mut self) -> &mut bool {
        &mut self.is_loading
    }

    fn error(&mut self) -> &mut Option<String> {
        &mut self.error_message
    }
}

/// State behind the register, OTP and profile-setup screens
///
/// Successful results are also fed to the [`SessionMachine`], which is what
/// navigation follows.
pub struct AuthHolder {
    repository: Arc<AuthRepository>,
    session: Arc<SessionMachine>,
    state: watch::Sender<AuthState>,
    cooldown: Mutex<ResendCooldown>,
}

impl AuthHolder {
    pub fn new(repository: Arc<AuthRepository>, session: Arc<SessionMachine>) -> Self {
        let mut initial = AuthState::default();
        match session.current() {
            SessionState::OtpPending { phone_number } => {
                initial.is_otp_sent = true;
                initial.phone_number = phone_number;
            }
            SessionState::ProfileIncomplete { .. } => initial.is_verified = true,
            SessionState::Active { .. } => {
                initial.is_verified = true;
                initial.is_profile_complete = true;
            }
            SessionState::Unauthenticated => {}
        }

        let (state, _) = watch::channel(initial);
        Self {
            repository,
            session,
            state,
            cooldown: Mutex::new(ResendCooldown::default()),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Seconds until "resend code" is available again
    pub fn resend_remaining_secs(&self) -> u64 {
        self.lock_cooldown().remaining_secs(Instant::now())
    }

    pub async fn register(&self, phone_number: &str) {
        if !begin(&self.state) {
            tracing::debug!("Register already in flight, ignoring");
            return;
        }
        if !self.permit(EventKind::OtpDispatched) {
            return;
        }

        match self.repository.register(phone_number).await {
            Outcome::Success(response) => {
                self.lock_cooldown().restart(Instant::now());
                let dispatched = SessionEvent::OtpDispatched {
                    phone_number: response.phone_number.clone(),
                };
                if !self.advance(dispatched) {
                    return;
                }
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.is_otp_sent = true;
                    s.phone_number = response.phone_number;
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    /// Ask for a fresh code for the number the OTP was sent to
    pub async fn resend_otp(&self) {
        let remaining = self.resend_remaining_secs();
        if remaining > 0 {
            fail(&self.state, format!("Resend code in {}s", remaining));
            return;
        }

        let phone_number = self.state.borrow().phone_number.clone();
        if phone_number.is_empty() {
            fail(&self.state, "No phone number to resend to".to_string());
            return;
        }

        if !begin(&self.state) || !self.permit(EventKind::OtpDispatched) {
            return;
        }

        match self.repository.resend_otp(&phone_number).await {
            Outcome::Success(_) => {
                self.lock_cooldown().restart(Instant::now());
                if !self.advance(SessionEvent::OtpDispatched { phone_number }) {
                    return;
                }
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.is_otp_sent = true;
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    pub async fn verify_otp(&self, phone_number: &str, otp_code: &str) {
        if !begin(&self.state) {
            tracing::debug!("Verification already in flight, ignoring");
            return;
        }
        // Credentials are stored on success, so refuse before the request
        if !self.permit(EventKind::OtpVerified) {
            return;
        }

        match self.repository.verify_otp(phone_number, otp_code).await {
            Outcome::Success(token) => {
                let verified = SessionEvent::OtpVerified {
                    user_id: token.user_id.clone(),
                    profile_complete: token.is_profile_complete,
                };
                if !self.advance(verified) {
                    return;
                }
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.is_verified = true;
                    s.is_profile_complete = token.is_profile_complete;
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    pub async fn setup_profile(&self, name: &str, gender: Gender, age: Option<u8>, city: Option<&str>) {
        if !begin(&self.state) || !self.permit(EventKind::ProfileCompleted) {
            return;
        }

        match self.repository.setup_profile(name, gender, age, city).await {
            Outcome::Success(_) => {
                if !self.advance(SessionEvent::ProfileCompleted) {
                    return;
                }
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.is_profile_complete = true;
                });
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    pub async fn logout(&self) {
        self.sign_out(self.repository.logout().await);
    }

    pub async fn delete_account(&self) {
        self.sign_out(self.repository.delete_account().await);
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error_message.take().is_some());
    }

    pub fn reset(&self) {
        self.state.send_replace(AuthState::default());
    }

    fn sign_out(&self, outcome: Outcome<()>) {
        match outcome {
            Outcome::Success(()) => {
                self.advance(SessionEvent::SignedOut);
                self.reset();
            }
            Outcome::Error { message, .. } => fail(&self.state, message),
        }
    }

    /// Fails the in-flight action when the session is in the wrong state for it.
    fn permit(&self, kind: EventKind) -> bool {
        match self.session.check(kind) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Refusing {}: {}", kind.name(), e);
                fail(&self.state, e.to_string());
                false
            }
        }
    }

    /// Returns false, with the rejection shown as the error, if the machine refused `event`.
    fn advance(&self, event: SessionEvent) -> bool {
        match self.session.apply(event) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Session rejected result: {}", e);
                fail(&self.state, e.to_string());
                false
            }
        }
    }

    fn lock_cooldown(&self) -> std::sync::MutexGuard<'_, ResendCooldown> {
        self.cooldown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
