// Screen state holders
pub mod auth;
pub mod chat;
pub mod cooldown;
pub mod home;

pub use auth::{AuthHolder, AuthState};
pub use chat::{ChatHolder, ChatState};
pub use cooldown::{ResendCooldown, RESEND_COOLDOWN};
pub use home::{HomeHolder, HomeState};

use tokio::sync::watch;

/// Loading flag and error text every screen state carries
pub trait LoadState {
    fn loading(&mut self) -> &mut bool;
    fn error(&mut self) -> &mut Option<String>;
}

/// Mark `state` as loading and clear the previous error.
///
/// Returns false, leaving the state alone, if a request is already in flight.
pub(crate) fn begin<S: LoadState>(state: &watch::Sender<S>) -> bool {
    state.send_if_modified(|s| {
        if *s.loading() {
            return false;
        }
        *s.loading() = true;
        *s.error() = None;
        true
    })
}

pub(crate) fn fail<S: LoadState>(state: &watch::Sender<S>, message: String) {
    state.send_modify(|s| {
        *s.loading() = false;
        *s.error() = Some(message);
    });
}
