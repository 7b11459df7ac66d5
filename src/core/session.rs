use crate::core::navigation::Screen;
use crate::services::Session;
use thiserror::Error;
use tokio::sync::watch;

/// Which part of the app the user may reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    OtpPending { phone_number: String },
    ProfileIncomplete { user_id: String },
    Active { user_id: String },
}

/// Repository results that move the session forward (or back to the start)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    OtpDispatched { phone_number: String },
    OtpVerified { user_id: String, profile_complete: bool },
    ProfileCompleted,
    SignedOut,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::OtpDispatched { .. } => EventKind::OtpDispatched,
            SessionEvent::OtpVerified { .. } => EventKind::OtpVerified,
            SessionEvent::ProfileCompleted => EventKind::ProfileCompleted,
            SessionEvent::SignedOut => EventKind::SignedOut,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// A `SessionEvent` without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OtpDispatched,
    OtpVerified,
    ProfileCompleted,
    SignedOut,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::OtpDispatched => "otp_dispatched",
            EventKind::OtpVerified => "otp_verified",
            EventKind::ProfileCompleted => "profile_completed",
            EventKind::SignedOut => "signed_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Event {event} is not valid in state {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::OtpPending { .. } => "otp_pending",
            SessionState::ProfileIncomplete { .. } => "profile_incomplete",
            SessionState::Active { .. } => "active",
        }
    }

    /// Derive the start state from whatever was persisted last time.
    ///
    /// A stored name or the profile-complete flag means profile setup is done.
    pub fn restore(session: &Session) -> Self {
        let profile_done = session.profile_complete || session.user_name.is_some();

        match (&session.credentials, &session.phone_number) {
            (Some(c), _) if profile_done => SessionState::Active {
                user_id: c.user_id.clone(),
            },
            (Some(c), _) => SessionState::ProfileIncomplete {
                user_id: c.user_id.clone(),
            },
            (None, Some(phone)) => SessionState::OtpPending {
                phone_number: phone.clone(),
            },
            (None, None) => SessionState::Unauthenticated,
        }
    }

    /// Whether an event of this kind is legal here
    pub fn accepts(&self, kind: EventKind) -> bool {
        use SessionState::*;
        match (self, kind) {
            (_, EventKind::SignedOut) => true,
            (Unauthenticated | OtpPending { .. }, EventKind::OtpDispatched) => true,
            (OtpPending { .. }, EventKind::OtpVerified) => true,
            (ProfileIncomplete { .. }, EventKind::ProfileCompleted) => true,
            _ => false,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::ProfileIncomplete { user_id } | SessionState::Active { user_id } => {
                Some(user_id)
            }
            _ => None,
        }
    }

    /// Screen shown when this state is entered
    pub fn landing(&self) -> Screen {
        match self {
            SessionState::Unauthenticated => Screen::Welcome,
            SessionState::OtpPending { phone_number } => Screen::OtpVerification {
                phone_number: phone_number.clone(),
            },
            SessionState::ProfileIncomplete { .. } => Screen::ProfileSetup,
            SessionState::Active { .. } => Screen::Home,
        }
    }

    pub fn allows(&self, screen: &Screen) -> bool {
        use SessionState::*;
        match (self, screen) {
            (_, Screen::Splash) => true,
            (Unauthenticated | OtpPending { .. }, Screen::Welcome | Screen::Register) => true,
            (OtpPending { phone_number }, Screen::OtpVerification { phone_number: target }) => {
                phone_number == target
            }
            (ProfileIncomplete { .. }, Screen::ProfileSetup) => true,
            (
                Active { .. },
                Screen::Home
                | Screen::MatchFound { .. }
                | Screen::Chat { .. }
                | Screen::Profile
                | Screen::Settings,
            ) => true,
            _ => false,
        }
    }
}

/// The single transition function
pub fn transition(state: &SessionState, event: SessionEvent) -> Result<SessionState, TransitionError> {
    use SessionState::*;

    let rejected = TransitionError {
        state: state.name(),
        event: event.name(),
    };
    if !state.accepts(event.kind()) {
        return Err(rejected);
    }

    match event {
        SessionEvent::SignedOut => Ok(Unauthenticated),
        SessionEvent::OtpDispatched { phone_number } => Ok(OtpPending { phone_number }),
        SessionEvent::OtpVerified {
            user_id,
            profile_complete: true,
        } => Ok(Active { user_id }),
        SessionEvent::OtpVerified {
            user_id,
            profile_complete: false,
        } => Ok(ProfileIncomplete { user_id }),
        SessionEvent::ProfileCompleted => state
            .user_id()
            .map(|user_id| Active {
                user_id: user_id.to_string(),
            })
            .ok_or(rejected),
    }
}

/// Observable holder of the current `SessionState`
pub struct SessionMachine {
    state: watch::Sender<SessionState>,
}

impl SessionMachine {
    pub fn new(initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn restore(session: &Session) -> Self {
        let initial = SessionState::restore(session);
        tracing::debug!("Restored session state: {}", initial.name());
        Self::new(initial)
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Fail early if the current state would refuse an event of this kind
    pub fn check(&self, kind: EventKind) -> Result<(), TransitionError> {
        let current = self.state.borrow();
        if current.accepts(kind) {
            Ok(())
        } else {
            Err(TransitionError {
                state: current.name(),
                event: kind.name(),
            })
        }
    }

    /// Apply `event`; on rejection the state is left untouched.
    pub fn apply(&self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        let mut outcome = None;

        self.state.send_if_modified(|current| {
            let from = current.name();
            let result = transition(current, event);
            let changed = matches!(&result, Ok(next) if *next != *current);
            if let Ok(next) = &result {
                tracing::info!("Session {} -> {}", from, next.name());
                *current = next.clone();
            }
            outcome = Some(result);
            changed
        });

        outcome.unwrap_or_else(|| Ok(self.current()))
    }
}
