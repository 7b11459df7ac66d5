use crate::core::session::SessionState;
use thiserror::Error;

/// App destinations, keyed by route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Splash,
    Welcome,
    Register,
    OtpVerification { phone_number: String },
    ProfileSetup,
    Home,
    MatchFound { match_id: String },
    Chat { match_id: String },
    Profile,
    Settings,
}

impl Screen {
    pub fn route(&self) -> String {
        match self {
            Screen::Splash => "splash".to_string(),
            Screen::Welcome => "welcome".to_string(),
            Screen::Register => "register".to_string(),
            Screen::OtpVerification { phone_number } => format!("otp_verification/{}", phone_number),
            Screen::ProfileSetup => "profile_setup".to_string(),
            Screen::Home => "home".to_string(),
            Screen::MatchFound { match_id } => format!("match_found/{}", match_id),
            Screen::Chat { match_id } => format!("chat/{}", match_id),
            Screen::Profile => "profile".to_string(),
            Screen::Settings => "settings".to_string(),
        }
    }

    pub fn from_route(route: &str) -> Option<Screen> {
        let (head, arg) = match route.split_once('/') {
            Some((head, arg)) if !arg.is_empty() => (head, Some(arg.to_string())),
            Some(_) => return None,
            None => (route, None),
        };

        match (head, arg) {
            ("splash", None) => Some(Screen::Splash),
            ("welcome", None) => Some(Screen::Welcome),
            ("register", None) => Some(Screen::Register),
            ("otp_verification", Some(phone_number)) => Some(Screen::OtpVerification { phone_number }),
            ("profile_setup", None) => Some(Screen::ProfileSetup),
            ("home", None) => Some(Screen::Home),
            ("match_found", Some(match_id)) => Some(Screen::MatchFound { match_id }),
            ("chat", Some(match_id)) => Some(Screen::Chat { match_id }),
            ("profile", None) => Some(Screen::Profile),
            ("settings", None) => Some(Screen::Settings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("Screen {route} is not reachable while {state}")]
    Unreachable { route: String, state: &'static str },
}

/// Back stack gated by the current session state
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
    state: SessionState,
}

impl Navigator {
    /// Start on the splash screen
    pub fn new(state: SessionState) -> Self {
        Self {
            stack: vec![Screen::Splash],
            state,
        }
    }

    pub fn current(&self) -> &Screen {
        // The stack is never empty
        &self.stack[self.stack.len() - 1]
    }

    pub fn stack(&self) -> &[Screen] {
        &self.stack
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Leave the splash screen for the state's landing screen
    pub fn complete_splash(&mut self) {
        if self.stack == [Screen::Splash] {
            self.stack = vec![self.state.landing()];
        }
    }

    pub fn navigate(&mut self, screen: Screen) -> Result<(), NavigationError> {
        if !self.state.allows(&screen) {
            return Err(NavigationError::Unreachable {
                route: screen.route(),
                state: self.state.name(),
            });
        }
        if self.current() != &screen {
            tracing::debug!("Navigate {} -> {}", self.current().route(), screen.route());
            self.stack.push(screen);
        }
        Ok(())
    }

    /// Pop one screen. Returns false when already at the root.
    pub fn back(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    /// Rebase the stack after a session transition.
    ///
    /// Screens the new state cannot reach are dropped; the new state's
    /// landing screen ends up on top.
    pub fn on_state_changed(&mut self, state: SessionState) {
        if state == self.state {
            return;
        }

        self.stack
            .retain(|screen| *screen != Screen::Splash && state.allows(screen));

        let landing = state.landing();
        if self.stack.last() != Some(&landing) {
            self.stack.push(landing);
        }

        tracing::debug!(
            "Session {} -> {}, now on {}",
            self.state.name(),
            state.name(),
            self.current().route()
        );
        self.state = state;
    }
}
