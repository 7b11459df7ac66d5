// Session core exports
pub mod navigation;
pub mod outcome;
pub mod session;

pub use navigation::{Navigator, NavigationError, Screen};
pub use outcome::{Outcome, RepositoryError};
pub use session::{transition, EventKind, SessionEvent, SessionMachine, SessionState, TransitionError};
