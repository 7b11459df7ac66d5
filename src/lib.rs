//! Concort client - session, repository and screen-state layer for the Concort dating app
//!
//! Users register by phone number, verify an OTP, complete a profile and
//! wait in the matching queue; once matched they chat with their match.
//! Everything here is coordination over the remote API: a persisted session
//! store, typed endpoint bindings, repositories returning a uniform
//! [`Outcome`], the session state machine that gates navigation, and the
//! per-screen state holders.

pub mod config;
pub mod core;
pub mod holders;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use core::{Navigator, Outcome, Screen, SessionEvent, SessionMachine, SessionState};
pub use holders::{AuthHolder, ChatHolder, HomeHolder};
pub use repositories::{AuthRepository, ChatRepository, MatchRepository};
pub use services::{ApiClient, SessionStore};
