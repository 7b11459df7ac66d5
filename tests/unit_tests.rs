// Unit tests for the Concort client

use concort_client::core::{transition, Navigator, Outcome, Screen, SessionEvent, SessionMachine, SessionState};
use concort_client::holders::{ResendCooldown, RESEND_COOLDOWN};
use concort_client::models::{Gender, QueueStatus, User, UserStatus};
use concort_client::repositories::{AuthRepository, ChatRepository};
use concort_client::services::{ApiClient, SessionKey, SessionStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const PHONE: &str = "+919999999999";
const USER_ID: &str = "0b6f5d1e-8a43-4f7a-9a52-3f1e2d4c5b6a";

fn otp_pending() -> SessionState {
    SessionState::OtpPending {
        phone_number: PHONE.to_string(),
    }
}

fn verified(profile_complete: bool) -> SessionEvent {
    SessionEvent::OtpVerified {
        user_id: USER_ID.to_string(),
        profile_complete,
    }
}

/// Repositories pointed at an address nothing listens on
fn offline_repositories() -> (Arc<SessionStore>, AuthRepository, ChatRepository) {
    let api = Arc::new(ApiClient::new("http://127.0.0.1:1/api/v1", Duration::from_secs(1)).unwrap());
    let session = Arc::new(SessionStore::in_memory());
    (
        session.clone(),
        AuthRepository::new(api.clone(), session.clone()),
        ChatRepository::new(api, session),
    )
}

#[test]
fn test_full_sign_up_path() {
    let state = SessionState::Unauthenticated;
    let state = transition(&state, SessionEvent::OtpDispatched { phone_number: PHONE.to_string() }).unwrap();
    assert_eq!(state, otp_pending());

    let state = transition(&state, verified(false)).unwrap();
    assert_eq!(state, SessionState::ProfileIncomplete { user_id: USER_ID.to_string() });

    let state = transition(&state, SessionEvent::ProfileCompleted).unwrap();
    assert_eq!(state, SessionState::Active { user_id: USER_ID.to_string() });
}

#[test]
fn test_returning_user_skips_profile_setup() {
    let state = transition(&otp_pending(), verified(true)).unwrap();
    assert_eq!(state.landing(), Screen::Home);
}

#[test]
fn test_sign_out_from_every_state() {
    let states = [
        SessionState::Unauthenticated,
        otp_pending(),
        SessionState::ProfileIncomplete { user_id: USER_ID.to_string() },
        SessionState::Active { user_id: USER_ID.to_string() },
    ];

    for state in states {
        assert_eq!(
            transition(&state, SessionEvent::SignedOut).unwrap(),
            SessionState::Unauthenticated
        );
    }
}

#[test]
fn test_out_of_order_events_are_rejected() {
    let active = SessionState::Active { user_id: USER_ID.to_string() };

    assert!(transition(&SessionState::Unauthenticated, verified(true)).is_err());
    assert!(transition(&SessionState::Unauthenticated, SessionEvent::ProfileCompleted).is_err());
    assert!(transition(&active, SessionEvent::OtpDispatched { phone_number: PHONE.to_string() }).is_err());
    assert!(transition(&active, verified(false)).is_err());

    let err = transition(&otp_pending(), SessionEvent::ProfileCompleted).unwrap_err();
    assert_eq!(err.state, "otp_pending");
    assert_eq!(err.event, "profile_completed");
}

#[test]
fn test_machine_keeps_state_on_rejection() {
    let machine = SessionMachine::new(SessionState::Unauthenticated);
    assert!(machine.apply(SessionEvent::ProfileCompleted).is_err());
    assert_eq!(machine.current(), SessionState::Unauthenticated);

    machine
        .apply(SessionEvent::OtpDispatched { phone_number: PHONE.to_string() })
        .unwrap();
    assert_eq!(machine.current(), otp_pending());
}

#[test]
fn test_profile_incomplete_cannot_reach_home() {
    let state = SessionState::ProfileIncomplete { user_id: USER_ID.to_string() };
    assert!(!state.allows(&Screen::Home));
    assert!(!state.allows(&Screen::Chat { match_id: "m1".to_string() }));
    assert!(state.allows(&Screen::ProfileSetup));

    let mut navigator = Navigator::new(state);
    navigator.complete_splash();
    assert_eq!(navigator.current(), &Screen::ProfileSetup);
    assert!(navigator.navigate(Screen::Home).is_err());
    assert_eq!(navigator.stack(), &[Screen::ProfileSetup]);
}

#[test]
fn test_otp_screen_bound_to_pending_number() {
    let state = otp_pending();
    assert!(state.allows(&Screen::OtpVerification { phone_number: PHONE.to_string() }));
    assert!(!state.allows(&Screen::OtpVerification { phone_number: "+910000000000".to_string() }));
}

#[test]
fn test_sign_out_rebases_to_welcome() {
    let mut navigator = Navigator::new(SessionState::Active { user_id: USER_ID.to_string() });
    navigator.complete_splash();
    navigator.navigate(Screen::Chat { match_id: "m1".to_string() }).unwrap();
    navigator.navigate(Screen::Settings).unwrap();
    assert_eq!(navigator.stack().len(), 3);

    navigator.on_state_changed(SessionState::Unauthenticated);
    assert_eq!(navigator.stack(), &[Screen::Welcome]);
    assert!(!navigator.back());
}

#[test]
fn test_back_stack() {
    let mut navigator = Navigator::new(SessionState::Unauthenticated);
    navigator.complete_splash();
    navigator.navigate(Screen::Register).unwrap();
    // Navigating to the current screen does not duplicate it
    navigator.navigate(Screen::Register).unwrap();
    assert_eq!(navigator.stack().len(), 2);

    assert!(navigator.back());
    assert_eq!(navigator.current(), &Screen::Welcome);
}

#[test]
fn test_routes_parse_back() {
    let screens = [
        Screen::Welcome,
        Screen::OtpVerification { phone_number: PHONE.to_string() },
        Screen::Chat { match_id: "m1".to_string() },
        Screen::Settings,
    ];
    for screen in screens {
        assert_eq!(Screen::from_route(&screen.route()), Some(screen));
    }

    assert_eq!(Screen::from_route("chat/"), None);
    assert_eq!(Screen::from_route("nowhere"), None);
}

#[test]
fn test_restore_from_persisted_session() {
    let store = SessionStore::in_memory();
    assert_eq!(SessionState::restore(&store.snapshot()), SessionState::Unauthenticated);

    tokio_test::block_on(store.save_phone_number(PHONE)).unwrap();
    assert_eq!(SessionState::restore(&store.snapshot()), otp_pending());

    tokio_test::block_on(store.save_credentials("tok", USER_ID)).unwrap();
    assert_eq!(
        SessionState::restore(&store.snapshot()),
        SessionState::ProfileIncomplete { user_id: USER_ID.to_string() }
    );

    tokio_test::block_on(store.save_user_name("Ravi")).unwrap();
    assert_eq!(
        SessionState::restore(&store.snapshot()),
        SessionState::Active { user_id: USER_ID.to_string() }
    );
}

#[test]
fn test_cooldown_countdown() {
    let start = Instant::now();
    let mut cooldown = ResendCooldown::default();
    assert!(cooldown.can_resend(start));

    cooldown.restart(start);
    assert_eq!(cooldown.remaining_secs(start), RESEND_COOLDOWN.as_secs());
    assert_eq!(cooldown.remaining_secs(start + Duration::from_millis(29_500)), 1);
    assert!(cooldown.can_resend(start + RESEND_COOLDOWN));
}

#[test]
fn test_rank_label() {
    let status = QueueStatus {
        rank: 7,
        estimated_wait_time: Some("~2 days".to_string()),
        males_waiting: 45,
        females_waiting: 32,
        last_updated: Utc::now(),
    };
    assert_eq!(status.rank_label(), "#7");
}

#[test]
fn test_matched_user_has_no_rank() {
    let user = User {
        id: Uuid::new_v4(),
        phone_number: PHONE.to_string(),
        name: None,
        gender: Some(Gender::Female),
        age: Some(25),
        city: None,
        is_verified: true,
        status: UserStatus::Matched,
        queue_rank: Some(3),
        profile_image_url: None,
        registered_at: Utc::now(),
    };

    let user = user.normalized();
    assert_eq!(user.queue_rank, None);
    assert_eq!(user.display_name(), "User");
    assert!(!user.is_profile_complete());
}

#[test]
fn test_outcome_map_keeps_error() {
    let ok: Outcome<u32> = Outcome::Success(2);
    assert_eq!(ok.map(|n| n * 2), Outcome::Success(4));

    let err: Outcome<u32> = Outcome::error("Match not found", Some(404));
    assert_eq!(err.map(|n| n * 2), Outcome::error("Match not found", Some(404)));
}

#[test]
fn test_invalid_otp_rejected_locally() {
    let (session, auth, _) = offline_repositories();

    let outcome = tokio_test::block_on(auth.verify_otp(PHONE, "12345"));
    let message = outcome.error_message().unwrap();
    assert!(message.starts_with("Invalid input"));
    assert_eq!(session.get(SessionKey::AccessToken), None);
}

#[test]
fn test_short_phone_rejected_locally() {
    let (session, auth, _) = offline_repositories();

    let outcome = tokio_test::block_on(auth.register("12345"));
    match outcome {
        Outcome::Error { message, code } => {
            assert!(message.starts_with("Invalid input"));
            assert_eq!(code, None);
        }
        Outcome::Success(_) => panic!("short phone number accepted"),
    }
    assert_eq!(session.get(SessionKey::PhoneNumber), None);
}

#[test]
fn test_blank_message_rejected_locally() {
    let (session, _, chat) = offline_repositories();
    tokio_test::block_on(session.save_credentials("tok", USER_ID)).unwrap();

    let outcome = tokio_test::block_on(chat.send_message("m1", "   "));
    assert!(outcome.error_message().unwrap().starts_with("Invalid input"));
}

#[test]
fn test_gender_parsing() {
    assert_eq!("male".parse::<Gender>(), Ok(Gender::Male));
    assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
    assert!("other".parse::<Gender>().is_err());
}
