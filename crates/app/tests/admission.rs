mod support;

use quota_core::{NewUsageRecord, QuotaLimits};
use support::{fakes, records, seed, setup_app, turn_service};

use quota_app::TurnReply;

fn limits(max_users: u64) -> QuotaLimits {
    QuotaLimits {
        max_users,
        ..QuotaLimits::default()
    }
}

#[test]
fn new_user_is_denied_once_others_reach_the_cap() {
    let app = setup_app(limits(2));
    seed(
        &app,
        vec![
            NewUsageRecord::user(1, "hi", 0),
            NewUsageRecord::user(2, "hello", 0),
        ],
    );

    let decision = app.state.services.admission.check(3).expect("check");

    assert!(!decision.is_allowed());
    assert!(
        decision
            .denial()
            .expect("denial")
            .message()
            .contains("limit of 2 users")
    );
}

#[test]
fn known_user_counts_only_the_others() {
    let app = setup_app(limits(2));
    seed(
        &app,
        vec![
            NewUsageRecord::user(1, "hi", 0),
            NewUsageRecord::user(2, "hello", 0),
        ],
    );

    assert!(app.state.services.admission.check(1).expect("check").is_allowed());
    assert!(app.state.services.admission.check(2).expect("check").is_allowed());
}

#[test]
fn returning_user_is_denied_when_population_reached_cap_without_them() {
    let app = setup_app(limits(2));
    seed(
        &app,
        vec![
            NewUsageRecord::user(1, "hi", 0),
            NewUsageRecord::user(2, "hello", 0),
            NewUsageRecord::user(3, "hey", 0),
        ],
    );

    let decision = app.state.services.admission.check(3).expect("check");
    assert!(!decision.is_allowed());
}

#[test]
fn empty_ledger_admits_anyone() {
    let app = setup_app(limits(1));
    assert!(app.state.services.admission.check(42).expect("check").is_allowed());
}

#[test]
fn denied_user_gets_a_reply_and_nothing_is_recorded() {
    let app = setup_app(limits(1));
    seed(&app, vec![NewUsageRecord::user(1, "hi", 0)]);
    let fakes = fakes("sure", 3);
    let turns = turn_service(&app, &fakes);

    let reply = turns.handle_text(2, "hello there");

    assert!(matches!(reply, TurnReply::Denied(ref message) if message.contains("limit of 1 users")));
    assert_eq!(fakes.engine.calls(), 0);
    assert!(records(&app, 2).is_empty());
}

#[test]
fn unmigrated_store_fails_closed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = quota_app::AppState::new(dir.path().join("missing.sqlite"), limits(3));

    let err = state.services.admission.check(1).expect_err("store error");

    assert!(err.is_store_unavailable());
    assert_eq!(err.user_message(), quota_app::APOLOGY);
}
