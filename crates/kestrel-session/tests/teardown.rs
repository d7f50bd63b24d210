//! Session teardown, churn and unpairing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use kestrel_session::model::NotificationPayload;
use kestrel_session::ports::{AccessState, PrefKey, SettingsStore};
use kestrel_session::{LaunchOutcome, SessionState};
use kestrel_testkit::{wait_until, TestHarness, UiCall};

#[tokio::test]
async fn teardown_is_idempotent() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    orchestrator.start().await;

    assert!(orchestrator.teardown());
    assert!(!orchestrator.teardown());

    assert_eq!(orchestrator.state(), SessionState::TornDown);
    assert_eq!(harness.journal.count("artifacts.delete_qr"), 1);
    assert_eq!(harness.bus.registrations::<NotificationPayload>(), 0);
    assert_eq!(orchestrator.session_id(), None);
}

#[tokio::test]
async fn notifications_after_teardown_are_ignored() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    orchestrator.start().await;
    let pulls = harness.pulls();
    orchestrator.teardown();

    assert_eq!(harness.notify(), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(harness.pulls(), pulls);
    assert!(!orchestrator.check_for_messages());
    assert_eq!(orchestrator.update_ticker().await, None);
}

#[tokio::test]
async fn teardown_dismisses_seen_announcement_after_onboarding() {
    let harness = TestHarness::new();
    harness.settings.set_bool(PrefKey::OnboardingComplete, true);
    harness.settings.set_bool(PrefKey::LatestAnnouncementSeen, true);
    let orchestrator = harness.orchestrator();
    orchestrator.start().await;

    orchestrator.teardown();

    assert!(harness
        .settings
        .get_bool(PrefKey::LatestAnnouncementDismissed, false));
}

#[tokio::test]
async fn unseen_announcement_stays_undismissed() {
    let harness = TestHarness::new();
    harness.settings.set_bool(PrefKey::OnboardingComplete, true);
    let orchestrator = harness.orchestrator();

    orchestrator.teardown();

    assert!(!harness
        .settings
        .get_bool(PrefKey::LatestAnnouncementDismissed, false));
    assert_eq!(harness.journal.count("artifacts.delete_qr"), 1);
}

#[tokio::test]
async fn teardown_during_bootstrap_suppresses_completion() {
    let harness = TestHarness::new();
    harness.payload.script().load_delay = Some(Duration::from_millis(200));
    let orchestrator = harness.orchestrator();

    let (outcome, _) = tokio::join!(orchestrator.start(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.teardown()
    });

    assert!(matches!(outcome, LaunchOutcome::Cancelled { .. }));
    assert!(!harness.ui.contains(&UiCall::HideProgress));
    assert!(!harness.ui.contains(&UiCall::StartBalanceView));
    assert!(!harness.journal.contains("contacts.init_contacts_service"));
    assert_eq!(orchestrator.state(), SessionState::TornDown);
}

#[tokio::test]
async fn teardown_during_launch_diagnostics_reaches_no_ui() {
    let harness = TestHarness::new();
    harness.payload.script().balance_delay = Some(Duration::from_millis(200));
    let orchestrator = harness.orchestrator();

    let (outcome, _) = tokio::join!(orchestrator.start(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.teardown()
    });

    assert!(matches!(outcome, LaunchOutcome::Cancelled { .. }));
    assert!(harness.ui.calls().is_empty());
    assert!(harness.journal.contains("payload.imported_addresses_balance"));
    assert!(!harness.journal.contains("payload.load_nodes"));
    assert!(harness.journal.with_prefix("diagnostics.legacy").is_empty());
    assert_eq!(orchestrator.state(), SessionState::TornDown);
}

#[tokio::test]
async fn logged_out_start_closes_previous_session() {
    let harness = TestHarness::new();
    harness.add_contact("peer1", None, 0);
    let orchestrator = harness.orchestrator();
    orchestrator.start().await;
    assert_eq!(harness.bus.registrations::<NotificationPayload>(), 1);

    harness.access.set_logged_in(false);
    let outcome = orchestrator.start().await;

    assert_eq!(outcome, LaunchOutcome::LoginRequired);
    assert_eq!(orchestrator.state(), SessionState::NotAuthenticated);
    assert_eq!(orchestrator.session_id(), None);
    assert_eq!(harness.bus.registrations::<NotificationPayload>(), 0);

    let pulls = harness.pulls();
    assert_eq!(harness.notify(), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.pulls(), pulls);
    assert!(!orchestrator.check_for_messages());
    assert!(harness.ui.contains(&UiCall::RouteToLogin));
}

#[tokio::test]
async fn restart_replaces_previous_session() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();

    let first = orchestrator.start().await;
    let second = orchestrator.start().await;

    let (LaunchOutcome::Ready { session: a, .. }, LaunchOutcome::Ready { session: b, .. }) =
        (first, second)
    else {
        panic!("both launches should reach ready");
    };
    assert_ne!(a, b);
    assert_eq!(orchestrator.session_id(), Some(b));
    assert_eq!(harness.bus.registrations::<NotificationPayload>(), 1);
    assert_eq!(harness.journal.count("contacts.init_contacts_service"), 2);

    let pulls = harness.pulls();
    harness.notify();
    assert!(wait_until(|| harness.pulls() == pulls + 1).await);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.pulls(), pulls + 1);
}

#[tokio::test]
async fn unpair_clears_device_and_tears_down() {
    let harness = TestHarness::new();
    harness.settings.set_string(PrefKey::SelectedFiat, "EUR");
    let orchestrator = harness.orchestrator();
    orchestrator.start().await;
    assert!(harness.cache.fee_options().is_some());

    orchestrator.unpair();

    assert!(harness.ui.contains(&UiCall::ClearAppShortcuts));
    let journal = &harness.journal;
    let order: Vec<usize> = [
        "payload.wipe",
        "settings.log_out",
        "access.unpair_wallet",
        "access.restart_app",
        "access.set_pin",
        "artifacts.delete_qr",
    ]
    .iter()
    .map(|call| journal.position(call).unwrap())
    .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(harness.access.pin(), None);
    assert!(!harness.access.is_logged_in());
    assert_eq!(harness.settings.get_string(PrefKey::SelectedFiat), None);
    assert!(harness.cache.fee_options().is_none());
    assert_eq!(orchestrator.state(), SessionState::TornDown);
}
