//! Last-navigation-wins between overlapping cycles.

use super::harness::{route, RecordingChannel, RefreshScript, TestHarness, VerifyScript};
use crate::{BridgeEvent, CyclePhase, Destination, MessageOutcome};
use std::time::Duration;

#[tokio::test]
async fn later_navigation_supersedes_earlier_cycle() {
    let h = TestHarness::new();
    h.seed(Some("a"), Some("r"));
    h.gateway.delay_verify(Duration::from_millis(100));

    let engine = h.engine.clone();
    let slow = tokio::spawn(async move { engine.run_cycle(route("/home")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let fast = h.engine.run_cycle(route("/news")).await;
    let slow = slow.await.unwrap();

    assert!(slow.cycle_id < fast.cycle_id);
    assert!(!h.engine.is_current(slow.cycle_id));
    assert!(h.engine.is_current(fast.cycle_id));
    assert_eq!(fast.destination, Destination::Route(route("/news")));
}

#[tokio::test]
async fn discarding_a_stale_cycle_is_reported() {
    let h = TestHarness::new();
    let first = h.engine.begin_cycle(&route("/home"));
    let second = h.engine.begin_cycle(&route("/cart"));

    h.engine.discard_cycle(first);

    assert!(h.events().contains(&BridgeEvent::CycleDiscarded {
        cycle_id: first,
        current_cycle_id: second,
    }));
}

#[tokio::test]
async fn login_returns_to_most_recent_navigation() {
    let h = TestHarness::new();
    h.engine.run_cycle(route("/home")).await;
    h.engine.run_cycle(route("/cart")).await;

    let outcome = h
        .engine
        .handle_message(r#"{"type":"LOGIN_SUCCESS","accessToken":"a","refreshToken":"r"}"#)
        .await
        .unwrap();

    assert_eq!(outcome, MessageOutcome::Navigate(Destination::Route(route("/cart"))));
}

#[tokio::test]
async fn stale_cycle_failure_leaves_current_session_alone() {
    let h = TestHarness::new();
    h.seed(Some("a"), Some("r"));
    let channel = h.attach(RecordingChannel::ready());
    h.gateway.script_verify(VerifyScript::Invalid);
    h.gateway.script_refresh(RefreshScript::Reject);
    h.gateway.delay_verify(Duration::from_millis(100));

    let engine = h.engine.clone();
    let slow = tokio::spawn(async move { engine.run_cycle(route("/home")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.gateway.script_verify(VerifyScript::Valid);
    h.gateway.delay_verify(Duration::ZERO);
    let fast = h.engine.run_cycle(route("/news")).await;
    let slow = slow.await.unwrap();

    assert_eq!(fast.destination, Destination::Route(route("/news")));
    assert_eq!(slow.verdict(), CyclePhase::RefreshFailed);
    assert_eq!(h.secure.access_token().as_deref(), Some("a"));
    assert_eq!(h.secure.refresh_token().as_deref(), Some("r"));
    assert!(channel.posted().is_empty());
    assert!(h.events().contains(&BridgeEvent::StaleEffectSkipped {
        cycle_id: slow.cycle_id,
        current_cycle_id: fast.cycle_id,
        effect: "invalidate",
    }));
}

#[tokio::test]
async fn stale_cycle_refresh_is_not_persisted() {
    let h = TestHarness::new();
    h.seed(Some("a"), Some("r"));
    h.gateway.script_verify(VerifyScript::Invalid);
    h.gateway.delay_verify(Duration::from_millis(100));

    let engine = h.engine.clone();
    let slow = tokio::spawn(async move { engine.run_cycle(route("/home")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.gateway.script_verify(VerifyScript::Valid);
    h.gateway.delay_verify(Duration::ZERO);
    let fast = h.engine.run_cycle(route("/news")).await;
    let slow = slow.await.unwrap();

    assert_eq!(slow.verdict(), CyclePhase::RefreshOk);
    assert_eq!(h.secure.access_token().as_deref(), Some("a"));
    assert!(h.events().contains(&BridgeEvent::StaleEffectSkipped {
        cycle_id: slow.cycle_id,
        current_cycle_id: fast.cycle_id,
        effect: "persist_refresh",
    }));
}

#[tokio::test]
async fn status_check_is_never_stale() {
    let h = TestHarness::new();
    h.seed(Some("a"), Some("r"));
    h.gateway.script_verify(VerifyScript::Invalid);
    h.gateway.script_refresh(RefreshScript::Reject);
    h.engine.begin_cycle(&route("/cart"));

    assert!(!h.engine.is_logged_in().await);
    assert!(h.session_cleared());
    assert!(!h
        .events()
        .iter()
        .any(|e| matches!(e, BridgeEvent::StaleEffectSkipped { .. })));
}
