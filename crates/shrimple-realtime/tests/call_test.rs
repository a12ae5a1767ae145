//! Tests for the call signaling relay state machine.

mod common;

use serde_json::json;

use shrimple_core::config::realtime::RealtimeConfig;
use shrimple_core::types::id::UserId;
use shrimple_realtime::call::error::CallError;
use shrimple_realtime::call::session::{CallKind, CallState};
use shrimple_realtime::event::types::ServerEvent;

fn count_end_calls(events: &[ServerEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, ServerEvent::EndCall))
        .count()
}

#[tokio::test]
async fn test_full_call_flow() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he, mut rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    // Initiate: callee sees the offer.
    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Video, "alice", json!({"sdp": "offer"}))
        .expect("initiate");
    assert_eq!(session.state, CallState::Ringing);

    let events = common::drain(&mut rx_callee);
    match &events[..] {
        [ServerEvent::IncomingCall {
            signal,
            from,
            name,
            is_video,
        }] => {
            assert_eq!(signal["sdp"], "offer");
            assert_eq!(*from, caller);
            assert_eq!(name, "alice");
            assert!(is_video);
        }
        other => panic!("expected one incoming call, got {other:?}"),
    }

    // Accept: caller sees the answer, session goes active.
    engine
        .calls
        .accept_from(callee, caller, json!({"sdp": "answer"}))
        .expect("accept");
    let events = common::drain(&mut rx_caller);
    assert!(matches!(
        &events[..],
        [ServerEvent::CallAccepted(answer)] if answer["sdp"] == "answer"
    ));
    assert_eq!(
        engine.calls.session(session.id).map(|s| s.state),
        Some(CallState::Active)
    );

    // ICE candidates flow both ways without state changes.
    engine
        .calls
        .candidate_from(caller, callee, json!({"candidate": "c1"}))
        .expect("caller candidate");
    engine
        .calls
        .candidate_from(callee, caller, json!({"candidate": "c2"}))
        .expect("callee candidate");
    assert!(matches!(
        &common::drain(&mut rx_callee)[..],
        [ServerEvent::IceCandidate(c)] if c["candidate"] == "c1"
    ));
    assert!(matches!(
        &common::drain(&mut rx_caller)[..],
        [ServerEvent::IceCandidate(c)] if c["candidate"] == "c2"
    ));

    // Hang up: callee is notified, session is gone.
    engine.calls.end_from(caller, callee).expect("end");
    assert_eq!(count_end_calls(&common::drain(&mut rx_callee)), 1);
    assert!(engine.calls.session(session.id).is_none());
    assert!(engine.calls.call_for(caller).is_none());
    assert!(engine.calls.call_for(callee).is_none());
    assert_eq!(engine.calls.active_count(), 0);
}

#[tokio::test]
async fn test_call_to_offline_callee() {
    let engine = common::engine();
    let caller = UserId::new();
    let offline = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    common::drain(&mut rx_caller);

    let session = engine
        .calls
        .initiate(caller, offline, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    assert_eq!(session.state, CallState::CalleeOffline);

    // Caller is told, nobody else hears anything, nothing is queryable.
    let events = common::drain(&mut rx_caller);
    assert!(matches!(
        &events[..],
        [ServerEvent::CallUserOffline { user_id }] if *user_id == offline
    ));
    assert!(engine.calls.session(session.id).is_none());
    assert_eq!(engine.calls.active_count(), 0);
}

#[tokio::test]
async fn test_trickle_ice_relayed_while_ringing() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he, mut rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Video, "alice", json!({"sdp": "offer"}))
        .expect("initiate");
    common::drain(&mut rx_callee);

    // Candidates may arrive before the callee answers, in either direction.
    engine
        .calls
        .candidate_from(caller, callee, json!({"candidate": "early-caller"}))
        .expect("early caller candidate");
    engine
        .calls
        .candidate_from(callee, caller, json!({"candidate": "early-callee"}))
        .expect("early callee candidate");
    assert!(matches!(
        &common::drain(&mut rx_callee)[..],
        [ServerEvent::IceCandidate(c)] if c["candidate"] == "early-caller"
    ));
    assert!(matches!(
        &common::drain(&mut rx_caller)[..],
        [ServerEvent::IceCandidate(c)] if c["candidate"] == "early-callee"
    ));

    // Relaying a candidate is not a state transition.
    assert_eq!(
        engine.calls.session(session.id).map(|s| s.state),
        Some(CallState::Ringing)
    );
}

#[tokio::test]
async fn test_caller_free_after_unreachable_callee() {
    let engine = common::engine();
    let caller = UserId::new();
    let offline = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he, _rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);

    let session = engine
        .calls
        .initiate(caller, offline, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    assert_eq!(session.state, CallState::CalleeOffline);

    // The failed attempt must not leave the caller marked busy.
    assert!(engine.calls.call_for(caller).is_none());
    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("second initiate");
    assert_eq!(session.state, CallState::Ringing);
}

#[tokio::test]
async fn test_reject_while_ringing() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he, mut rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    common::drain(&mut rx_callee);

    // endCall from the callee while ringing is a rejection.
    engine.calls.end_from(callee, caller).expect("reject");
    assert_eq!(count_end_calls(&common::drain(&mut rx_caller)), 1);
    assert!(engine.calls.call_for(caller).is_none());
    assert_eq!(engine.calls.active_count(), 0);
}

#[tokio::test]
async fn test_callee_disconnect_ends_call_once() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (he, mut rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Video, "alice", json!({}))
        .expect("initiate");

    engine.connections.unregister(&he.id);

    let events = common::drain(&mut rx_caller);
    assert_eq!(count_end_calls(&events), 1);
    assert!(engine.calls.session(session.id).is_none());
    assert!(engine.calls.call_for(caller).is_none());
}

#[tokio::test]
async fn test_second_tab_disconnect_keeps_call_alive() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he1, mut rx_callee) = engine.connections.register(Some(callee));
    let (he2, _rx_callee2) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");

    // The callee closes one tab but stays online: the call survives.
    engine.connections.unregister(&he2.id);
    assert_eq!(count_end_calls(&common::drain(&mut rx_caller)), 0);
    assert!(engine.calls.session(session.id).is_some());
}

#[tokio::test]
async fn test_third_party_cannot_touch_call() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let outsider = UserId::new();
    let (_hc, _rx_caller) = engine.connections.register(Some(caller));
    let (_he, _rx_callee) = engine.connections.register(Some(callee));
    let (_ho, _rx_outsider) = engine.connections.register(Some(outsider));

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");

    assert_eq!(
        engine.calls.accept_from(outsider, caller, json!({})),
        Err(CallError::InvalidCallReference)
    );
    assert_eq!(
        engine.calls.accept(session.id, outsider, json!({})),
        Err(CallError::InvalidCallReference)
    );
    assert_eq!(
        engine
            .calls
            .relay_ice_candidate(session.id, outsider, json!({})),
        Err(CallError::InvalidCallReference)
    );
    assert_eq!(
        engine.calls.end(session.id, outsider),
        Err(CallError::InvalidCallReference)
    );

    // The session is untouched.
    assert_eq!(
        engine.calls.session(session.id).map(|s| s.state),
        Some(CallState::Ringing)
    );
}

#[tokio::test]
async fn test_caller_busy_on_second_initiate() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let other = UserId::new();
    let (_hc, _rx_caller) = engine.connections.register(Some(caller));
    let (_he, _rx_callee) = engine.connections.register(Some(callee));
    let (_ho, _rx_other) = engine.connections.register(Some(other));

    engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");

    assert_eq!(
        engine
            .calls
            .initiate(caller, other, CallKind::Audio, "alice", json!({}))
            .unwrap_err(),
        CallError::Busy
    );
}

#[tokio::test]
async fn test_busy_callee_reported_as_offline() {
    let engine = common::engine();
    let caller = UserId::new();
    let callee = UserId::new();
    let third = UserId::new();
    let (_hc, _rx_caller) = engine.connections.register(Some(caller));
    let (_he, mut rx_callee) = engine.connections.register(Some(callee));
    let (_ht, mut rx_third) = engine.connections.register(Some(third));
    common::drain(&mut rx_callee);
    common::drain(&mut rx_third);

    engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    common::drain(&mut rx_callee);

    let session = engine
        .calls
        .initiate(third, callee, CallKind::Audio, "carol", json!({}))
        .expect("initiate to busy callee");
    assert_eq!(session.state, CallState::CalleeOffline);

    // The busy callee never hears a second offer.
    assert!(common::drain(&mut rx_callee).is_empty());
    assert!(matches!(
        &common::drain(&mut rx_third)[..],
        [ServerEvent::CallUserOffline { user_id }] if *user_id == callee
    ));
}

#[tokio::test]
async fn test_ringing_timeout_expires_call() {
    let config = RealtimeConfig {
        ringing_timeout_seconds: 0,
        ..RealtimeConfig::default()
    };
    let engine = common::engine_with(config);
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, mut rx_caller) = engine.connections.register(Some(caller));
    let (_he, mut rx_callee) = engine.connections.register(Some(callee));
    common::drain(&mut rx_caller);
    common::drain(&mut rx_callee);

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    common::drain(&mut rx_callee);

    assert_eq!(engine.calls.expire_ringing(), 1);
    assert_eq!(count_end_calls(&common::drain(&mut rx_caller)), 1);
    assert_eq!(count_end_calls(&common::drain(&mut rx_callee)), 1);
    assert!(engine.calls.session(session.id).is_none());
    assert!(engine.calls.call_for(caller).is_none());
    assert!(engine.calls.call_for(callee).is_none());
}

#[tokio::test]
async fn test_active_call_not_expired_by_sweeper() {
    let config = RealtimeConfig {
        ringing_timeout_seconds: 0,
        ..RealtimeConfig::default()
    };
    let engine = common::engine_with(config);
    let caller = UserId::new();
    let callee = UserId::new();
    let (_hc, _rx_caller) = engine.connections.register(Some(caller));
    let (_he, _rx_callee) = engine.connections.register(Some(callee));

    let session = engine
        .calls
        .initiate(caller, callee, CallKind::Audio, "alice", json!({}))
        .expect("initiate");
    engine
        .calls
        .accept_from(callee, caller, json!({}))
        .expect("accept");

    assert_eq!(engine.calls.expire_ringing(), 0);
    assert_eq!(
        engine.calls.session(session.id).map(|s| s.state),
        Some(CallState::Active)
    );
}
