//! Event Reactor Tests
//!
//! Cleanup policy driven by channel lifecycle events, and the end-to-end
//! dial / join / hang-up scenario through the command surface.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::test;
use tokio::time::{sleep, timeout};

use rvoip_ari_client::testing::{EndpointBehavior, FakeControlPlane};
use rvoip_ari_client::{BridgeId, ControlPlane, LifecycleEvent, LifecycleEvents};
use rvoip_bridge_core::{
    BridgeError, BridgeKind, BridgeOrchestrator, CommandSurface, EventReactor, OrchestratorConfig,
};

fn create_orchestrator(fake: &FakeControlPlane) -> Arc<BridgeOrchestrator> {
    let config = OrchestratorConfig::default()
        .with_polling(Duration::from_millis(5), Duration::from_millis(100));
    Arc::new(BridgeOrchestrator::new(Arc::new(fake.clone()), config))
}

fn addrs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Next `ChannelDestroyed` on the stream, skipping anything else
async fn next_channel_destroyed(events: &mut LifecycleEvents) -> LifecycleEvent {
    loop {
        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if event.is_channel_destroyed() {
            return event;
        }
    }
}

/// Wait until the fake no longer knows the bridge
async fn wait_for_bridge_gone(fake: &FakeControlPlane, bridge_id: &BridgeId) {
    for _ in 0..100 {
        if fake.bridge(bridge_id).is_none() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("bridge {bridge_id} was not torn down");
}

#[test]
async fn test_call_torn_down_when_one_leg_hangs_up() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let reactor = EventReactor::new(orchestrator.control(), orchestrator.registry());
    let mut events = fake.subscribe_events().await.unwrap();

    let call = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();
    let first = call.attached[0].channel_id.clone();
    let second = call.attached[1].channel_id.clone();

    assert!(fake.remote_hangup(&first));
    let event = next_channel_destroyed(&mut events).await;
    let report = reactor.handle_event(&event).await.unwrap();

    assert_eq!(report.hung_up_channels, vec![second.clone()]);
    assert_eq!(report.destroyed_bridges, vec![call.bridge_id.clone()]);
    assert!(fake.bridge(&call.bridge_id).is_none());
    assert!(!fake.channel_exists(&second));
}

#[test]
async fn test_conference_survives_one_leg_hanging_up() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let reactor = EventReactor::new(orchestrator.control(), orchestrator.registry());
    let mut events = fake.subscribe_events().await.unwrap();

    let conference = orchestrator.dial(&addrs(&["100", "101", "102"])).await.unwrap();
    fake.remote_hangup(&conference.attached[0].channel_id);
    let event = next_channel_destroyed(&mut events).await;
    let report = reactor.handle_event(&event).await.unwrap();

    assert!(report.is_empty());
    let bridge = fake.bridge(&conference.bridge_id).unwrap();
    assert_eq!(bridge.member_count(), 2);
    for leg in &conference.attached[1..] {
        assert!(fake.channel_exists(&leg.channel_id));
    }
    assert!(fake.hung_up().is_empty());
}

#[test]
async fn test_conference_down_to_one_member_is_kept() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let reactor = EventReactor::new(orchestrator.control(), orchestrator.registry());

    let conference = orchestrator.dial(&addrs(&["100", "101", "102"])).await.unwrap();
    fake.remote_hangup(&conference.attached[0].channel_id);
    fake.remote_hangup(&conference.attached[1].channel_id);

    let report = reactor.sweep().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(fake.bridge(&conference.bridge_id).unwrap().member_count(), 1);

    fake.remote_hangup(&conference.attached[2].channel_id);
    let report = reactor.sweep().await.unwrap();
    assert_eq!(report.destroyed_bridges, vec![conference.bridge_id.clone()]);
}

#[test]
async fn test_spawned_reactor_stops_when_stream_ends() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = EventReactor::new(orchestrator.control(), orchestrator.registry()).spawn(rx);

    let bridge = fake.insert_bridge("leftover", vec![]);
    tx.send(LifecycleEvent::ChannelDestroyed {
        channel_id: "1.1".into(),
        cause: Some(16),
        cause_txt: Some("Normal Clearing".to_string()),
    })
    .unwrap();
    wait_for_bridge_gone(&fake, &bridge).await;

    assert!(!handle.is_finished());
    drop(tx);
    for _ in 0..100 {
        if handle.is_finished() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_finished());
    timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}

#[test]
async fn test_bridge_swept_while_dialing() {
    let fake = FakeControlPlane::new();
    fake.set_behavior("PJSIP/100", EndpointBehavior::AnswerAfterPolls(10));
    fake.set_behavior("PJSIP/101", EndpointBehavior::HangUpAfterPolls(1));
    let orchestrator = create_orchestrator(&fake);
    let events = fake.subscribe_events().await.unwrap();
    let reactor = EventReactor::new(orchestrator.control(), orchestrator.registry()).spawn(events);

    // 101 hangs up while the bridge is still empty, so the sweep removes it
    let outcome = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();
    assert!(outcome.attached.is_empty());
    assert!(fake.bridge(&outcome.bridge_id).is_none());

    match &outcome.failed[0].error {
        BridgeError::ChannelAttachFailed { channel_id, reason, .. } => {
            assert!(reason.contains("no longer exists"), "{reason}");
            // The answered leg is left up outside any bridge
            assert!(fake.channel_exists(channel_id));
        }
        other => panic!("expected attach failure, got {other:?}"),
    }
    assert!(matches!(outcome.failed[1].error, BridgeError::ChannelTerminated { .. }));

    let message = CommandSurface::new(orchestrator.clone())
        .handle_line("list")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message, "No active bridges");

    reactor.abort();
}

#[test]
async fn test_full_scenario() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let surface = CommandSurface::new(orchestrator.clone());
    let registry = orchestrator.registry();

    let events = fake.subscribe_events().await.unwrap();
    let reactor = EventReactor::new(orchestrator.control(), registry.clone()).spawn(events);

    // Two-party call
    let message = surface.handle_line("dial 100 101").await.unwrap().unwrap();
    assert!(message.contains("100"), "{message}");
    assert!(message.contains("101"), "{message}");
    let call = fake
        .bridges()
        .into_iter()
        .find(|b| registry.get(&b.id) == Some(BridgeKind::Call))
        .unwrap();
    assert_eq!(call.member_count(), 2);

    // Three-party conference
    let message = surface.handle_line("dial 100 101 102").await.unwrap().unwrap();
    assert!(message.contains("conference"), "{message}");
    let conference = fake
        .bridges()
        .into_iter()
        .find(|b| registry.get(&b.id) == Some(BridgeKind::Conference))
        .unwrap();
    assert_eq!(conference.member_count(), 3);

    // A fourth participant joins the conference
    let message = surface
        .handle_line(&format!("join {} 103", conference.id))
        .await
        .unwrap()
        .unwrap();
    assert!(message.contains("103"), "{message}");
    assert_eq!(fake.bridge(&conference.id).unwrap().member_count(), 4);
    assert_eq!(registry.get(&conference.id), Some(BridgeKind::Conference));

    // One side of the call hangs up: the call is torn down
    fake.remote_hangup(&call.channels[0]);
    wait_for_bridge_gone(&fake, &call.id).await;
    assert!(!fake.channel_exists(&call.channels[1]));

    // The conference is untouched
    let remaining = fake.bridge(&conference.id).unwrap();
    assert_eq!(remaining.member_count(), 4);
    for channel_id in &remaining.channels {
        assert!(fake.channel_exists(channel_id));
    }

    let listing = surface.handle_line("list").await.unwrap().unwrap();
    assert!(listing.contains(conference.id.as_str()), "{listing}");
    assert!(!listing.contains(call.id.as_str()), "{listing}");

    reactor.abort();
}
