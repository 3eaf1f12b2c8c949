//! Orchestrator Tests
//!
//! Dial, join and list against the in-memory control plane.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::test;

use rvoip_ari_client::testing::{EndpointBehavior, FakeControlPlane};
use rvoip_ari_client::{BridgeId, ChannelId};
use rvoip_bridge_core::{BridgeError, BridgeKind, BridgeOrchestrator, OrchestratorConfig};

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_app_name("bridge-test")
        .with_polling(Duration::from_millis(5), Duration::from_millis(100))
}

fn create_orchestrator(fake: &FakeControlPlane) -> BridgeOrchestrator {
    BridgeOrchestrator::new(Arc::new(fake.clone()), test_config())
}

fn addrs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
async fn test_dial_two_is_call() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);

    let outcome = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.kind, Some(BridgeKind::Call));
    assert_eq!(outcome.attached_addresses(), vec!["100", "101"]);
    assert_eq!(orchestrator.registry().get(&outcome.bridge_id), Some(BridgeKind::Call));

    let bridge = fake.bridge(&outcome.bridge_id).unwrap();
    assert_eq!(bridge.member_count(), 2);
    assert_eq!(bridge.bridge_type, "mixing");
    assert!(bridge.name.starts_with("Call_"));
    for leg in &outcome.attached {
        assert_eq!(leg.bridge_id, outcome.bridge_id);
        assert!(bridge.channels.contains(&leg.channel_id));
        assert_eq!(fake.endpoint_of(&leg.channel_id), Some(format!("PJSIP/{}", leg.address)));
    }
}

#[test]
async fn test_dial_three_is_conference() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);

    let outcome = orchestrator.dial(&addrs(&["100", "101", "102"])).await.unwrap();
    assert_eq!(outcome.kind, Some(BridgeKind::Conference));
    assert_eq!(outcome.attached.len(), 3);
    assert_eq!(
        orchestrator.registry().get(&outcome.bridge_id),
        Some(BridgeKind::Conference)
    );

    let bridge = fake.bridge(&outcome.bridge_id).unwrap();
    assert_eq!(bridge.member_count(), 3);
    assert!(bridge.name.starts_with("Conference_"));
}

#[test]
async fn test_dial_rejects_bad_input_before_control_plane() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);

    for input in [addrs(&[]), addrs(&["100"]), addrs(&["100", "100"]), addrs(&["100", ""])] {
        let err = orchestrator.dial(&input).await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedInput { .. }), "{input:?}: {err:?}");
    }
    assert_eq!(fake.counts().total(), 0);
    assert!(orchestrator.registry().is_empty());
}

#[test]
async fn test_dial_bridge_creation_failure() {
    let fake = FakeControlPlane::new();
    fake.fail_operation("create_bridge");
    let orchestrator = create_orchestrator(&fake);

    let err = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap_err();
    assert!(matches!(err, BridgeError::BridgeCreationFailed { .. }));
    assert_eq!(fake.counts().create_channel, 0);
    assert!(orchestrator.registry().is_empty());
}

#[test]
async fn test_dial_partial_failure_is_aggregated() {
    let fake = FakeControlPlane::new();
    fake.set_behavior("PJSIP/101", EndpointBehavior::RejectOrigination);
    fake.set_behavior("PJSIP/102", EndpointBehavior::NeverAnswer);
    fake.set_behavior("PJSIP/103", EndpointBehavior::HangUpAfterPolls(2));
    fake.set_behavior("PJSIP/104", EndpointBehavior::AnswerAfterPolls(4));
    let orchestrator = create_orchestrator(&fake);

    let input = addrs(&["100", "101", "102", "103", "104"]);
    let outcome = orchestrator.dial(&input).await.unwrap();

    assert_eq!(outcome.attached.len() + outcome.failed.len(), input.len());
    assert_eq!(outcome.attached_addresses(), vec!["100", "104"]);
    assert_eq!(outcome.failed_addresses(), vec!["101", "102", "103"]);

    assert!(matches!(outcome.failed[0].error, BridgeError::ChannelCreationFailed { .. }));
    assert!(matches!(outcome.failed[1].error, BridgeError::AnswerTimeout { .. }));
    assert!(matches!(outcome.failed[2].error, BridgeError::ChannelTerminated { .. }));
    for failure in &outcome.failed {
        assert_eq!(failure.error.address(), Some(failure.address.as_str()));
    }

    // Each surviving leg is attached exactly once, failed legs never
    let bridge = fake.bridge(&outcome.bridge_id).unwrap();
    let attached: Vec<ChannelId> = outcome.attached.iter().map(|l| l.channel_id.clone()).collect();
    assert_eq!(bridge.member_count(), 2);
    for channel_id in &attached {
        assert_eq!(bridge.channels.iter().filter(|id| *id == channel_id).count(), 1);
    }
    assert_eq!(fake.counts().add_channel_to_bridge, 2);

    // Failures are not rolled back and the bridge is still tagged
    assert!(fake.hung_up().is_empty());
    assert_eq!(orchestrator.registry().get(&outcome.bridge_id), Some(BridgeKind::Conference));
}

#[test]
async fn test_dial_attach_failure() {
    let fake = FakeControlPlane::new();
    fake.fail_operation("add_channel_to_bridge");
    let orchestrator = create_orchestrator(&fake);

    let outcome = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();
    assert!(outcome.attached.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    for failure in &outcome.failed {
        match &failure.error {
            BridgeError::ChannelAttachFailed { bridge_id, .. } => {
                assert_eq!(bridge_id, &outcome.bridge_id)
            }
            other => panic!("expected attach failure, got {other:?}"),
        }
    }
    assert_eq!(orchestrator.registry().get(&outcome.bridge_id), Some(BridgeKind::Call));
}

#[test]
async fn test_join_adds_participants_and_promotes() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);

    let call = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();
    let polls_before = fake.counts().get_channel;

    let outcome = orchestrator.join(call.bridge_id.as_str(), &addrs(&["103"])).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.kind, Some(BridgeKind::Conference));
    assert_eq!(fake.bridge(&call.bridge_id).unwrap().member_count(), 3);
    assert_eq!(orchestrator.registry().get(&call.bridge_id), Some(BridgeKind::Conference));

    // Joined legs are attached without waiting for answer
    assert_eq!(fake.counts().get_channel, polls_before);
    assert_eq!(fake.originations().last().unwrap().app_args, None);
}

#[test]
async fn test_join_untagged_bridge() {
    let fake = FakeControlPlane::new();
    let external = fake.insert_bridge("external-bridge", vec![ChannelId::from("1.1")]);
    let orchestrator = create_orchestrator(&fake);

    let outcome = orchestrator.join(external.as_str(), &addrs(&["105", "106"])).await.unwrap();
    assert_eq!(outcome.attached_addresses(), vec!["105", "106"]);
    assert_eq!(orchestrator.registry().get(&external), Some(BridgeKind::Conference));
}

#[test]
async fn test_join_without_success_leaves_tag_alone() {
    let fake = FakeControlPlane::new();
    fake.set_behavior("PJSIP/105", EndpointBehavior::RejectOrigination);
    let external = fake.insert_bridge("external-bridge", vec![]);
    let orchestrator = create_orchestrator(&fake);

    let outcome = orchestrator.join(external.as_str(), &addrs(&["105"])).await.unwrap();
    assert!(outcome.attached.is_empty());
    assert_eq!(outcome.kind, None);
    assert!(orchestrator.registry().is_empty());
}

#[test]
async fn test_join_awaiting_answer() {
    let fake = FakeControlPlane::new();
    fake.set_behavior("PJSIP/103", EndpointBehavior::NeverAnswer);
    let bridge = fake.insert_bridge("conf-bridge", vec![]);
    let mut config = test_config();
    config.join_awaits_answer = true;
    let orchestrator = BridgeOrchestrator::new(Arc::new(fake.clone()), config);

    let outcome = orchestrator.join(bridge.as_str(), &addrs(&["103", "104"])).await.unwrap();
    assert_eq!(outcome.attached_addresses(), vec!["104"]);
    assert!(matches!(outcome.failed[0].error, BridgeError::AnswerTimeout { .. }));
    assert!(fake.counts().get_channel > 0);
}

#[test]
async fn test_join_errors() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);

    let err = orchestrator.join("1700000000.5", &addrs(&["103"])).await.unwrap_err();
    assert!(matches!(err, BridgeError::MalformedInput { .. }));
    assert_eq!(fake.counts().total(), 0);

    let err = orchestrator.join("bridge-9", &addrs(&[])).await.unwrap_err();
    assert!(matches!(err, BridgeError::MalformedInput { .. }));

    let err = orchestrator.join("bridge-9", &addrs(&["103"])).await.unwrap_err();
    match err {
        BridgeError::BridgeNotFound { bridge_id } => assert_eq!(bridge_id, BridgeId::from("bridge-9")),
        other => panic!("expected bridge not found, got {other:?}"),
    }
    assert_eq!(fake.counts().create_channel, 0);

    fake.fail_operation("get_bridge");
    let err = orchestrator.join("bridge-9", &addrs(&["103"])).await.unwrap_err();
    assert!(matches!(err, BridgeError::ControlPlaneUnavailable(_)));
}

#[test]
async fn test_list_prunes_empty_bridges() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    let empty = fake.insert_bridge("abandoned", vec![]);
    let external = fake.insert_bridge("external", vec![ChannelId::from("1.1")]);
    let call = orchestrator.dial(&addrs(&["100", "101"])).await.unwrap();

    let first = orchestrator.list().await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(fake.bridge(&empty).is_none());

    let summary = first.iter().find(|s| s.bridge_id == call.bridge_id).unwrap();
    assert_eq!(summary.member_count, 2);
    assert_eq!(summary.kind, Some(BridgeKind::Call));
    let summary = first.iter().find(|s| s.bridge_id == external).unwrap();
    assert_eq!(summary.member_count, 1);
    assert_eq!(summary.kind, None);

    let second = orchestrator.list().await.unwrap();
    assert_eq!(first, second);
}

#[test]
async fn test_list_survives_failed_prune() {
    let fake = FakeControlPlane::new();
    let orchestrator = create_orchestrator(&fake);
    fake.insert_bridge("abandoned", vec![]);
    fake.fail_operation("destroy_bridge");

    assert!(orchestrator.list().await.unwrap().is_empty());

    fake.fail_operation("list_bridges");
    assert!(matches!(
        orchestrator.list().await,
        Err(BridgeError::ControlPlaneUnavailable(_))
    ));
}

#[test]
async fn test_dial_attaches_early_legs_and_tags_after_join() {
    let fake = FakeControlPlane::new();
    fake.set_behavior("PJSIP/101", EndpointBehavior::AnswerAfterPolls(30));
    let config = test_config().with_polling(Duration::from_millis(5), Duration::from_secs(2));
    let orchestrator = Arc::new(BridgeOrchestrator::new(Arc::new(fake.clone()), config));

    let dialing = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.dial(&addrs(&["100", "101"])).await }
    });

    // 100 answers on its second poll and is bridged while 101 still rings
    let mut bridge = None;
    for _ in 0..100 {
        if let Some(b) = fake.bridges().into_iter().find(|b| b.member_count() == 1) {
            bridge = Some(b);
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let bridge = bridge.expect("first leg was not attached before the second answered");
    assert!(!dialing.is_finished());
    assert_eq!(orchestrator.registry().get(&bridge.id), None);

    let outcome = dialing.await.unwrap().unwrap();
    assert_eq!(outcome.bridge_id, bridge.id);
    assert_eq!(outcome.attached_addresses(), vec!["100", "101"]);
    assert_eq!(fake.bridge(&bridge.id).unwrap().member_count(), 2);
    assert_eq!(orchestrator.registry().get(&bridge.id), Some(BridgeKind::Call));
}
