mod common;

use std::sync::Arc;

use application::{CommandRouter, Outcome};
use common::RecordingTransport;
use domain::hal::MockHal;
use domain::{
    DimmerState, DomainError, EntityKind, EntityRegistry, RelayState, StateTable, TopicLayout,
};
use mockall::predicate::eq;

fn router() -> CommandRouter {
    CommandRouter::new(Arc::new(EntityRegistry::new(TopicLayout::default())))
}

#[tokio::test]
async fn test_dimmer_brightness_collapses_to_full_on() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();
    hal.expect_set_dimmer()
        .with(eq(3), eq(true), eq(100))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let outcome = router
        .handle_command(
            &mut hal,
            &transport,
            &mut table,
            "kc868-ap/dimmer/3/set",
            br#"{"state":"ON","brightness":40}"#,
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Applied {
            kind: EntityKind::Dimmer,
            index: 3,
            payload: r#"{"state":"ON","brightness":100}"#.to_string(),
        }
    );
    assert_eq!(table.dimmer(3).unwrap(), DimmerState::on());

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "kc868-ap/dimmer/3/state");
    assert_eq!(published[0].payload, r#"{"state":"ON","brightness":100}"#);
    assert!(published[0].retain);
}

#[tokio::test]
async fn test_dimmer_payload_policy() {
    let cases: &[(&str, bool)] = &[
        ("ON", true),
        (" on ", true),
        ("OFF", false),
        ("0", false),
        ("1", true),
        ("100", true),
        (r#"{"brightness":0}"#, false),
        (r#"{"brightness":55}"#, true),
        (r#"{"state":"OFF","brightness":80}"#, false),
        (r#""ON""#, true),
    ];

    for (payload, on) in cases {
        let router = router();
        let transport = RecordingTransport::connected();
        let mut table = StateTable::new();
        let expected = DimmerState::from_on(*on);
        let mut hal = MockHal::new();
        hal.expect_set_dimmer()
            .with(eq(0), eq(*on), eq(expected.brightness()))
            .times(1)
            .returning(|_, _, _| Ok(()));

        router
            .handle_command(
                &mut hal,
                &transport,
                &mut table,
                "kc868-ap/dimmer/0/set",
                payload.as_bytes(),
            )
            .await
            .unwrap_or_else(|e| panic!("{payload}: {e}"));

        assert_eq!(table.dimmer(0).unwrap(), expected, "{payload}");
        assert_eq!(
            transport.published_to("kc868-ap/dimmer/0/state"),
            vec![expected.to_payload()],
            "{payload}"
        );
    }
}

#[tokio::test]
async fn test_relay_off() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    table.set_relay(1, RelayState::new(true)).unwrap();
    let mut hal = MockHal::new();
    hal.expect_set_relay()
        .with(eq(1), eq(false))
        .times(1)
        .returning(|_, _| Ok(()));

    router
        .handle_command(&mut hal, &transport, &mut table, "kc868-ap/relay/1/set", b"OFF")
        .await
        .unwrap();

    assert_eq!(table.relay(1).unwrap(), RelayState::new(false));
    assert_eq!(transport.published_to("kc868-ap/relay/1/state"), vec!["OFF"]);
}

#[tokio::test]
async fn test_relay_publishes_only_when_hardware_succeeds() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();
    hal.expect_set_relay()
        .with(eq(2), eq(true))
        .times(1)
        .returning(|_, _| Err(DomainError::Hardware("GPIO 2 write failed".into())));

    let result = router
        .handle_command(&mut hal, &transport, &mut table, "kc868-ap/relay/2/set", b"ON")
        .await;

    assert!(matches!(result, Err(DomainError::Hardware(_))));
    assert_eq!(table.relay(2).unwrap(), RelayState::new(false));
    assert!(transport.published().is_empty());
}

#[tokio::test]
async fn test_dimmer_hardware_failure_leaves_state_untouched() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();
    hal.expect_set_dimmer()
        .times(1)
        .returning(|_, _, _| Err(DomainError::Hardware("I2C write at 0x40 failed".into())));

    let result = router
        .handle_command(&mut hal, &transport, &mut table, "kc868-ap/dimmer/10/set", b"ON")
        .await;

    assert!(matches!(result, Err(DomainError::Hardware(_))));
    assert_eq!(table.dimmer(10).unwrap(), DimmerState::off());
    assert!(transport.published().is_empty());
}

#[tokio::test]
async fn test_invalid_payloads_touch_nothing() {
    let garbage: &[&[u8]] = &[
        b"",
        b"   ",
        b"maybe",
        b"101",
        b"-1",
        b"12.5",
        b"[1,2]",
        b"null",
        br#"{"state":"DIM"}"#,
        br#"{"brightness":150}"#,
        br#"{}"#,
        &[0xFF, 0xFE],
    ];

    for payload in garbage {
        let router = router();
        let transport = RecordingTransport::connected();
        let mut table = StateTable::new();
        // Any HAL call would fail the test
        let mut hal = MockHal::new();

        let result = router
            .handle_command(&mut hal, &transport, &mut table, "kc868-ap/dimmer/5/set", payload)
            .await;

        assert!(
            matches!(result, Err(DomainError::InvalidPayload(_))),
            "{payload:?} gave {result:?}"
        );
        assert_eq!(table, StateTable::new());
        assert!(transport.published().is_empty());
    }
}

#[tokio::test]
async fn test_relay_rejects_levels() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();

    let result = router
        .handle_command(&mut hal, &transport, &mut table, "kc868-ap/relay/1/set", b"50")
        .await;

    assert!(matches!(result, Err(DomainError::InvalidPayload(_))));
    assert!(transport.published().is_empty());
}

#[tokio::test]
async fn test_unknown_topics_are_ignored() {
    let topics = [
        "kc868-ap/dimmer/16/set",
        "kc868-ap/relay/0/set",
        "kc868-ap/relay/3/set",
        "kc868-ap/input/1/set",
        "kc868-ap/dimmer/01/set",
        "kc868-ap/dimmer/1/state",
        "other/dimmer/1/set",
        "kc868-ap/fan/1/set",
    ];

    for topic in topics {
        let router = router();
        let transport = RecordingTransport::connected();
        let mut table = StateTable::new();
        let mut hal = MockHal::new();

        let outcome = router
            .handle_command(&mut hal, &transport, &mut table, topic, b"ON")
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Ignored, "{topic}");
        assert!(transport.published().is_empty());
    }
}

#[tokio::test]
async fn test_published_state_round_trips() {
    let router = router();
    let transport = RecordingTransport::connected();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();
    hal.expect_set_dimmer().returning(|_, _, _| Ok(()));
    hal.expect_set_relay().returning(|_, _| Ok(()));

    for (topic, state_topic, payload) in [
        ("kc868-ap/dimmer/7/set", "kc868-ap/dimmer/7/state", "42"),
        ("kc868-ap/dimmer/8/set", "kc868-ap/dimmer/8/state", "OFF"),
        ("kc868-ap/relay/2/set", "kc868-ap/relay/2/state", "ON"),
    ] {
        router
            .handle_command(&mut hal, &transport, &mut table, topic, payload.as_bytes())
            .await
            .unwrap();
        let first = transport.published_to(state_topic);
        let snapshot = table.clone();

        // Feeding the published state back as a command changes nothing
        router
            .handle_command(&mut hal, &transport, &mut table, topic, first[0].as_bytes())
            .await
            .unwrap();
        let second = transport.published_to(state_topic);

        assert_eq!(second[1], second[0], "{topic}");
        assert_eq!(table, snapshot, "{topic}");
    }
}

#[tokio::test]
async fn test_disconnected_transport_defers_publish() {
    let router = router();
    let transport = RecordingTransport::default();
    let mut table = StateTable::new();
    let mut hal = MockHal::new();
    hal.expect_set_relay()
        .with(eq(1), eq(true))
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = router
        .handle_command(&mut hal, &transport, &mut table, "kc868-ap/relay/1/set", b"ON")
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Applied { .. }));
    assert_eq!(table.relay(1).unwrap(), RelayState::new(true));
    assert!(transport.published().is_empty());
}
