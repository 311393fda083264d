//! End-to-end tests for `PinConnector` against a fake simulator on loopback.
//!
//! Each test binds a listener on an ephemeral port, connects a connector to
//! it and plays the simulator side by hand.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use gpio_client::application::pin_panel::PinPanel;
use gpio_client::infrastructure::network::{
    ConnectionState, ConnectorConfig, ConnectorError, PinConnector,
};
use gpio_core::{PinIndex, PinSnapshot};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Connects a connector to a fresh listener and returns both ends.
async fn connect_pair(sync_timeout: Duration) -> (PinConnector, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ConnectorConfig {
        simulator_addr: listener.local_addr().unwrap(),
        connect_timeout: Duration::from_secs(2),
        sync_timeout,
    };
    let connector = PinConnector::connect(config).await.unwrap();
    let (simulator, _) = listener.accept().await.unwrap();
    (connector, simulator)
}

/// Reads one sync request from the client side and answers with `reply`.
async fn answer_sync(simulator: &mut TcpStream, reply: &[u8]) {
    let mut request = [0u8; 1];
    simulator.read_exact(&mut request).await.unwrap();
    assert_eq!(request, [0x10], "client must send RequestSync");
    simulator.write_all(reply).await.unwrap();
    simulator.flush().await.unwrap();
}

/// Runs one sync while the fake simulator answers with `reply`.
async fn sync_with_reply(reply: &'static [u8]) -> PinSnapshot {
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        answer_sync(&mut simulator, reply).await;
        simulator
    });

    let snapshot = assert_ok!(connector.request_pin_sync().await);
    let _simulator = server.await.unwrap();
    snapshot
}

fn snapshot(entries: &[(u8, bool)]) -> PinSnapshot {
    entries.iter().copied().collect()
}

// ── Pin updates ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_writes_exactly_one_record_per_call() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;

    for pin in 0..26u8 {
        for asserted in [false, true] {
            // Act
            assert_ok!(connector.send_pin_state_change(pin, asserted).await);

            // Assert
            let mut record = [0u8; 3];
            simulator.read_exact(&mut record).await.unwrap();
            assert_eq!(record, [0x35, pin, asserted as u8]);
        }
    }
}

#[tokio::test]
async fn test_send_does_not_range_check_the_pin() {
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;

    assert_ok!(connector.send_pin_state_change(200, true).await);

    let mut record = [0u8; 3];
    simulator.read_exact(&mut record).await.unwrap();
    assert_eq!(record, [0x35, 200, 1]);
}

#[tokio::test]
async fn test_concurrent_sends_produce_well_formed_records() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let connector = Arc::new(connector);

    // Act
    let tasks: Vec<_> = (0..26u8)
        .map(|pin| {
            let connector = Arc::clone(&connector);
            tokio::spawn(async move { connector.send_pin_state_change(pin, pin % 2 == 0).await })
        })
        .collect();
    for task in tasks {
        assert_ok!(task.await.unwrap());
    }

    // Assert
    let mut bytes = vec![0u8; 26 * 3];
    simulator.read_exact(&mut bytes).await.unwrap();
    let mut seen = BTreeSet::new();
    for record in bytes.chunks(3) {
        assert_eq!(record[0], 0x35);
        assert_eq!(record[2], (record[1] % 2 == 0) as u8);
        seen.insert(record[1]);
    }
    assert_eq!(seen, (0..26u8).collect());
}

// ── Pin sync ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_decodes_reply_into_snapshot() {
    let snap = sync_with_reply(&[0x35, 1, 1, 0x35, 3, 0]).await;

    assert_eq!(snap, snapshot(&[(0, true), (2, false)]));
}

#[tokio::test]
async fn test_sync_full_board_reply() {
    // Arrange
    static FULL: [u8; 78] = {
        let mut reply = [0u8; 78];
        let mut i = 0;
        while i < 26 {
            reply[i * 3] = 0x35;
            reply[i * 3 + 1] = (i + 1) as u8;
            reply[i * 3 + 2] = (i % 2) as u8;
            i += 1;
        }
        reply
    };

    // Act
    let snap = sync_with_reply(&FULL).await;

    // Assert
    assert_eq!(snap.len(), 26);
    assert_eq!(snap.get(0), Some(false));
    assert_eq!(snap.get(1), Some(true));
    assert_eq!(snap.get(25), Some(true));
}

#[tokio::test]
async fn test_sync_drops_incomplete_trailing_record() {
    let snap = sync_with_reply(&[0x35, 1, 1, 0x35, 2]).await;

    assert_eq!(snap, snapshot(&[(0, true)]));
}

#[tokio::test]
async fn test_sync_skips_unknown_bytes() {
    let snap = sync_with_reply(&[0x00, 0x35, 1, 1]).await;

    assert_eq!(snap, snapshot(&[(0, true)]));
}

#[tokio::test]
async fn test_sync_ignores_wire_pin_zero() {
    let snap = sync_with_reply(&[0x35, 0, 1, 0x35, 2, 1]).await;

    assert_eq!(snap, snapshot(&[(1, true)]));
}

#[tokio::test]
async fn test_sync_treats_any_state_other_than_one_as_deasserted() {
    let snap = sync_with_reply(&[0x35, 4, 2]).await;

    assert_eq!(snap, snapshot(&[(3, false)]));
}

#[tokio::test]
async fn test_consecutive_syncs_are_independent() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        answer_sync(&mut simulator, &[0x35, 1, 1]).await;
        answer_sync(&mut simulator, &[0x35, 5, 0]).await;
        simulator
    });

    // Act
    let first = assert_ok!(connector.request_pin_sync().await);
    let second = assert_ok!(connector.request_pin_sync().await);

    // Assert
    assert_eq!(first, snapshot(&[(0, true)]));
    assert_eq!(second, snapshot(&[(4, false)]));
    let _simulator = server.await.unwrap();
}

#[tokio::test]
async fn test_reply_split_by_a_quiet_gap_is_truncated_at_the_gap() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        answer_sync(&mut simulator, &[0x35, 1, 1]).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        simulator.write_all(&[0x35, 2, 1]).await.unwrap();
        simulator
    });

    // Act
    let snap = assert_ok!(connector.request_pin_sync().await);

    // Assert
    assert_eq!(snap, snapshot(&[(0, true)]));
    let _simulator = server.await.unwrap();
}

#[tokio::test]
async fn test_sync_times_out_when_simulator_is_silent() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_millis(100)).await;

    // Act
    let result = connector.request_pin_sync().await;

    // Assert
    match result {
        Err(ConnectorError::Timeout(bound)) => assert_eq!(bound, Duration::from_millis(100)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(connector.state().await, ConnectionState::Closed);
    let mut request = [0u8; 1];
    simulator.read_exact(&mut request).await.unwrap();
    assert_eq!(request, [0x10]);
}

#[tokio::test]
async fn test_sync_can_be_cancelled_while_waiting() {
    // Arrange
    let (connector, _simulator) = connect_pair(Duration::from_secs(5)).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    // Act
    let result = connector.request_pin_sync_with_cancel(&cancel).await;

    // Assert
    assert!(matches!(result, Err(ConnectorError::Cancelled)));
    assert_eq!(connector.state().await, ConnectionState::Closed);
}

#[tokio::test]
async fn test_late_reply_after_timeout_never_reaches_a_later_sync() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_millis(100)).await;
    assert!(matches!(
        connector.request_pin_sync().await,
        Err(ConnectorError::Timeout(_))
    ));
    let mut request = [0u8; 1];
    simulator.read_exact(&mut request).await.unwrap();
    let _ = simulator.write_all(&[0x35, 7, 1]).await;

    // Act
    let second = assert_ok!(connector.request_pin_sync().await);
    let third = assert_ok!(connector.request_pin_sync().await);

    // Assert
    assert_eq!(second.get(6), None);
    assert_eq!(third.get(6), None);
    assert!(second.is_empty() && third.is_empty());
}

#[tokio::test]
async fn test_peer_close_before_reply_is_io_error_and_closes_connector() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        let mut request = [0u8; 1];
        simulator.read_exact(&mut request).await.unwrap();
        drop(simulator);
    });

    // Act
    let err = assert_err!(connector.request_pin_sync().await);
    server.await.unwrap();

    // Assert
    match err {
        ConnectorError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected I/O error, got {other:?}"),
    }
    assert_eq!(connector.state().await, ConnectionState::Closed);
    assert_ok!(connector.send_pin_state_change(3, true).await);
    assert!(assert_ok!(connector.request_pin_sync().await).is_empty());
}

#[tokio::test]
async fn test_peer_close_after_partial_reply_returns_received_pins() {
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        answer_sync(&mut simulator, &[0x35, 1, 1]).await;
        drop(simulator);
    });

    let snap = assert_ok!(connector.request_pin_sync().await);
    server.await.unwrap();

    assert_eq!(snap, snapshot(&[(0, true)]));
}

// ── Closed connector ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_operations_after_close_are_silent_noops() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    connector.close().await;

    // Act
    let snap = assert_ok!(connector.request_pin_sync().await);
    assert_ok!(connector.send_pin_state_change(1, true).await);

    // Assert
    assert!(snap.is_empty());
    let mut received = Vec::new();
    simulator.read_to_end(&mut received).await.unwrap();
    assert!(received.is_empty(), "nothing may be written after close");
}

// ── Panel over a real connector ───────────────────────────────────────────────

#[tokio::test]
async fn test_panel_syncs_and_toggles_over_tcp() {
    // Arrange
    let (connector, mut simulator) = connect_pair(Duration::from_secs(2)).await;
    let server = tokio::spawn(async move {
        answer_sync(&mut simulator, &[0x35, 1, 1, 0x35, 2, 0]).await;
        let mut record = [0u8; 3];
        simulator.read_exact(&mut record).await.unwrap();
        record
    });
    let mut panel = PinPanel::new();
    panel.attach(Arc::new(connector));

    // Act
    let applied = assert_ok!(panel.sync().await);
    let second = PinIndex::new(1).unwrap();
    let now = assert_ok!(panel.toggle(second).await);

    // Assert
    assert_eq!(applied, 2);
    assert!(now);
    assert!(panel.control(PinIndex::new(0).unwrap()).asserted);
    assert!(!panel.control(PinIndex::new(2).unwrap()).enabled);
    assert_eq!(server.await.unwrap(), [0x35, 2, 1]);
}
