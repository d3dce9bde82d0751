//! End-to-end relay tests over live WebSocket connections

use anyhow::Result;
use homelink_core::{ClientEvent, MessageId, ServerEvent, UserId};
use integration_tests::fixtures::{join, message};
use integration_tests::helpers::TestRelay;
use std::time::Duration;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let relay = TestRelay::start().await?;

    let body = reqwest::get(format!("{}/health", relay.base_url()))
        .await?
        .text()
        .await?;

    assert_eq!(body, "OK");
    Ok(())
}

#[tokio::test]
async fn join_returns_snapshot_and_broadcasts_delta() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.client().await?;
    alice.send(join("alice")).await?;
    match alice.recv().await? {
        ServerEvent::PresenceSnapshot { online_user_ids } => {
            assert_eq!(online_user_ids, vec![UserId::new("alice")]);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    let mut bob = relay.client().await?;
    bob.send(join("bob")).await?;
    match bob.recv().await? {
        ServerEvent::PresenceSnapshot {
            mut online_user_ids,
        } => {
            online_user_ids.sort();
            assert_eq!(
                online_user_ids,
                vec![UserId::new("alice"), UserId::new("bob")]
            );
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    // Alice only sees the incremental delta
    match alice.recv().await? {
        ServerEvent::PresenceDelta { user_id, online } => {
            assert_eq!(user_id, UserId::new("bob"));
            assert!(online);
        }
        other => panic!("expected delta, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn message_is_delivered_and_echoed() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.join("alice").await?;
    let mut bob = relay.join("bob").await?;
    let _ = alice.recv().await?; // bob's online delta

    alice.send(message("alice", "bob", "hello")).await?;

    match bob.recv().await? {
        ServerEvent::MessageReceive(payload) => {
            assert_eq!(payload.from, UserId::new("alice"));
            assert_eq!(payload.to, UserId::new("bob"));
            assert_eq!(payload.body, "hello");
        }
        other => panic!("expected message receive, got {other:?}"),
    }

    match alice.recv().await? {
        ServerEvent::MessageSent(payload) => {
            assert_eq!(payload.body, "hello");
        }
        other => panic!("expected message sent echo, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn offline_recipient_send_still_echoes() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.join("alice").await?;
    alice.send(message("alice", "nobody", "anyone there?")).await?;

    match alice.recv().await? {
        ServerEvent::MessageSent(payload) => {
            assert_eq!(payload.to, UserId::new("nobody"));
            assert_eq!(payload.body, "anyone there?");
        }
        other => panic!("expected message sent echo, got {other:?}"),
    }

    // The connection is still perfectly healthy afterwards
    alice.send(message("alice", "nobody", "still here")).await?;
    match alice.recv().await? {
        ServerEvent::MessageSent(payload) => assert_eq!(payload.body, "still here"),
        other => panic!("expected message sent echo, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn messages_arrive_in_send_order() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.join("alice").await?;
    let mut bob = relay.join("bob").await?;

    alice.send(message("alice", "bob", "m1")).await?;
    alice.send(message("alice", "bob", "m2")).await?;

    let mut bodies = Vec::new();
    for _ in 0..2 {
        match bob.recv().await? {
            ServerEvent::MessageReceive(payload) => bodies.push(payload.body),
            other => panic!("expected message receive, got {other:?}"),
        }
    }
    assert_eq!(bodies, vec!["m1", "m2"]);

    Ok(())
}

#[tokio::test]
async fn disconnect_broadcasts_offline_delta() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.join("alice").await?;
    let bob = relay.join("bob").await?;
    let _ = alice.recv().await?; // bob's online delta

    bob.close().await?;

    match alice.recv().await? {
        ServerEvent::PresenceDelta { user_id, online } => {
            assert_eq!(user_id, UserId::new("bob"));
            assert!(!online);
        }
        other => panic!("expected offline delta, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn superseded_connection_does_not_mark_user_offline() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut observer = relay.join("observer").await?;

    // Alice opens a second tab; last connection wins
    let first = relay.join("alice").await?;
    let _ = observer.recv().await?; // alice online
    let second = relay.join("alice").await?;
    let _ = observer.recv().await?; // alice online again (re-register)

    // The superseded tab closing must not take alice offline
    first.close().await?;
    observer.expect_silence(Duration::from_millis(300)).await?;

    // The current tab closing does
    second.close().await?;
    match observer.recv().await? {
        ServerEvent::PresenceDelta { user_id, online } => {
            assert_eq!(user_id, UserId::new("alice"));
            assert!(!online);
        }
        other => panic!("expected offline delta, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn typing_and_read_receipts_pass_through() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut alice = relay.join("alice").await?;
    let mut bob = relay.join("bob").await?;
    let _ = alice.recv().await?; // bob's online delta

    alice
        .send(ClientEvent::TypingStart {
            from: UserId::new("alice"),
            to: UserId::new("bob"),
        })
        .await?;
    alice
        .send(ClientEvent::TypingStop {
            from: UserId::new("alice"),
            to: UserId::new("bob"),
        })
        .await?;

    assert_eq!(
        bob.recv().await?,
        ServerEvent::Typing {
            from: UserId::new("alice"),
            typing: true
        }
    );
    assert_eq!(
        bob.recv().await?,
        ServerEvent::Typing {
            from: UserId::new("alice"),
            typing: false
        }
    );

    // Bob confirms reading message m1; the receipt lands at alice
    bob.send(ClientEvent::ReadReceipt {
        from: UserId::new("bob"),
        to: UserId::new("alice"),
        message_id: MessageId::new("m1"),
    })
    .await?;

    assert_eq!(
        alice.recv().await?,
        ServerEvent::ReadReceipt {
            from: UserId::new("bob"),
            message_id: MessageId::new("m1"),
        }
    );

    Ok(())
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut client = relay.join("alice").await?;
    client.send_raw("this is not an event").await?;

    assert!(client.recv().await.is_err());
    Ok(())
}
