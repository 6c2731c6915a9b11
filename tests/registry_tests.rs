use std::sync::Arc;

use anyhow::Result;
use notification_hub::hub::{
    connection::ConnectionId,
    registry::{ConnectOutcome, ConnectionRegistry},
};

use crate::support::{recording_handle, user};

/// Test: Registering the same handle twice keeps a single entry
#[tokio::test]
async fn test_on_connect_is_idempotent() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    let (c1, _sink) = recording_handle("c1");

    assert_eq!(registry.on_connect(u1.clone(), c1.clone()), ConnectOutcome::Registered);
    assert_eq!(
        registry.on_connect(u1.clone(), c1.clone()),
        ConnectOutcome::AlreadyRegistered
    );

    assert_eq!(registry.connection_ids_for(&u1), vec![ConnectionId::from("c1")]);
    assert_eq!(registry.connection_count(), 1);

    Ok(())
}

/// Test: A user can hold several connections at once
#[tokio::test]
async fn test_multiple_devices_per_user() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    let (c1, _s1) = recording_handle("c1");
    let (c2, _s2) = recording_handle("c2");

    registry.on_connect(u1.clone(), c1);
    registry.on_connect(u1.clone(), c2);

    assert_eq!(
        registry.connection_ids_for(&u1),
        vec![ConnectionId::from("c1"), ConnectionId::from("c2")]
    );

    let removed = registry.on_disconnect(&ConnectionId::from("c1"));
    assert_eq!(removed.map(|entry| entry.user_id), Some(u1.clone()));
    assert_eq!(registry.connection_ids_for(&u1), vec![ConnectionId::from("c2")]);
    assert!(registry.is_online(&u1));

    Ok(())
}

/// Test: Disconnecting an unknown handle is a silent no-op
#[tokio::test]
async fn test_disconnect_unknown_handle() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    let (c1, _sink) = recording_handle("c1");
    registry.on_connect(u1.clone(), c1);

    assert!(registry.on_disconnect(&ConnectionId::from("ghost")).is_none());
    assert!(registry.on_disconnect(&ConnectionId::from("c1")).is_some());
    assert!(registry.on_disconnect(&ConnectionId::from("c1")).is_none());

    assert!(!registry.is_online(&u1));
    assert_eq!(registry.connection_count(), 0);
    assert_eq!(registry.online_user_count(), 0);

    Ok(())
}

/// Test: Other users are untouched by a stray disconnect
#[tokio::test]
async fn test_disconnect_does_not_affect_other_users() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let (a1, _sa) = recording_handle("a1");
    let (b1, _sb) = recording_handle("b1");
    registry.on_connect(user("alice"), a1);
    registry.on_connect(user("bob"), b1);

    registry.on_disconnect(&ConnectionId::from("unknown"));
    registry.on_disconnect(&ConnectionId::from("a1"));

    assert!(registry.connections_for(&user("alice")).is_empty());
    assert_eq!(
        registry.connection_ids_for(&user("bob")),
        vec![ConnectionId::from("b1")]
    );

    Ok(())
}

/// Test: A handle can never belong to two users
#[tokio::test]
async fn test_handle_owned_by_one_user() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let (shared, _sink) = recording_handle("shared");

    registry.on_connect(user("alice"), shared.clone());
    assert_eq!(
        registry.on_connect(user("mallory"), shared),
        ConnectOutcome::OwnedByOtherUser
    );

    assert!(registry.connections_for(&user("mallory")).is_empty());
    assert_eq!(
        registry.owner_of(&ConnectionId::from("shared")),
        Some(user("alice"))
    );

    Ok(())
}

/// Test: Readers receive snapshots rather than live views
#[tokio::test]
async fn test_connections_for_returns_snapshot() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    let (c1, _s1) = recording_handle("c1");
    let (c2, _s2) = recording_handle("c2");
    registry.on_connect(u1.clone(), c1);
    registry.on_connect(u1.clone(), c2);

    let snapshot = registry.connections_for(&u1);
    registry.on_disconnect(&ConnectionId::from("c1"));

    assert_eq!(snapshot.len(), 2);
    assert_eq!(registry.connections_for(&u1).len(), 1);

    Ok(())
}

/// Test: Offline and unknown users look the same
#[tokio::test]
async fn test_unknown_user_has_no_connections() -> Result<()> {
    let registry = ConnectionRegistry::new();
    assert!(registry.connections_for(&user("nobody")).is_empty());
    assert!(!registry.is_online(&user("nobody")));

    Ok(())
}

/// Test: Eviction drops every connection of a single user
#[tokio::test]
async fn test_evict_user() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    for id in ["c1", "c2", "c3"] {
        let (handle, _sink) = recording_handle(id);
        registry.on_connect(u1.clone(), handle);
    }
    let (other, _sink) = recording_handle("o1");
    registry.on_connect(user("u2"), other);

    let evicted = registry.evict_user(&u1);

    assert_eq!(evicted.len(), 3);
    assert!(!registry.is_online(&u1));
    assert!(registry.owner_of(&ConnectionId::from("c2")).is_none());
    assert_eq!(registry.connection_count(), 1);
    assert!(registry.evict_user(&u1).is_empty());

    Ok(())
}

/// Test: Removing a connection signals its transport to close, siblings stay open
#[tokio::test]
async fn test_removal_requests_transport_close() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let u1 = user("u1");
    let (c1, _s1) = recording_handle("c1");
    let (c2, _s2) = recording_handle("c2");

    registry.on_connect(u1.clone(), c1.clone());
    registry.on_connect(u1.clone(), c2.clone());
    let closing = c1.close_signal();

    registry.on_disconnect(&ConnectionId::from("c1"));

    assert!(c1.close_requested());
    assert!(!c2.close_requested());
    tokio::time::timeout(tokio::time::Duration::from_secs(1), closing.cancelled()).await?;

    registry.evict_user(&u1);
    assert!(c2.close_requested());

    Ok(())
}

/// Test: Disconnecting an unknown id never signals anything
#[tokio::test]
async fn test_unknown_disconnect_leaves_handles_untouched() -> Result<()> {
    let registry = ConnectionRegistry::new();
    let (c1, _s1) = recording_handle("c1");
    registry.on_connect(user("u1"), c1.clone());

    assert!(registry.on_disconnect(&ConnectionId::from("c9")).is_none());
    assert!(!c1.close_requested());

    Ok(())
}

/// Test: Concurrent connects and disconnects leave both indices consistent
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connect_disconnect() -> Result<()> {
    let registry = Arc::new(ConnectionRegistry::new());

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let user_id = user(&format!("u{}", i % 10));
                let id = format!("c{}", i);
                let (handle, _sink) = recording_handle(&id);
                registry.on_connect(user_id, handle);

                if i % 2 == 0 {
                    registry.on_disconnect(&ConnectionId::from(id.as_str()));
                }
            })
        })
        .collect();

    for task in tasks {
        task.await?;
    }

    assert_eq!(registry.connection_count(), 100);
    assert_eq!(registry.online_user_count(), 5);

    for i in (1..10).step_by(2) {
        assert_eq!(registry.connections_for(&user(&format!("u{}", i))).len(), 20);
    }

    Ok(())
}
