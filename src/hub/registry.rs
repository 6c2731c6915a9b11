use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::hub::connection::{ConnectionEntry, ConnectionHandle, ConnectionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Registered,
    AlreadyRegistered,
    OwnedByOtherUser,
}

#[derive(Default)]
struct Index {
    by_user: HashMap<UserId, Arc<[ConnectionEntry]>>,
    by_connection: HashMap<ConnectionId, UserId>,
}

/// Live mapping from user identity to that user's open push channels.
///
/// Each user's entry set is an immutable slice swapped out wholesale on
/// every write, so readers only ever observe complete sets. Both indices
/// sit behind one lock and are updated together.
#[derive(Default)]
pub struct ConnectionRegistry {
    index: RwLock<Index>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&self, user_id: UserId, handle: ConnectionHandle) -> ConnectOutcome {
        let mut index = self.index.write();

        if let Some(owner) = index.by_connection.get(&handle.id) {
            if owner == &user_id {
                debug!(user_id = %user_id, connection_id = %handle.id, "Connection already registered");
                return ConnectOutcome::AlreadyRegistered;
            }

            warn!(
                user_id = %user_id,
                owner = %owner,
                connection_id = %handle.id,
                "Connection handle belongs to another user, refusing registration"
            );
            return ConnectOutcome::OwnedByOtherUser;
        }

        let connection_id = handle.id.clone();
        let mut entries = index
            .by_user
            .get(&user_id)
            .map(|current| current.to_vec())
            .unwrap_or_default();
        entries.push(ConnectionEntry::new(user_id.clone(), handle));
        let total = entries.len();

        index.by_user.insert(user_id.clone(), entries.into());
        index.by_connection.insert(connection_id.clone(), user_id.clone());

        info!(
            user_id = %user_id,
            connection_id = %connection_id,
            user_connections = total,
            "Connection registered"
        );

        ConnectOutcome::Registered
    }

    /// Removes exactly one connection and signals its transport to close.
    /// Unknown ids are ignored.
    pub fn on_disconnect(&self, connection_id: &ConnectionId) -> Option<ConnectionEntry> {
        let mut index = self.index.write();

        let Some(user_id) = index.by_connection.remove(connection_id) else {
            debug!(connection_id = %connection_id, "Disconnect for unknown connection ignored");
            return None;
        };

        let current = index.by_user.remove(&user_id)?;
        let (removed, remaining): (Vec<ConnectionEntry>, Vec<ConnectionEntry>) = current
            .iter()
            .cloned()
            .partition(|entry| entry.connection_id() == connection_id);

        let left = remaining.len();
        if !remaining.is_empty() {
            index.by_user.insert(user_id.clone(), remaining.into());
        }

        info!(
            user_id = %user_id,
            connection_id = %connection_id,
            user_connections = left,
            "Connection removed"
        );

        let removed = removed.into_iter().next();
        if let Some(entry) = &removed {
            entry.handle.request_close();
        }

        removed
    }

    /// Drops every connection a user holds.
    pub fn evict_user(&self, user_id: &UserId) -> Vec<ConnectionEntry> {
        let mut index = self.index.write();

        let Some(entries) = index.by_user.remove(user_id) else {
            return Vec::new();
        };

        for entry in entries.iter() {
            index.by_connection.remove(entry.connection_id());
            entry.handle.request_close();
        }

        info!(user_id = %user_id, evicted = entries.len(), "User connections evicted");

        entries.to_vec()
    }

    /// Snapshot of a user's connections; empty for offline and unknown users alike.
    pub fn connections_for(&self, user_id: &UserId) -> Vec<ConnectionEntry> {
        self.index
            .read()
            .by_user
            .get(user_id)
            .map(|entries| entries.to_vec())
            .unwrap_or_default()
    }

    pub fn connection_ids_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.connections_for(user_id)
            .into_iter()
            .map(|entry| entry.handle.id)
            .collect()
    }

    pub fn owner_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.index.read().by_connection.get(connection_id).cloned()
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.index.read().by_user.contains_key(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.index.read().by_connection.len()
    }

    pub fn online_user_count(&self) -> usize {
        self.index.read().by_user.len()
    }
}
