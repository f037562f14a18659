//! # Instance Directory
//!
//! The coordinator's roster of known instances. Lifetime is managed by the
//! socket layer: a hello upserts the instance as connected, a socket close
//! marks it disconnected, and explicit deregistration marks it deleted.
//! Deleted instances stay in the roster (their ids must not be recycled
//! into lookups) but resolve to nothing.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use starlift_core::{InstanceId, InstanceRef};

/// Connection status of a known instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// A live session exists.
    Connected,
    /// Previously seen, currently no session.
    Disconnected,
    /// Removed from the cluster; never resolved.
    Deleted,
}

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    /// Instance id.
    pub instance_id: InstanceId,
    /// Display name.
    pub instance_name: String,
    /// Current connection status.
    pub status: ConnectionStatus,
}

/// Roster of known instances.
#[derive(Debug, Default)]
pub struct InstanceDirectory {
    instances: DashMap<InstanceId, (String, ConnectionStatus)>,
}

impl InstanceDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instance as connected, updating its display name.
    pub fn mark_connected(&self, id: InstanceId, name: impl Into<String>) {
        self.instances
            .insert(id, (name.into(), ConnectionStatus::Connected));
    }

    /// Record an instance as disconnected. Unknown ids are ignored.
    pub fn mark_disconnected(&self, id: InstanceId) {
        if let Some(mut entry) = self.instances.get_mut(&id) {
            if entry.1 != ConnectionStatus::Deleted {
                entry.1 = ConnectionStatus::Disconnected;
            }
        }
    }

    /// Record an instance as deleted. Deleted instances never resolve.
    pub fn mark_deleted(&self, id: InstanceId) {
        if let Some(mut entry) = self.instances.get_mut(&id) {
            entry.1 = ConnectionStatus::Deleted;
        }
    }

    /// Resolve an id-or-name reference to canonical coordinates.
    ///
    /// Names match the first non-deleted instance with that display name;
    /// numeric ids are authoritative. Deleted instances resolve to `None`.
    pub fn resolve(&self, target: &InstanceRef) -> Option<(InstanceId, String)> {
        match target {
            InstanceRef::Id(raw) => {
                let id = InstanceId::new(*raw);
                let entry = self.instances.get(&id)?;
                if entry.1 == ConnectionStatus::Deleted {
                    return None;
                }
                Some((id, entry.0.clone()))
            }
            InstanceRef::Name(name) => self
                .instances
                .iter()
                .filter(|entry| entry.value().1 != ConnectionStatus::Deleted)
                .find(|entry| entry.value().0 == *name)
                .map(|entry| (*entry.key(), entry.value().0.clone())),
        }
    }

    /// Display name of an instance, if known and not deleted.
    pub fn name_of(&self, id: InstanceId) -> Option<String> {
        let entry = self.instances.get(&id)?;
        if entry.1 == ConnectionStatus::Deleted {
            return None;
        }
        Some(entry.0.clone())
    }

    /// Connection status of an instance, if known.
    pub fn status_of(&self, id: InstanceId) -> Option<ConnectionStatus> {
        self.instances.get(&id).map(|entry| entry.1)
    }

    /// Whether the instance is currently connected.
    pub fn is_connected(&self, id: InstanceId) -> bool {
        self.status_of(id) == Some(ConnectionStatus::Connected)
    }

    /// Every non-deleted instance, unordered.
    pub fn list(&self) -> Vec<InstanceInfo> {
        self.instances
            .iter()
            .filter(|entry| entry.value().1 != ConnectionStatus::Deleted)
            .map(|entry| InstanceInfo {
                instance_id: *entry.key(),
                instance_name: entry.value().0.clone(),
                status: entry.value().1,
            })
            .collect()
    }
}
