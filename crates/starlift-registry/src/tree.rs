//! # Platform Tree
//!
//! The live instance/platform tree for one force. Platform enumeration is
//! a fan-out: every connected instance gets an
//! `InstanceListPlatformsRequest` in parallel with a short per-instance
//! timeout, and the answers are merged into one snapshot.
//!
//! Failure semantics: an instance that fails or times out is included as
//! `disconnected` with an empty platform list. Disconnected roster entries
//! are included the same way without being queried. The builder never
//! returns an error — a cluster where nothing answers produces a snapshot
//! with empty platform lists.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use starlift_core::{now_ms, InstanceId};
use starlift_gateway::Gateway;
use starlift_proto::{InstanceListPlatformsRequest, PlatformInfo, RequestMessage};

use crate::directory::{ConnectionStatus, InstanceDirectory};

/// Default per-instance enumeration timeout.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(2);

/// One instance in a tree snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeInstance {
    /// Instance id.
    pub instance_id: InstanceId,
    /// Display name.
    pub instance_name: String,
    /// Status as observed while building this snapshot: an instance that
    /// failed to answer is reported `disconnected` even if its session
    /// looked live when the fan-out started.
    pub status: ConnectionStatus,
    /// Platforms the instance reported (empty when unreachable).
    pub platforms: Vec<PlatformInfo>,
}

/// A per-force instance/platform tree snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    /// The force this snapshot was built for.
    pub force_name: String,
    /// When the snapshot was assembled (epoch ms).
    pub generated_at: i64,
    /// Instances, sorted by id for stable output.
    pub instances: Vec<TreeInstance>,
}

/// Builds tree snapshots against the directory and gateway.
pub struct TreeBuilder {
    directory: Arc<InstanceDirectory>,
    gateway: Arc<Gateway>,
    list_timeout: Duration,
}

impl TreeBuilder {
    /// Builder with the default per-instance timeout.
    pub fn new(directory: Arc<InstanceDirectory>, gateway: Arc<Gateway>) -> Self {
        Self::with_list_timeout(directory, gateway, DEFAULT_LIST_TIMEOUT)
    }

    /// Builder with a custom per-instance timeout.
    pub fn with_list_timeout(
        directory: Arc<InstanceDirectory>,
        gateway: Arc<Gateway>,
        list_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            gateway,
            list_timeout,
        }
    }

    /// Build the tree for `force`.
    pub async fn build_tree(&self, force: &str) -> TreeSnapshot {
        let roster = self.directory.list();
        let mut tasks: JoinSet<TreeInstance> = JoinSet::new();

        for info in roster {
            let gateway = self.gateway.clone();
            let force = force.to_string();
            let timeout = self.list_timeout;
            tasks.spawn(async move {
                if info.status != ConnectionStatus::Connected {
                    return TreeInstance {
                        instance_id: info.instance_id,
                        instance_name: info.instance_name,
                        status: ConnectionStatus::Disconnected,
                        platforms: Vec::new(),
                    };
                }

                let request = RequestMessage::ListPlatforms(InstanceListPlatformsRequest {
                    force_name: force,
                });
                match gateway
                    .request_typed_with_timeout::<Vec<PlatformInfo>>(
                        info.instance_id,
                        request,
                        timeout,
                    )
                    .await
                {
                    Ok(platforms) => TreeInstance {
                        instance_id: info.instance_id,
                        instance_name: info.instance_name,
                        status: ConnectionStatus::Connected,
                        platforms,
                    },
                    Err(err) => {
                        tracing::debug!(
                            instance = %info.instance_id,
                            %err,
                            "platform enumeration failed; reporting instance as disconnected"
                        );
                        TreeInstance {
                            instance_id: info.instance_id,
                            instance_name: info.instance_name,
                            status: ConnectionStatus::Disconnected,
                            platforms: Vec::new(),
                        }
                    }
                }
            });
        }

        let mut instances = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(instance) = joined {
                instances.push(instance);
            }
        }
        instances.sort_by_key(|i| i.instance_id);

        TreeSnapshot {
            force_name: force.to_string(),
            generated_at: now_ms(),
            instances,
        }
    }
}

impl std::fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("list_timeout", &self.list_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use starlift_proto::Frame;
    use tokio::sync::mpsc;

    fn platform(index: u32, name: &str) -> serde_json::Value {
        json!({"platformIndex": index, "platformName": name})
    }

    /// Attach an instance whose enumeration answer is `platforms`.
    fn listing_instance(
        gateway: &Gateway,
        directory: &InstanceDirectory,
        id: u32,
        name: &str,
        platforms: serde_json::Value,
    ) {
        let instance_id = InstanceId::new(id);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = gateway.attach(instance_id, name, tx);
        directory.mark_connected(instance_id, name);
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Frame::Request(req) = frame {
                    handle.complete(req.seq, platforms.clone());
                }
            }
        });
    }

    fn builder(
        directory: &Arc<InstanceDirectory>,
        gateway: &Arc<Gateway>,
    ) -> TreeBuilder {
        TreeBuilder::with_list_timeout(
            directory.clone(),
            gateway.clone(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn merges_parallel_responses_sorted_by_id() {
        let directory = Arc::new(InstanceDirectory::new());
        let gateway = Arc::new(Gateway::new());
        listing_instance(
            &gateway,
            &directory,
            2,
            "beta",
            json!([platform(1, "Borealis")]),
        );
        listing_instance(
            &gateway,
            &directory,
            1,
            "alpha",
            json!([platform(1, "Aurora"), platform(2, "Zephyr")]),
        );

        let tree = builder(&directory, &gateway).build_tree("player").await;
        assert_eq!(tree.force_name, "player");
        assert_eq!(tree.instances.len(), 2);
        assert_eq!(tree.instances[0].instance_id, InstanceId::new(1));
        assert_eq!(tree.instances[0].platforms.len(), 2);
        assert_eq!(tree.instances[1].platforms[0].platform_name, "Borealis");
    }

    #[tokio::test]
    async fn unreachable_instance_is_present_but_disconnected() {
        let directory = Arc::new(InstanceDirectory::new());
        let gateway = Arc::new(Gateway::new());
        listing_instance(&gateway, &directory, 1, "alpha", json!([platform(1, "Aurora")]));

        // Connected in the roster but never answers.
        let silent = InstanceId::new(2);
        let (tx, _rx) = mpsc::unbounded_channel();
        gateway.attach(silent, "silent", tx);
        directory.mark_connected(silent, "silent");

        let tree = builder(&directory, &gateway).build_tree("player").await;
        assert_eq!(tree.instances.len(), 2);

        let silent_entry = tree
            .instances
            .iter()
            .find(|i| i.instance_id == silent)
            .unwrap();
        assert_eq!(silent_entry.status, ConnectionStatus::Disconnected);
        assert!(silent_entry.platforms.is_empty());
    }

    #[tokio::test]
    async fn disconnected_roster_entries_are_included_without_query() {
        let directory = Arc::new(InstanceDirectory::new());
        let gateway = Arc::new(Gateway::new());
        directory.mark_connected(InstanceId::new(3), "gone");
        directory.mark_disconnected(InstanceId::new(3));

        let tree = builder(&directory, &gateway).build_tree("player").await;
        assert_eq!(tree.instances.len(), 1);
        assert_eq!(tree.instances[0].status, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn empty_cluster_yields_empty_snapshot() {
        let directory = Arc::new(InstanceDirectory::new());
        let gateway = Arc::new(Gateway::new());

        let tree = builder(&directory, &gateway).build_tree("player").await;
        assert!(tree.instances.is_empty());
        assert!(tree.generated_at > 0);
    }

    #[tokio::test]
    async fn deleted_instances_are_omitted() {
        let directory = Arc::new(InstanceDirectory::new());
        let gateway = Arc::new(Gateway::new());
        listing_instance(&gateway, &directory, 1, "alpha", json!([]));
        directory.mark_connected(InstanceId::new(2), "doomed");
        directory.mark_deleted(InstanceId::new(2));

        let tree = builder(&directory, &gateway).build_tree("player").await;
        assert_eq!(tree.instances.len(), 1);
        assert_eq!(tree.instances[0].instance_name, "alpha");
    }
}
