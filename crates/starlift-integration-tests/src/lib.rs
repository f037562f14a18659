//! # Integration Test Harness
//!
//! Shared plumbing for the end-to-end scenario tests: a coordinator in a
//! temp directory plus scripted in-process instances attached straight to
//! the gateway, so full sagas run through the real orchestrator, store,
//! journal, and fan-out without sockets.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use starlift_api::config::CoordinatorConfig;
use starlift_api::state::AppState;
use starlift_core::InstanceId;
use starlift_proto::{Frame, PlatformExportEvent, RequestMessage};

/// A coordinator under test, rooted in its own temp directory.
pub struct TestCluster {
    /// Shared application state (component graph).
    pub state: AppState,
    /// Keeps the data directory alive for the test's duration.
    pub dir: tempfile::TempDir,
}

impl TestCluster {
    /// Coordinator with default test configuration (no auth).
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Coordinator with configuration tweaks applied on top of defaults.
    pub fn with_config(tweak: impl FnOnce(&mut CoordinatorConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CoordinatorConfig {
            data_dir: dir.path().to_path_buf(),
            ..CoordinatorConfig::default()
        };
        tweak(&mut config);
        Self {
            state: AppState::new(config),
            dir,
        }
    }

    /// The assembled router for HTTP-driven tests.
    pub fn app(&self) -> axum::Router {
        starlift_api::app(self.state.clone())
    }

    /// Stage an export payload as if its `PlatformExportEvent` arrived.
    pub fn stage_export(&self, export_id: &str, source: u32, payload: Value) {
        self.state
            .orchestrator
            .handle_platform_export(PlatformExportEvent {
                export_id: export_id.to_string(),
                platform_name: payload["platformName"]
                    .as_str()
                    .unwrap_or("Aurora")
                    .to_string(),
                source_instance_id: InstanceId::new(source),
                export_data: payload,
            });
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// How a scripted instance answers each request kind.
pub type Responder = Arc<dyn Fn(&RequestMessage) -> Option<Value> + Send + Sync>;

/// Attach a scripted instance to the cluster. Returns the request log.
pub fn scripted_instance(
    cluster: &TestCluster,
    id: u32,
    name: &str,
    responder: Responder,
) -> Arc<Mutex<Vec<RequestMessage>>> {
    let instance_id = InstanceId::new(id);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = cluster.state.gateway.attach(instance_id, name, tx);
    cluster.state.directory.mark_connected(instance_id, name);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Frame::Request(request) = frame {
                seen_task.lock().unwrap().push(request.message.clone());
                if let Some(reply) = responder(&request.message) {
                    handle.complete(request.seq, reply);
                }
            }
        }
    });
    seen
}

/// An instance that accepts everything thrown at it; exports are answered
/// with `export_id`.
pub fn accepting_instance(
    cluster: &TestCluster,
    id: u32,
    name: &str,
    export_id: &'static str,
) -> Arc<Mutex<Vec<RequestMessage>>> {
    scripted_instance(
        cluster,
        id,
        name,
        Arc::new(move |message| match message {
            RequestMessage::ExportPlatform(_) => {
                Some(json!({"success": true, "exportId": export_id}))
            }
            _ => Some(json!({"success": true})),
        }),
    )
}

/// A platform export payload with the shape fields the coordinator lifts
/// into display metrics.
pub fn sample_payload(platform_name: &str, platform_index: u32) -> Value {
    json!({
        "platformIndex": platform_index,
        "platformName": platform_name,
        "compressed": false,
        "entityCount": 812,
        "tileCount": 404,
        "uniqueItemTypes": 31,
        "uniqueFluidTypes": 3,
        "totalItemCount": 90_211,
        "totalFluidCount": 25_000,
        "entities": [{"name": "cargo-bay", "position": [0.5, -1.5]}],
    })
}
