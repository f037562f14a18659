//! # Bounded Stores & Persistence Round Trips
//!
//! The coordinator's two durable artifacts stay bounded and survive a
//! restart: the export index (capped, oldest evicted) and the
//! transaction-log window (newest ten, upserted by transfer id).

use serde_json::Value;

use starlift_core::{ExportId, InstanceId, TransferId};
use starlift_integration_tests::{accepting_instance, sample_payload, TestCluster};
use starlift_proto::TransferValidationEvent;

// ---------------------------------------------------------------------------
// Scenario 5: bounded export eviction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_store_evicts_oldest_beyond_cap() {
    let cluster = TestCluster::with_config(|config| config.max_exports = 3);

    for (i, id) in ["E1", "E2", "E3", "E4"].iter().enumerate() {
        cluster.stage_export(id, 1, sample_payload(&format!("Platform {i}"), 1));
        // Staging timestamps are wall-clock; a tick keeps them ordered.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    assert_eq!(cluster.state.store.len(), 3);
    assert!(!cluster.state.store.contains(&ExportId::new("E1").unwrap()));
    for id in ["E2", "E3", "E4"] {
        assert!(
            cluster.state.store.contains(&ExportId::new(id).unwrap()),
            "{id} should have survived eviction"
        );
    }
}

#[tokio::test]
async fn export_index_round_trips_across_restart() {
    let dir;
    {
        let cluster = TestCluster::new();
        cluster.stage_export("E_KEEP", 4, sample_payload("Borealis", 2));
        cluster.state.store.flush_and_wait().await;
        dir = cluster.dir;
    }

    // A new coordinator over the same data directory sees the export.
    let config = starlift_api::config::CoordinatorConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let state = starlift_api::state::AppState::new(config);
    let record = state.store.get(&ExportId::new("E_KEEP").unwrap()).unwrap();
    assert_eq!(record.platform_name, "Borealis");
    assert_eq!(record.source_instance_id, InstanceId::new(4));
    assert_eq!(record.export_data["entityCount"], 812);
}

// ---------------------------------------------------------------------------
// Scenario 6: bounded persisted logs
// ---------------------------------------------------------------------------

/// Run one full successful saga and return the transfer id.
async fn run_successful_saga(cluster: &TestCluster, export_id: &str) -> String {
    cluster.stage_export(export_id, 1, sample_payload("Aurora", 3));
    let started = cluster
        .state
        .orchestrator
        .transfer_existing_export(
            ExportId::new(export_id).unwrap(),
            starlift_core::InstanceRef::Id(2),
        )
        .await
        .unwrap();

    cluster
        .state
        .orchestrator
        .handle_transfer_validation(TransferValidationEvent {
            transfer_id: started.transfer_id.to_string(),
            success: true,
            platform_name: "Aurora".to_string(),
            source_instance_id: InstanceId::new(1),
            validation: serde_json::json!({"itemCountMatch": true, "fluidCountMatch": true}),
            metrics: None,
        })
        .await;
    started.transfer_id.to_string()
}

#[tokio::test]
async fn persisted_log_window_keeps_newest_ten_of_twelve() {
    let cluster = TestCluster::new();
    accepting_instance(&cluster, 1, "alpha", "E_UNUSED");
    accepting_instance(&cluster, 2, "beta", "E_UNUSED");

    let mut transfer_ids = Vec::new();
    for i in 0..12 {
        transfer_ids.push(run_successful_saga(&cluster, &format!("E_{i}")).await);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // Ten newest on disk…
    assert_eq!(cluster.state.journal.persisted_len(), 10);
    cluster.state.journal.flush_and_wait().await;
    let on_disk: Vec<Value> = starlift_persist_read(&cluster);
    assert_eq!(on_disk.len(), 10);
    let disk_ids: Vec<&str> = on_disk
        .iter()
        .map(|record| record["transferId"].as_str().unwrap())
        .collect();
    assert!(!disk_ids.contains(&transfer_ids[0].as_str()));
    assert!(!disk_ids.contains(&transfer_ids[1].as_str()));
    assert!(disk_ids.contains(&transfer_ids[11].as_str()));

    // …but all twelve still listed via the active-transfer fallback.
    let summaries = cluster.state.orchestrator.transfer_summaries(50);
    assert_eq!(summaries.len(), 12);
}

#[tokio::test]
async fn transaction_log_round_trips_across_restart() {
    let dir;
    let transfer_id;
    {
        let cluster = TestCluster::new();
        accepting_instance(&cluster, 1, "alpha", "E_UNUSED");
        accepting_instance(&cluster, 2, "beta", "E_UNUSED");
        transfer_id = run_successful_saga(&cluster, "E_A").await;
        cluster.state.journal.flush_and_wait().await;
        dir = cluster.dir;
    }

    let config = starlift_api::config::CoordinatorConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let state = starlift_api::state::AppState::new(config);
    let record = state
        .journal
        .persisted_record(&TransferId::new(transfer_id.as_str()).unwrap())
        .unwrap();
    assert_eq!(record.summary["result"], "SUCCESS");
    assert_eq!(record.transfer_info["status"], "completed");
    assert_eq!(
        record.events.first().map(|e| e.event_type.to_string()),
        Some("transfer_created".to_string())
    );
}

/// Read the raw persisted transaction-log array from the cluster's data
/// directory.
fn starlift_persist_read(cluster: &TestCluster) -> Vec<Value> {
    let path = cluster.dir.path().join("transaction_logs.json");
    serde_json::from_slice(&std::fs::read(path).expect("transaction_logs.json"))
        .expect("valid JSON array")
}
