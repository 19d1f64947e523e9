mod common;

use common::{ScriptedReply, ScriptedTransport, event, local_utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use worksync::client::connectivity::SyncReason;
use worksync::client::event_log::EventLog;
use worksync::client::orchestrator::{SyncOrchestrator, spawn_sync_loop};
use worksync::client::queue::MutationQueue;
use worksync::client::store::ClientStore;
use worksync::models::{EventKind, Method};

fn orchestrator(transport: Arc<ScriptedTransport>) -> SyncOrchestrator {
    let store = ClientStore::open_in_memory().unwrap().into_shared();
    SyncOrchestrator::new(
        MutationQueue::new(store.clone()),
        EventLog::new(store),
        transport,
    )
}

#[tokio::test]
async fn a_pass_drains_the_queue_then_pushes_sorted_events() {
    let transport = Arc::new(ScriptedTransport::new());
    let orch = orchestrator(transport.clone());

    orch.queue()
        .enqueue("/api/teams", Method::Post, Some(json!({ "name": "Crew" })), None)
        .unwrap();

    // Logged out of order; the batch must go out sorted by timestamp.
    let late = event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 17, 0), None);
    let early = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    orch.log().log_event(&late).unwrap();
    orch.log().log_event(&early).unwrap();

    let outcome = orch.sync().await.unwrap();
    assert!(!outcome.skipped);
    assert_eq!(outcome.drain.applied, 1);
    assert_eq!(outcome.pushed, 2);
    assert!(outcome.acknowledged);

    let pushed = transport.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0][0].id, early.id);
    assert_eq!(pushed[0][1].id, late.id);
    drop(pushed);

    // Acknowledged events left the pending set.
    assert!(orch.log().pending_events().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_batch_stays_pending_for_the_next_trigger() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.script_push_statuses([500]);
    let orch = orchestrator(transport.clone());

    let ev = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    orch.log().log_event(&ev).unwrap();

    let outcome = orch.sync().await.unwrap();
    assert_eq!(outcome.pushed, 1);
    assert!(!outcome.acknowledged);
    assert_eq!(orch.log().pending_events().unwrap().len(), 1);

    // A later pass retries the same batch and succeeds.
    let outcome = orch.sync().await.unwrap();
    assert!(outcome.acknowledged);
    assert!(orch.log().pending_events().unwrap().is_empty());
}

#[tokio::test]
async fn events_are_not_pushed_while_the_queue_is_blocked() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.script_replies([ScriptedReply::NetworkError]);
    let orch = orchestrator(transport.clone());

    // A queued team creation whose canonical id the logged event needs.
    orch.queue()
        .enqueue("/api/teams", Method::Post, Some(json!({ "name": "Crew" })), None)
        .unwrap();
    let ev = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    orch.log().log_event(&ev).unwrap();

    let outcome = orch.sync().await.unwrap();
    assert!(outcome.drain.halted);
    assert_eq!(outcome.pushed, 0);
    assert!(transport.pushed.lock().unwrap().is_empty());
    assert_eq!(orch.log().pending_events().unwrap().len(), 1);
}

#[tokio::test]
async fn overlapping_triggers_are_no_ops() {
    let transport = Arc::new(ScriptedTransport {
        push_delay: Some(Duration::from_millis(50)),
        ..ScriptedTransport::default()
    });
    let orch = Arc::new(orchestrator(transport.clone()));

    let ev = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    orch.log().log_event(&ev).unwrap();

    let (first, second) = tokio::join!(orch.sync(), orch.sync());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert!(first.skipped ^ second.skipped);
    // The batch went out exactly once.
    assert_eq!(transport.pushed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn the_sync_loop_services_channel_triggers() {
    let transport = Arc::new(ScriptedTransport::new());
    let orch = Arc::new(orchestrator(transport.clone()));
    let ev = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    orch.log().log_event(&ev).unwrap();

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = spawn_sync_loop(orch.clone(), rx, None);

    tx.send(SyncReason::Manual).unwrap();

    // The loop runs the pass shortly after the trigger lands.
    let mut synced = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if orch.log().pending_events().unwrap().is_empty() {
            synced = true;
            break;
        }
    }
    assert!(synced, "trigger was not serviced");

    // Closing the channel shuts the loop down.
    drop(tx);
    handle.await.unwrap();
}
