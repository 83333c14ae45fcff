#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Registry load/unload behavior against scripted connectors.

mod common;

use agentmesh_orchestrator::{ProviderRegistry, ProviderState};
use common::{config_for, Behavior, FakeConnector};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_hanging_provider_does_not_delay_siblings() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("stuck", Behavior::HangOnConnect)
            .with("a", Behavior::SlowConnect(Duration::from_secs(4), "a".into()))
            .with("b", Behavior::SlowConnect(Duration::from_secs(4), "b".into()))
            .with("c", Behavior::SlowConnect(Duration::from_secs(4), "c".into())),
    );
    let registry = ProviderRegistry::new(connector.clone());

    let start = Instant::now();
    let report = registry.load(&connector.configs()).await;
    let elapsed = start.elapsed();

    // Sequential connects would need 12s for the healthy ones alone.
    assert!(elapsed <= Duration::from_secs(6), "load took {elapsed:?}");
    assert_eq!(report.ready, vec!["a", "b", "c"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind(), "connect_timeout");
    assert_eq!(registry.ready_names().await, names(&["a", "b", "c"]));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_connect_is_torn_down() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("stuck", Behavior::HangOnConnect)
            .with("healthy", Behavior::Answer("ok".into())),
    );
    let registry = ProviderRegistry::new(connector.clone());
    registry.load(&connector.configs()).await;

    assert_eq!(connector.abandoned.load(Ordering::SeqCst), 1);
    assert_eq!(registry.ready_names().await, names(&["healthy"]));

    let description = registry.description().await;
    assert!(description.contains("<provider name=\"healthy\">"));
    assert!(!description.contains("stuck"));
}

#[tokio::test]
async fn test_failed_connect_is_excluded() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("broken", Behavior::FailConnect("exit status 127".into()))
            .with("fine", Behavior::Answer("ok".into())),
    );
    let registry = ProviderRegistry::new(connector.clone());
    let report = registry.load(&connector.configs()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind(), "connect_failed");
    assert!(report.failures[0].to_string().contains("exit status 127"));
    assert!(registry.get("broken").await.is_err());
    assert!(registry.get("fine").await.is_ok());

    let statuses = registry.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].name, "fine");
    assert_eq!(statuses[0].state, ProviderState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_custom_connect_budget() {
    let connector = Arc::new(
        FakeConnector::new().with("slow", Behavior::SlowConnect(Duration::from_secs(3), "x".into())),
    );
    let registry =
        ProviderRegistry::new(connector.clone()).with_connect_timeout(Duration::from_secs(2));
    let report = registry.load(&connector.configs()).await;

    assert!(report.ready.is_empty());
    assert_eq!(
        report.failures[0].to_string(),
        "Provider 'slow' timed out after 2s while connecting"
    );
}

#[tokio::test]
async fn test_empty_config_leaves_registry_empty() {
    let registry = ProviderRegistry::new(Arc::new(FakeConnector::new()));
    let report = registry.load(&Default::default()).await;
    assert!(report.ready.is_empty());
    assert!(report.failures.is_empty());
    assert!(registry.description().await.is_empty());
}

// ---------------------------------------------------------------------------
// Unload and reload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unload_is_idempotent() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("a", Behavior::Answer("1".into()))
            .with("b", Behavior::Answer("2".into())),
    );
    let registry = ProviderRegistry::new(connector.clone());

    // Nothing loaded yet.
    registry.unload().await;
    assert!(registry.ready_names().await.is_empty());

    registry.load(&connector.configs()).await;
    registry.unload().await;
    registry.unload().await;

    assert!(registry.ready_names().await.is_empty());
    assert!(registry.description().await.is_empty());
    assert_eq!(connector.disconnects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reload_replaces_providers() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("a", Behavior::Answer("1".into()))
            .with("b", Behavior::Answer("2".into())),
    );
    let registry = ProviderRegistry::new(connector.clone());
    registry.load(&connector.configs()).await;

    let only_b = [("b".to_string(), config_for("b"))].into_iter().collect();
    let report = registry.load(&only_b).await;

    assert_eq!(report.ready, vec!["b"]);
    assert_eq!(registry.ready_names().await, names(&["b"]));
    // Both earlier connections were closed before reconnecting.
    assert_eq!(connector.disconnects.load(Ordering::SeqCst), 2);
    assert_eq!(connector.connect_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_loads_do_not_interleave() {
    let connector = Arc::new(
        FakeConnector::new()
            .with("a", Behavior::SlowConnect(Duration::from_millis(20), "1".into()))
            .with("b", Behavior::SlowConnect(Duration::from_millis(5), "2".into())),
    );
    let registry = Arc::new(ProviderRegistry::new(connector.clone()));
    let configs = connector.configs();

    let (r1, r2) = tokio::join!(registry.load(&configs), registry.load(&configs));
    assert_eq!(r1.ready.len(), 2);
    assert_eq!(r2.ready.len(), 2);

    let description = registry.description().await;
    assert_eq!(description.matches("<provider name=\"a\">").count(), 1);
    assert_eq!(description.matches("<provider name=\"b\">").count(), 1);
    assert_eq!(connector.disconnects.load(Ordering::SeqCst), 2);
}
