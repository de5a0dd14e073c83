//! # Convergence Scenarios
//!
//! A write committed in one region becomes readable in the other, carries
//! its origin, and moves the receiving region's lag metric.

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Duration;
    use rr_03_replication::CoordinatorState;

    use crate::integration::harness::{get, put, Cluster};

    // =============================================================================
    // ONE-WAY REPLICATION
    // =============================================================================

    #[tokio::test]
    async fn test_write_in_us_becomes_readable_in_eu() {
        let cluster = Cluster::start();

        let (status, body) = put(&cluster, "us", 42, "req-1", 350_000.0, 0).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);
        assert_eq!(body["region_origin"], "us");

        let replicated = cluster.wait_for_version("eu", 42, 1).await;
        assert!(replicated.is_some(), "eu never received the write");

        let (status, body) = get(&cluster, "eu", "/entities/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);
        assert_eq!(body["price"].as_f64(), Some(350_000.0));
        assert_eq!(body["region_origin"], "us");

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_found_in_both_regions() {
        let cluster = Cluster::start();

        for region in ["us", "eu"] {
            let (status, _) = get(&cluster, region, "/entities/999").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        cluster.stop().await;
    }

    // =============================================================================
    // BIDIRECTIONAL REPLICATION
    // =============================================================================

    #[tokio::test]
    async fn test_sequential_updates_from_both_regions_converge() {
        let cluster = Cluster::start();

        put(&cluster, "us", 7, "us-1", 100.0, 0).await;
        assert!(cluster.wait_for_version("eu", 7, 1).await.is_some());

        let (status, body) = put(&cluster, "eu", 7, "eu-1", 120.0, 1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 2);

        let in_us = cluster.wait_for_version("us", 7, 2).await.expect("us converges");
        let in_eu = cluster.node("eu").store().get_by_id(in_us.id).await.unwrap();

        assert_eq!(Some(in_us.clone()), in_eu);
        assert_eq!(in_us.price, 120.0);
        assert_eq!(in_us.region_origin.as_str(), "eu");

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_own_events_are_not_reapplied() {
        let cluster = Cluster::start();

        put(&cluster, "us", 1, "req-1", 10.0, 0).await;
        assert!(
            cluster
                .wait_for_status("us", |s| s.self_origin >= 1)
                .await
        );

        let us = cluster.status("us");
        assert_eq!(us.applied, 0);
        assert_eq!(us.state, CoordinatorState::Running);

        // us never applied a remote event, so it reports no lag.
        let (_, body) = get(&cluster, "us", "/replication-lag").await;
        assert_eq!(body["lag_seconds"].as_f64(), Some(0.0));

        cluster.stop().await;
    }

    // =============================================================================
    // LAG REPORTING
    // =============================================================================

    #[tokio::test]
    async fn test_replication_lag_tracks_last_applied_event() {
        let cluster = Cluster::start();

        put(&cluster, "us", 5, "req-5", 1.0, 0).await;
        assert!(cluster.wait_for_version("eu", 5, 1).await.is_some());

        cluster.clock.advance(Duration::milliseconds(2_500));

        let (status, body) = get(&cluster, "eu", "/replication-lag").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lag_seconds"].as_f64(), Some(2.5));
        assert!(body["last_applied_at"].is_string());

        // Lag keeps growing while no new event arrives.
        cluster.clock.advance(Duration::seconds(1));
        let (_, body) = get(&cluster, "eu", "/replication-lag").await;
        assert_eq!(body["lag_seconds"].as_f64(), Some(3.5));

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_health_reports_region_and_replication_state() {
        let cluster = Cluster::start();
        assert!(
            cluster
                .wait_for_status("eu", |s| s.state == CoordinatorState::Running)
                .await
        );

        let (status, body) = get(&cluster, "eu", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["region"], "eu");
        assert_eq!(body["replication"]["state"], "running");

        cluster.stop().await;
    }
}
