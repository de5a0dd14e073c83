//! # Outage Scenarios
//!
//! Losing the event log degrades replication without taking either region
//! down. Once the log returns the coordinators reconnect and catch up.

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Duration;
    use rr_03_replication::CoordinatorState;
    use shared_types::EntityId;

    use crate::integration::harness::{get, put, Cluster};

    #[tokio::test]
    async fn test_publish_failure_reports_unreplicated_commit() {
        let cluster = Cluster::start();
        cluster.log.set_available(false);

        let (status, body) = put(&cluster, "us", 30, "req-30", 10.0, 0).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["replicated"], false);
        assert_eq!(body["record"]["version"], 1);

        // The local commit stands and the id stays consumed.
        let stored = cluster
            .node("us")
            .store()
            .get_by_id(EntityId(30))
            .await
            .unwrap();
        assert_eq!(stored.map(|r| r.version), Some(1));

        cluster.log.set_available(true);
        let (status, _) = put(&cluster, "us", 30, "req-30", 10.0, 0).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_http_stays_healthy_during_outage() {
        let cluster = Cluster::start();
        put(&cluster, "us", 31, "req-31", 10.0, 0).await;
        assert!(cluster.wait_for_version("eu", 31, 1).await.is_some());

        cluster.log.set_available(false);
        assert!(
            cluster
                .wait_for_status("eu", |s| s.state != CoordinatorState::Running)
                .await
        );

        let (status, body) = get(&cluster, "eu", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        // Reads keep serving what was already replicated.
        let (status, body) = get(&cluster, "eu", "/entities/31").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);

        cluster.log.set_available(true);
        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_coordinator_reconnects_and_catches_up() {
        let cluster = Cluster::start();
        put(&cluster, "us", 32, "before", 1.0, 0).await;
        assert!(cluster.wait_for_version("eu", 32, 1).await.is_some());

        cluster.log.set_available(false);
        assert!(
            cluster
                .wait_for_status("eu", |s| s.reconnects >= 1)
                .await,
            "eu notices the outage"
        );

        cluster.log.set_available(true);
        let (status, _) = put(&cluster, "us", 32, "after", 2.0, 1).await;
        assert_eq!(status, StatusCode::OK);

        let caught_up = cluster
            .wait_for_version("eu", 32, 2)
            .await
            .expect("eu catches up after the outage");
        assert_eq!(caught_up.price, 2.0);
        assert!(
            cluster
                .wait_for_status("eu", |s| s.state == CoordinatorState::Running)
                .await
        );

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_replay_after_reconnect_keeps_lag() {
        let cluster = Cluster::start();
        put(&cluster, "us", 33, "lag-1", 1.0, 0).await;
        assert!(cluster.wait_for_version("eu", 33, 1).await.is_some());

        cluster.clock.advance(Duration::seconds(100));
        put(&cluster, "us", 34, "lag-2", 2.0, 0).await;
        assert!(cluster.wait_for_version("eu", 34, 1).await.is_some());

        let (_, before) = get(&cluster, "eu", "/replication-lag").await;
        assert_eq!(before["lag_seconds"].as_f64(), Some(0.0));

        cluster.log.set_available(false);
        assert!(cluster.wait_for_status("eu", |s| s.reconnects >= 1).await);
        cluster.log.set_available(true);

        // The reconnect replays both events from the start of the log.
        assert!(cluster.wait_for_status("eu", |s| s.duplicates >= 2).await);

        let (_, after) = get(&cluster, "eu", "/replication-lag").await;
        assert_eq!(after["last_applied_at"], before["last_applied_at"]);
        assert_eq!(after["lag_seconds"].as_f64(), Some(0.0));
        assert_eq!(cluster.status("eu").applied, 2);

        cluster.stop().await;
    }
}
