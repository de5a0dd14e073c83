//! # Conflict Scenarios
//!
//! Optimistic concurrency on the write path, and version-guarded merging
//! on the replication path.

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use shared_bus::{EventPublisher, ReplicationEvent, REPLICATION_TOPIC};
    use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId};

    use crate::integration::harness::{get, put, Cluster};

    fn remote_record(id: u64, version: u64, price: f64, origin: &str) -> EntityRecord {
        EntityRecord {
            id: EntityId(id),
            price,
            bedrooms: 0,
            bathrooms: 0,
            region_origin: RegionId::new(origin),
            version,
            updated_at: Utc::now(),
        }
    }

    async fn publish(cluster: &Cluster, record: EntityRecord) {
        let event = ReplicationEvent::new(record);
        cluster
            .log
            .publish(REPLICATION_TOPIC, &event.key(), event.encode().unwrap())
            .await
            .unwrap();
    }

    // =============================================================================
    // WRITE PATH
    // =============================================================================

    #[tokio::test]
    async fn test_stale_expected_version_is_a_conflict() {
        let cluster = Cluster::start();

        put(&cluster, "us", 10, "v1", 100.0, 0).await;
        put(&cluster, "us", 10, "v2", 110.0, 1).await;

        let (status, body) = put(&cluster, "us", 10, "late", 90.0, 1).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("expected version 1"));

        let (_, current) = get(&cluster, "us", "/entities/10").await;
        assert_eq!(current["version"], 2);
        assert_eq!(current["price"].as_f64(), Some(110.0));

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_write_against_replicated_version_succeeds() {
        let cluster = Cluster::start();

        put(&cluster, "us", 11, "create", 1.0, 0).await;
        assert!(cluster.wait_for_version("eu", 11, 1).await.is_some());

        // eu clients read version 1 from eu and update from there.
        let (status, body) = put(&cluster, "eu", 11, "eu-update", 2.0, 1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 2);
        assert_eq!(body["region_origin"], "eu");

        cluster.stop().await;
    }

    // =============================================================================
    // REPLICATION PATH
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_cross_region_writes_converge() {
        let cluster = Cluster::start();

        put(&cluster, "us", 12, "create", 1.0, 0).await;
        assert!(cluster.wait_for_version("eu", 12, 1).await.is_some());

        // Both regions accept a local update at the same version. The us
        // write is committed before either event reaches the log.
        let us_v2 = cluster
            .node("us")
            .store()
            .conditional_update(
                EntityId(12),
                AttributeUpdate::price(200.0),
                1,
                &RegionId::new("us"),
                Utc::now(),
            )
            .await
            .unwrap()
            .expect("us commits version 2");

        let (eu_status, _) = put(&cluster, "eu", 12, "eu-v2", 300.0, 1).await;
        assert_eq!(eu_status, StatusCode::OK);
        publish(&cluster, us_v2).await;

        assert!(
            cluster
                .wait_for_status("eu", |s| s.applied >= 2)
                .await,
            "eu applies the us write"
        );
        assert!(
            cluster
                .wait_for_status("us", |s| s.stale >= 1)
                .await,
            "us rejects the eu write"
        );

        let in_us = cluster.node("us").store().get_by_id(EntityId(12)).await.unwrap();
        let in_eu = cluster.node("eu").store().get_by_id(EntityId(12)).await.unwrap();
        assert_eq!(in_us, in_eu);

        let winner = in_us.unwrap();
        assert_eq!(winner.version, 2);
        assert_eq!(winner.region_origin.as_str(), "us");
        assert_eq!(winner.price, 200.0);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_out_of_order_events_never_regress() {
        let cluster = Cluster::start();

        publish(&cluster, remote_record(20, 3, 300.0, "eu")).await;
        publish(&cluster, remote_record(20, 2, 200.0, "eu")).await;

        assert!(
            cluster
                .wait_for_status("us", |s| s.applied + s.stale >= 2)
                .await
        );

        let stored = cluster
            .node("us")
            .store()
            .get_by_id(EntityId(20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.price, 300.0);
        assert!(cluster.status("us").stale >= 1);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_poisoned_event_is_skipped() {
        let cluster = Cluster::start();

        cluster
            .log
            .publish(REPLICATION_TOPIC, "21", b"not json".to_vec())
            .await
            .unwrap();
        publish(&cluster, remote_record(22, 1, 1.0, "eu")).await;

        let stored = cluster.wait_for_version("us", 22, 1).await;
        assert!(stored.is_some(), "later events still apply");
        assert!(cluster.status("us").poisoned >= 1);

        cluster.stop().await;
    }
}
