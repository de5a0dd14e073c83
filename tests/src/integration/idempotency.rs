//! # Idempotency Scenarios
//!
//! Client retries carry the same request id. Exactly one attempt commits;
//! the rest are rejected without touching the store or the log.

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use shared_bus::REPLICATION_TOPIC;
    use shared_types::EntityId;

    use crate::integration::harness::{put, put_request, send, Cluster};

    #[tokio::test]
    async fn test_concurrent_duplicate_commits_once() {
        let cluster = Cluster::start();
        put(&cluster, "us", 3, "create-3", 100.0, 0).await;

        let (first, second) = tokio::join!(
            put(&cluster, "us", 3, "update-3", 110.0, 1),
            put(&cluster, "us", 3, "update-3", 110.0, 1),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort();
        assert_eq!(
            statuses,
            [StatusCode::OK, StatusCode::UNPROCESSABLE_ENTITY]
        );

        let record = cluster
            .node("us")
            .store()
            .get_by_id(EntityId(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(cluster.log.len(REPLICATION_TOPIC), 2);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_retry_after_commit_is_rejected() {
        let cluster = Cluster::start();

        let (status, _) = put(&cluster, "us", 8, "req-8", 50.0, 0).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = put(&cluster, "us", 8, "req-8", 50.0, 0).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("req-8"));
        assert_eq!(cluster.log.len(REPLICATION_TOPIC), 1);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_request_ids_are_scoped_per_region() {
        let cluster = Cluster::start();

        let (status, _) = put(&cluster, "us", 1, "shared-id", 1.0, 0).await;
        assert_eq!(status, StatusCode::OK);

        // Each region guards its own command stream.
        let (status, _) = put(&cluster, "eu", 2, "shared-id", 2.0, 0).await;
        assert_eq!(status, StatusCode::OK);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_missing_request_id_is_rejected_before_anything_else() {
        let cluster = Cluster::start();

        let (status, _) = send(
            cluster.router("us"),
            put_request(4, None, json!({ "price": 1.0, "version": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Even a malformed body reports the missing header.
        let (status, body) = send(cluster.router("us"), put_request(4, None, json!("junk"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().to_lowercase().contains("request"));

        assert!(cluster.node("us").guard().is_empty());
        assert_eq!(cluster.log.len(REPLICATION_TOPIC), 0);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_failed_write_releases_request_id() {
        let cluster = Cluster::start();

        // Version conflict: nothing committed, so the id may be reused.
        let (status, _) = put(&cluster, "us", 6, "req-6", 1.0, 5).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = put(&cluster, "us", 6, "req-6", 1.0, 0).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);

        cluster.stop().await;
    }
}
