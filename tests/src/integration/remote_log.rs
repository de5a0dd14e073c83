//! # Separate-Process Scenarios
//!
//! Two node runtimes, one region each, as they run in production: `us`
//! hosts the replication log and `eu` joins it over HTTP.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::http::StatusCode;
    use node_runtime::{parse_regions, LogConfig, NodeConfig, NodeRuntime};
    use serde_json::json;
    use shared_types::EntityId;

    use crate::integration::harness::{get_request, put_request, send, test_config};

    struct Pair {
        host: NodeRuntime,
        peer: NodeRuntime,
    }

    fn node_config(region: &str, log: LogConfig) -> NodeConfig {
        NodeConfig {
            regions: parse_regions(&format!("{region}=127.0.0.1:0")).unwrap(),
            log,
            ..test_config()
        }
    }

    fn start_pair() -> Pair {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let log_addr: SocketAddr = ([127, 0, 0, 1], port).into();

        let host = NodeRuntime::new(node_config(
            "us",
            LogConfig {
                listen: Some(log_addr),
                url: None,
            },
        ))
        .unwrap();
        let peer = NodeRuntime::new(node_config(
            "eu",
            LogConfig {
                listen: None,
                url: Some(format!("http://{log_addr}")),
            },
        ))
        .unwrap();

        host.start();
        peer.start();
        Pair { host, peer }
    }

    impl Pair {
        async fn put(
            &self,
            region: &str,
            id: u64,
            request_id: &str,
            version: u64,
        ) -> (StatusCode, serde_json::Value) {
            let runtime = if region == "us" { &self.host } else { &self.peer };
            let router = runtime.region(region).unwrap().router();
            send(
                router,
                put_request(id, Some(request_id), json!({ "price": 1.0, "version": version })),
            )
            .await
        }

        async fn wait_for_version(&self, region: &str, id: u64, version: u64) -> bool {
            let runtime = if region == "us" { &self.host } else { &self.peer };
            let store = runtime.region(region).unwrap().store();
            for _ in 0..600 {
                if let Ok(Some(record)) = store.get_by_id(EntityId(id)).await {
                    if record.version >= version {
                        return true;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            false
        }

        async fn stop(self) {
            self.peer.shutdown().await;
            self.host.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_writes_cross_between_processes() {
        let pair = start_pair();

        let (status, _) = pair.put("us", 1, "us-1", 0).await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair.wait_for_version("eu", 1, 1).await, "us write reaches eu");

        let (status, body) = pair.put("eu", 1, "eu-1", 1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["region_origin"], "eu");
        assert!(pair.wait_for_version("us", 1, 2).await, "eu write reaches us");

        let router = pair.host.region("us").unwrap().router();
        let (_, record) = send(router, get_request("/entities/1")).await;
        assert_eq!(record["version"], 2);
        assert_eq!(record["region_origin"], "eu");

        pair.stop().await;
    }

    #[tokio::test]
    async fn test_peer_reports_unreplicated_write_while_host_log_is_down() {
        let pair = start_pair();
        let (status, _) = pair.put("us", 2, "warm-up", 0).await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair.wait_for_version("eu", 2, 1).await);

        let log = pair.host.local_log().unwrap().clone();
        log.set_available(false);

        let (status, body) = pair.put("eu", 3, "during-outage", 0).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["replicated"], false);

        log.set_available(true);
        let (status, _) = pair.put("us", 2, "after-outage", 1).await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair.wait_for_version("eu", 2, 2).await, "eu catches up");

        pair.stop().await;
    }
}
