//! Coordinator supervision.
//!
//! The coordinator loop already recovers from transport failures on its
//! own. The supervisor covers the rest: a panic inside the loop is logged
//! and the loop respawned, so one bad record cannot stop replication for
//! the life of the process.

use std::sync::Arc;
use std::time::Duration;

use rr_03_replication::ReplicationCoordinator;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Pause before respawning a panicked coordinator.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Run `coordinator` until shutdown, respawning it after a panic.
///
/// # Returns
///
/// The number of restarts performed.
pub async fn supervise_coordinator(
    coordinator: Arc<ReplicationCoordinator>,
    mut shutdown: watch::Receiver<bool>,
    restart_delay: Duration,
) -> u32 {
    let region = coordinator.config().region.clone();
    let mut restarts = 0u32;

    loop {
        let task = {
            let coordinator = Arc::clone(&coordinator);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { coordinator.run(shutdown).await })
        };

        match task.await {
            Ok(()) => {
                info!(region = %region, restarts, "Replication coordinator stopped");
                return restarts;
            }
            Err(e) if e.is_panic() => {
                if *shutdown.borrow() {
                    return restarts;
                }
                restarts += 1;
                error!(
                    region = %region,
                    restarts,
                    "Replication coordinator panicked, restarting"
                );
            }
            Err(e) => {
                warn!(region = %region, error = %e, "Replication coordinator task cancelled");
                return restarts;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = shutdown.changed() => {
                return restarts;
            }
        }
    }
}
