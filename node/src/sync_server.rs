//! Server side of the blockchain sync handshake (§4.7).
//!
//! Grounded on `examples/original_source/node.go`'s `syncBlockchain`.

use ledger::canonical_json;
use ledger::wire::Connection;
use tracing::{info, warn};

use crate::state::SharedState;

/// Handles an inbound `SyncBlockchain` request whose body is the remote
/// peer's current height as a decimal string.
pub async fn handle_sync(state: &SharedState, conn: &mut Connection, body: String) {
    let Ok(remote_height) = body.trim().parse::<u64>() else {
        warn!(body = %body, "malformed SyncBlockchain request body");
        return;
    };

    let local_count = match state.store.count() {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "failed to read local height while serving sync");
            return;
        }
    };
    let local_height = local_count.saturating_sub(1);

    if conn.write_line("Okay").await.is_err() {
        warn!("failed to ack sync request");
        return;
    }

    if local_count == 0 || remote_height >= local_height {
        return;
    }

    for index in (remote_height + 1)..=local_height {
        let block = match state.store.load(index) {
            Ok(Some(block)) => block,
            Ok(None) => {
                warn!(index, "local store missing a block while serving sync");
                return;
            }
            Err(e) => {
                warn!(index, error = %e, "failed to load block while serving sync");
                return;
            }
        };

        if conn.write_line(&canonical_json(&block)).await.is_err() {
            warn!(index, "failed to send block during sync");
            return;
        }

        match conn.read_line().await {
            Ok(ack) if ack == "Okay" => {}
            _ => {
                warn!(index, "peer did not ack synced block, aborting");
                return;
            }
        }
    }

    info!(from = remote_height, to = local_height, "served sync");
}
