//! The sync engine: drive the local head toward the highest advertised
//! frame, one frame at a time, over per-peer unicast channels.

use std::sync::atomic::Ordering;
use std::time::Duration;

use pulse_network::{DirectChannel, SYNC_CHANNEL_PURPOSE};
use pulse_types::{millis_since, now_millis, Frame, PeerId};

use crate::engine::DataClockEngine;
use crate::state::{EngineState, SyncStatus};
use crate::ConsensusError;

/// Per-frame request deadline applied when the configured timeout is zero.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(4);

impl DataClockEngine {
    /// Pull from ahead peers until none remain.
    ///
    /// Candidates are drawn once per outer pass; peers learned mid-pass
    /// wait for the next pass. Per-candidate failures are logged and the
    /// pass moves on — partial progress is always kept.
    pub async fn collect(&self, enqueued: Frame) -> Result<Frame, ConsensusError> {
        tracing::info!("collecting delay proofs");

        let mut latest = enqueued;
        loop {
            if self.get_state() >= EngineState::Stopping {
                break;
            }
            let head = latest
                .frame_number
                .max(self.latest_frame_received.load(Ordering::Acquire));
            let candidates = self.get_ahead_peers(head);
            if candidates.is_empty() {
                break;
            }
            for candidate in candidates {
                let head = latest
                    .frame_number
                    .max(self.latest_frame_received.load(Ordering::Acquire));
                if candidate.max_frame <= head {
                    continue;
                }
                let (progressed, result) = self
                    .sync_from_peer(latest, candidate.max_frame, &candidate.peer_id)
                    .await;
                latest = progressed;
                if let Err(e) = result {
                    tracing::debug!(error = %e, "error syncing frame");
                }
            }
        }

        tracing::info!(
            frame_number = latest.frame_number,
            frame_age_ms = millis_since(latest.timestamp),
            "returning leader frame"
        );
        Ok(latest)
    }

    /// Pull frames from one peer until it stops being ahead of `max_frame`,
    /// violates protocol, or errors.
    ///
    /// Always returns whatever progress was made. Protocol violations
    /// demote the peer; a failed cryptographic verification surfaces a hard
    /// error without demoting, since the peer may be forwarding a frame it
    /// received in good faith.
    pub async fn sync_from_peer(
        &self,
        latest: Frame,
        max_frame: u64,
        peer_id: &PeerId,
    ) -> (Frame, Result<(), ConsensusError>) {
        self.set_sync_status(SyncStatus::Synchronizing);
        let mut latest = latest;
        let mut cooperative = true;
        let result = self
            .pull_frames(&mut latest, max_frame, peer_id, &mut cooperative)
            .await;
        if !cooperative {
            self.registry.mark_uncooperative(peer_id, now_millis());
        }
        self.set_sync_status(SyncStatus::Idle);
        (latest, result)
    }

    async fn pull_frames(
        &self,
        latest: &mut Frame,
        max_frame: u64,
        peer_id: &PeerId,
        cooperative: &mut bool,
    ) -> Result<(), ConsensusError> {
        tracing::info!(
            peer_id = %peer_id,
            current_frame = latest.frame_number,
            max_frame,
            "polling peer for new frames"
        );

        let mut channel: DirectChannel =
            match self.channels.open(peer_id, SYNC_CHANNEL_PURPOSE) {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::debug!(error = %e, "could not establish direct channel");
                    *cooperative = false;
                    return Err(ConsensusError::Sync(e.to_string()));
                }
            };

        let timeout = if self.sync_timeout.is_zero() {
            DEFAULT_SYNC_TIMEOUT
        } else {
            self.sync_timeout
        };

        let result = loop {
            if self.get_state() >= EngineState::Stopping {
                break Ok(());
            }
            let request = channel.request_frame(latest.frame_number + 1);
            let response = match tokio::time::timeout(timeout, request).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "could not get frame");
                    *cooperative = false;
                    break Err(ConsensusError::Sync(e.to_string()));
                }
                Err(_) => {
                    tracing::debug!("frame request timed out");
                    *cooperative = false;
                    break Err(ConsensusError::Sync("frame request timed out".into()));
                }
            };

            let Some(frame) = response.frame else {
                tracing::debug!("received empty response from peer");
                *cooperative = false;
                break Ok(());
            };
            if frame.frame_number != latest.frame_number + 1
                || frame.timestamp < latest.timestamp
            {
                tracing::debug!(
                    frame_number = frame.frame_number,
                    "received invalid response from peer"
                );
                *cooperative = false;
                break Ok(());
            }
            tracing::info!(
                frame_number = frame.frame_number,
                frame_age_ms = millis_since(frame.timestamp),
                "received new leading frame"
            );
            match self.is_in_prover_trie(&frame.public_key_signature.public_key) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("frame producer is not in the prover trie");
                    *cooperative = false;
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
            if let Err(e) = self.frame_prover.verify_data_clock_frame(&frame) {
                break Err(ConsensusError::Sync(e.to_string()));
            }

            if let Err(e) = self.time_reel.insert(&frame, true) {
                break Err(e);
            }
            self.latest_frame_received
                .fetch_max(frame.frame_number, Ordering::AcqRel);
            *latest = frame;
            if latest.frame_number >= max_frame {
                break Ok(());
            }
        };

        channel.close();
        result
    }
}
