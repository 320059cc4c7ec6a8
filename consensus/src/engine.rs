//! The consensus engine: composition root and proving pipeline.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pulse_crypto::shake256_expand;
use pulse_execution::{
    TokenApplication, TokenRequest, DEFAULT_AUTO_MERGE_THRESHOLD, TOKEN_ADDRESS,
};
use pulse_network::{DirectChannelProvider, PeerRegistry};
use pulse_prover::{FrameProver, InclusionProver};
use pulse_store::{ClockStore, CoinStore};
use pulse_types::{
    now_millis, Frame, FrameFilter, InclusionAggregateProof, InclusionCommitment,
    IntrinsicExecutionOutput, KeyPair, PublicKey, WeightedPeerCandidate, EXPANSION_BYTES,
    INCLUSION_CHUNK_BYTES, INTRINSIC_EXECUTION_OUTPUT_TYPE,
};

use crate::state::{EngineState, SyncStatus};
use crate::time_reel::TimeReel;
use crate::ConsensusError;

/// Engine-level knobs. The node crate maps its configuration file onto
/// this.
pub struct EngineOptions {
    pub filter: FrameFilter,
    /// Delay difficulty; 0 selects the prover's default.
    pub difficulty: u32,
    /// Per-frame sync request deadline; zero selects the 4 s default.
    pub sync_timeout: Duration,
    /// Post-mint coin merging.
    pub auto_merge_coins: bool,
}

/// Composes the provers, registry, stores, and time reel; owns the staging
/// buffer and the latest-proven watermark.
pub struct DataClockEngine {
    filter: FrameFilter,
    difficulty: u32,
    pub(crate) sync_timeout: Duration,
    auto_merge_threshold: Option<usize>,
    proving_key: Arc<KeyPair>,
    pub(crate) registry: Arc<PeerRegistry>,
    pub(crate) channels: Arc<dyn DirectChannelProvider>,
    pub(crate) frame_prover: Arc<dyn FrameProver>,
    inclusion_prover: Arc<dyn InclusionProver>,
    clock_store: Arc<dyn ClockStore>,
    coin_store: Arc<dyn CoinStore>,
    pub(crate) time_reel: Arc<TimeReel>,
    staged_transactions: Mutex<Option<Vec<TokenRequest>>>,
    /// Serializes proving rounds; the staging mutex alone must not be held
    /// across the delay proof.
    round_mx: Mutex<()>,
    last_proven: AtomicU64,
    pub(crate) latest_frame_received: AtomicU64,
    state: AtomicU8,
    sync_status: AtomicU8,
}

impl DataClockEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: EngineOptions,
        proving_key: Arc<KeyPair>,
        registry: Arc<PeerRegistry>,
        channels: Arc<dyn DirectChannelProvider>,
        frame_prover: Arc<dyn FrameProver>,
        inclusion_prover: Arc<dyn InclusionProver>,
        clock_store: Arc<dyn ClockStore>,
        coin_store: Arc<dyn CoinStore>,
        time_reel: Arc<TimeReel>,
    ) -> Self {
        Self {
            filter: options.filter,
            difficulty: options.difficulty,
            sync_timeout: options.sync_timeout,
            auto_merge_threshold: options
                .auto_merge_coins
                .then_some(DEFAULT_AUTO_MERGE_THRESHOLD),
            proving_key,
            registry,
            channels,
            frame_prover,
            inclusion_prover,
            clock_store,
            coin_store,
            time_reel,
            staged_transactions: Mutex::new(None),
            round_mx: Mutex::new(()),
            last_proven: AtomicU64::new(0),
            latest_frame_received: AtomicU64::new(0),
            state: AtomicU8::new(EngineState::Starting as u8),
            sync_status: AtomicU8::new(SyncStatus::Idle as u8),
        }
    }

    // -- State -----------------------------------------------------------------

    pub fn get_state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn get_sync_status(&self) -> SyncStatus {
        SyncStatus::from_u8(self.sync_status.load(Ordering::Acquire))
    }

    pub(crate) fn set_sync_status(&self, status: SyncStatus) {
        self.sync_status.store(status as u8, Ordering::Release);
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.proving_key.public
    }

    pub fn time_reel(&self) -> &Arc<TimeReel> {
        &self.time_reel
    }

    // -- Staging ---------------------------------------------------------------

    /// Stage a transaction request for the next proving round.
    pub fn stage_transaction(&self, request: TokenRequest) -> Result<(), ConsensusError> {
        let mut staged = self
            .staged_transactions
            .lock()
            .map_err(|_| ConsensusError::Internal("staging buffer lock poisoned".into()))?;
        staged.get_or_insert_with(Vec::new).push(request);
        Ok(())
    }

    /// Number of requests currently staged.
    pub fn staged_count(&self) -> usize {
        self.staged_transactions
            .lock()
            .map(|staged| staged.as_ref().map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    // -- Peer selection --------------------------------------------------------

    /// Cooperative peers claiming a head past `head`, weighted and
    /// shuffled. Empty when the local key is in the active prover trie:
    /// the node leads, it does not follow.
    pub fn get_ahead_peers(&self, head: u64) -> Vec<WeightedPeerCandidate> {
        match self.clock_store.get_prover_tries(&self.filter) {
            Ok(tries) => {
                if tries
                    .first()
                    .is_some_and(|trie| trie.contains(&self.proving_key.public))
                {
                    return Vec::new();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not load prover tries for peer selection");
            }
        }
        tracing::debug!(
            peers = self.registry.cooperative_count(),
            uncooperative_peers = self.registry.uncooperative_count(),
            current_head_frame = head,
            "checking peer list"
        );
        self.registry.ahead_peers(head, &mut rand::thread_rng())
    }

    /// Whether `key` may produce frames for this filter.
    pub fn is_in_prover_trie(&self, key: &PublicKey) -> Result<bool, ConsensusError> {
        let tries = self.clock_store.get_prover_tries(&self.filter)?;
        Ok(tries.iter().any(|trie| trie.contains(key)))
    }

    // -- Proving ---------------------------------------------------------------

    /// Produce exactly one successor frame for `previous`.
    ///
    /// Re-entry short-circuits: once a round has proven past
    /// `previous.frame_number`, later calls return `previous` unchanged.
    /// Concurrent calls serialize on the round mutex, so the loser of a
    /// race observes the watermark and short-circuits.
    pub fn prove(&self, previous: &Frame) -> Result<Frame, ConsensusError> {
        let _round = self
            .round_mx
            .lock()
            .map_err(|_| ConsensusError::Internal("round lock poisoned".into()))?;
        let last_proven = self.last_proven.load(Ordering::Acquire);
        if last_proven >= previous.frame_number && last_proven != 0 {
            return Ok(previous.clone());
        }

        let mut staged_guard = self
            .staged_transactions
            .lock()
            .map_err(|_| ConsensusError::Internal("staging buffer lock poisoned".into()))?;

        let (_, tries) = self
            .clock_store
            .get_data_clock_frame(&self.filter, previous.frame_number)
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;

        let app = match TokenApplication::materialize_from_frame(
            previous,
            &tries,
            self.coin_store.clone(),
            self.auto_merge_threshold,
        ) {
            Ok(app) => app,
            Err(e) => {
                drop(staged_guard);
                return Err(ConsensusError::Prove(e.to_string()));
            }
        };

        if staged_guard.is_none() {
            *staged_guard = Some(Vec::new());
        }
        let staged = staged_guard.take().unwrap_or_default();
        tracing::info!(transactions = staged.len(), "proving new frame");

        let (app, valid, invalid) =
            match app.apply_transitions(previous.frame_number + 1, staged, true) {
                Ok(result) => result,
                Err(e) => {
                    *staged_guard = Some(Vec::new());
                    drop(staged_guard);
                    return Err(ConsensusError::Prove(e.to_string()));
                }
            };
        tracing::info!(
            successful = valid.len(),
            failed = invalid.len(),
            "applied transitions"
        );
        // Producers must be able to stage again before the expensive
        // proving below begins.
        *staged_guard = Some(Vec::new());
        drop(staged_guard);

        let output_state = app
            .materialize_state()
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;
        let execution_output = IntrinsicExecutionOutput {
            address: TOKEN_ADDRESS,
            output: TokenApplication::serialize_state(&output_state)
                .map_err(|e| ConsensusError::Prove(e.to_string()))?,
            proof: TokenApplication::serialize_requests(&valid)
                .map_err(|e| ConsensusError::Prove(e.to_string()))?,
        };
        let data = bincode::serialize(&execution_output)
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;
        tracing::debug!("encoded execution output");

        let expand = shake256_expand(&data, EXPANSION_BYTES);
        let commitment = self
            .inclusion_prover
            .commit_raw(&expand, INCLUSION_CHUNK_BYTES)
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;
        tracing::debug!("creating inclusion proof");
        // The opening position must be replayable from the expansion alone.
        let position = (expand[0] % 16) as usize;
        let proof = self
            .inclusion_prover
            .prove_raw(&expand, position, INCLUSION_CHUNK_BYTES)
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;

        tracing::debug!("finalizing execution proof");
        let frame_number = previous.frame_number + 1;
        let aggregate = InclusionAggregateProof {
            filter: self.filter,
            frame_number,
            inclusion_commitments: vec![InclusionCommitment {
                filter: self.filter,
                frame_number,
                type_url: INTRINSIC_EXECUTION_OUTPUT_TYPE.to_string(),
                commitment,
                data,
                position: 0,
            }],
            proof: proof.clone(),
        };
        let frame = self
            .frame_prover
            .prove_data_clock_frame(
                previous,
                &[proof],
                vec![aggregate],
                &self.proving_key,
                now_millis(),
                self.difficulty,
            )
            .map_err(|e| ConsensusError::Prove(e.to_string()))?;

        self.last_proven
            .store(previous.frame_number, Ordering::Release);
        tracing::info!(
            frame_number = frame.frame_number,
            proof_count = frame.aggregate_proofs.len(),
            commitment_count = frame.commitment_record_count(),
            "returning new proven frame"
        );
        Ok(frame)
    }
}
