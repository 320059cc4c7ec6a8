//! Node wiring and the produce/collect tick loop.

use std::sync::Arc;
use std::time::Duration;

use pulse_consensus::{DataClockEngine, EngineOptions, EngineState, TimeReel};
use pulse_crypto::keypair_from_seed;
use pulse_execution::TokenRequest;
use pulse_network::{DirectChannelProvider, FrameService, PeerRegistry};
use pulse_prover::{genesis_frame, DelayFrameProver, MerkleInclusionProver};
use pulse_store::{ClockStore, MemoryClockStore, MemoryCoinStore};
use pulse_types::{FrameFilter, ProverTrie, PublicKey};

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::shutdown::{ShutdownController, ShutdownReason};
use crate::NodeError;

/// Wall-clock spacing between proving ticks.
const FRAME_INTERVAL: Duration = Duration::from_secs(10);

/// Coins minted to the producer each proven frame.
const FRAME_REWARD: u64 = 8;

/// Minimum peer software version accepted by the registry.
const MINIMUM_PEER_VERSION: [u8; 3] = [2, 0, 0];

/// Advertisements stamped at or before this cutoff are dropped
/// (2024-01-01T00:00:00Z).
const MINIMUM_VERSION_CUTOFF_MS: i64 = 1_704_067_200_000;

/// A pulse full node: the consensus engine plus its collaborators, driven
/// by a tick loop.
pub struct PulseNode {
    config: NodeConfig,
    engine: Arc<DataClockEngine>,
    registry: Arc<PeerRegistry>,
    clock_store: Arc<MemoryClockStore>,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
    filter: FrameFilter,
}

impl PulseNode {
    /// Build a node from configuration. The transport is supplied by the
    /// caller; everything else is wired here.
    pub fn new(
        config: NodeConfig,
        channels: Arc<dyn DirectChannelProvider>,
    ) -> Result<Self, NodeError> {
        let filter = FrameFilter::new(config.engine.frame_filter()?);
        let proving_key = Arc::new(keypair_from_seed(&config.engine.proving_key_seed()?));

        let clock_store = Arc::new(MemoryClockStore::new());
        let coin_store = Arc::new(MemoryCoinStore::new());
        let frame_prover = Arc::new(DelayFrameProver::new());
        let inclusion_prover = Arc::new(MerkleInclusionProver::new());
        let registry = Arc::new(PeerRegistry::new(
            MINIMUM_PEER_VERSION.to_vec(),
            MINIMUM_VERSION_CUTOFF_MS,
        ));

        // A full prover admits itself to the trie; light provers follow
        // whoever they are told to trust via `admit_prover`.
        let mut trie = ProverTrie::new();
        if config.engine.full_prover {
            trie.insert(proving_key.public.clone());
        }
        clock_store.put_prover_tries(&filter, vec![trie])?;

        let time_reel = Arc::new(TimeReel::new(
            filter,
            clock_store.clone(),
            frame_prover.clone(),
        )?);
        if time_reel.head().is_none() {
            let genesis = genesis_frame(filter, config.engine.genesis_seed.as_bytes());
            time_reel.insert(&genesis, true)?;
            tracing::info!("seeded genesis frame");
        }

        let engine = Arc::new(DataClockEngine::new(
            EngineOptions {
                filter,
                difficulty: config.engine.difficulty,
                sync_timeout: Duration::from_millis(config.engine.sync_timeout),
                auto_merge_coins: config.engine.auto_merge_coins,
            },
            proving_key,
            registry.clone(),
            channels,
            frame_prover,
            inclusion_prover,
            clock_store.clone(),
            coin_store,
            time_reel,
        ));

        Ok(Self {
            config,
            engine,
            registry,
            clock_store,
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: ShutdownController::new(),
            filter,
        })
    }

    /// Admit another producer key to the active prover trie. Light provers
    /// use this to trust the clock's leaders.
    pub fn admit_prover(&self, key: PublicKey) -> Result<(), NodeError> {
        let mut tries = self.clock_store.get_prover_tries(&self.filter)?;
        if tries.is_empty() {
            tries.push(ProverTrie::new());
        }
        tries[0].insert(key);
        self.clock_store.put_prover_tries(&self.filter, tries)?;
        Ok(())
    }

    /// The frame service answering `"sync"` channels from this node's
    /// clock store. The transport layer spawns it per inbound channel.
    pub fn frame_service(&self) -> FrameService {
        FrameService::new(self.filter, self.clock_store.clone())
    }

    /// Drive the clock until shutdown or the configured frame limit.
    ///
    /// Each tick: collect from ahead peers; if this node is a permitted
    /// producer, stage the round's reward and prove the next frame.
    pub async fn run(&self) -> Result<(), NodeError> {
        self.engine.set_state(EngineState::Running);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(FRAME_INTERVAL);
        let mut produced: u64 = 0;

        loop {
            tokio::select! {
                cause = shutdown_rx.recv() => {
                    if let Ok(reason) = cause {
                        tracing::info!(%reason, "stopping clock");
                    }
                    break;
                }
                _ = interval.tick() => {}
            }
            if self.engine.get_state() >= EngineState::Stopping || self.shutdown.is_requested() {
                break;
            }

            let peers = self.registry.cooperative_count();
            self.metrics.cooperative_peers.set(peers as i64);
            self.metrics
                .uncooperative_peers
                .set(self.registry.uncooperative_count() as i64);
            if peers < self.config.engine.minimum_peers_required {
                tracing::debug!(
                    peers,
                    required = self.config.engine.minimum_peers_required,
                    "waiting for more peers before participating"
                );
                continue;
            }

            let Some(head) = self.engine.time_reel().head() else {
                continue;
            };
            let before = head.frame_number;
            let head = match self.engine.collect(head).await {
                Ok(latest) => latest,
                Err(e) => {
                    tracing::warn!(error = %e, "collect failed");
                    self.metrics.sync_errors.inc();
                    continue;
                }
            };
            if head.frame_number > before {
                self.metrics
                    .frames_synced
                    .inc_by(head.frame_number - before);
            }
            self.metrics.head_frame_number.set(head.frame_number as i64);

            if !self.config.engine.full_prover {
                continue;
            }
            if !self.engine.is_in_prover_trie(self.engine.public_key())? {
                continue;
            }

            self.engine.stage_transaction(TokenRequest::Mint {
                owner: self.engine.public_key().clone(),
                amount: FRAME_REWARD,
            })?;
            self.metrics.transactions_staged.inc();

            let started = std::time::Instant::now();
            let frame = match self.engine.prove(&head) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "proving round failed");
                    continue;
                }
            };
            self.metrics
                .prove_duration_ms
                .observe(started.elapsed().as_millis() as f64);

            if frame.frame_number > head.frame_number {
                // Our own output goes through full re-verification too; a
                // frame that fails its own witness must never reach peers.
                self.engine.time_reel().insert(&frame, false)?;
                produced += 1;
                self.metrics.frames_proved.inc();
                self.metrics.head_frame_number.set(frame.frame_number as i64);

                let max_frames = self.config.engine.max_frames;
                if max_frames != 0 && produced >= max_frames {
                    tracing::info!(produced, "reached configured frame limit, halting");
                    self.shutdown.request(ShutdownReason::FrameLimit);
                    break;
                }
            }
        }

        self.engine.set_state(EngineState::Stopped);
        tracing::info!("node run loop exited");
        Ok(())
    }

    /// Signal the run loop to stop on behalf of the embedding process.
    pub fn stop(&self) {
        self.engine.set_state(EngineState::Stopping);
        self.shutdown.request(ShutdownReason::Operator);
    }

    pub fn engine(&self) -> &Arc<DataClockEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }
}
