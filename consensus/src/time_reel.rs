//! Append-only sink of accepted frames.

use std::sync::{Arc, RwLock};

use pulse_prover::{parent_selector, FrameProver};
use pulse_store::{ClockStore, StoreError};
use pulse_types::{Frame, FrameFilter};

use crate::ConsensusError;

/// Accepts frames in strictly increasing order, persists them with the
/// prover tries in effect, and tracks the head.
///
/// `insert` is the only write path into the clock store for accepted
/// frames.
pub struct TimeReel {
    filter: FrameFilter,
    clock_store: Arc<dyn ClockStore>,
    frame_prover: Arc<dyn FrameProver>,
    head: RwLock<Option<Frame>>,
}

impl TimeReel {
    /// Build a reel over `clock_store`, recovering the head from storage
    /// when frames already exist.
    pub fn new(
        filter: FrameFilter,
        clock_store: Arc<dyn ClockStore>,
        frame_prover: Arc<dyn FrameProver>,
    ) -> Result<Self, ConsensusError> {
        let head = match clock_store.latest_data_clock_frame(&filter) {
            Ok(frame) => Some(frame),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            filter,
            clock_store,
            frame_prover,
            head: RwLock::new(head),
        })
    }

    /// Insert an accepted frame.
    ///
    /// Enforces the ordering invariants: the frame number must be exactly
    /// head + 1, the timestamp must not regress, and the delay witness must
    /// chain to the current head. Frames from untrusted sources are fully
    /// re-verified first.
    pub fn insert(&self, frame: &Frame, trusted_source: bool) -> Result<(), ConsensusError> {
        if frame.filter != self.filter {
            return Err(ConsensusError::FrameRejected(
                "frame is for a different filter".into(),
            ));
        }
        if !trusted_source {
            self.frame_prover
                .verify_data_clock_frame(frame)
                .map_err(|e| ConsensusError::FrameRejected(e.to_string()))?;
        }

        let mut head = self
            .head
            .write()
            .map_err(|_| ConsensusError::Internal("time reel head lock poisoned".into()))?;

        if let Some(current) = head.as_ref() {
            let expected = current.frame_number + 1;
            if frame.frame_number != expected {
                return Err(ConsensusError::FrameOutOfOrder {
                    expected,
                    got: frame.frame_number,
                });
            }
            if frame.timestamp < current.timestamp {
                return Err(ConsensusError::TimestampRegression {
                    previous: current.timestamp,
                    got: frame.timestamp,
                });
            }
            if frame.input.len() >= 36 && frame.input[4..36] != parent_selector(current) {
                return Err(ConsensusError::FrameRejected(
                    "delay witness does not chain to the current head".into(),
                ));
            }
        }

        let tries = self.clock_store.get_prover_tries(&self.filter)?;
        self.clock_store.put_data_clock_frame(frame, &tries)?;
        *head = Some(frame.clone());
        Ok(())
    }

    /// The most recently accepted frame, if any.
    pub fn head(&self) -> Option<Frame> {
        self.head
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }

    pub fn filter(&self) -> &FrameFilter {
        &self.filter
    }
}
