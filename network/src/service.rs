//! Server side of the frame sync service.

use std::sync::Arc;

use pulse_store::ClockStore;
use pulse_types::FrameFilter;

use crate::channel::ChannelServer;
use crate::wire::FrameResponse;

/// Answers `"sync"` channel requests from the local clock store.
pub struct FrameService {
    filter: FrameFilter,
    clock_store: Arc<dyn ClockStore>,
}

impl FrameService {
    pub fn new(filter: FrameFilter, clock_store: Arc<dyn ClockStore>) -> Self {
        Self {
            filter,
            clock_store,
        }
    }

    /// Serve one channel until the requester goes away. Frames the store
    /// does not hold produce empty responses.
    pub async fn serve(&self, mut server: ChannelServer) {
        while let Some(request) = server.request_rx.recv().await {
            let frame = self
                .clock_store
                .get_data_clock_frame(&self.filter, request.frame_number)
                .map(|(frame, _)| frame)
                .ok();
            let response = FrameResponse { frame };
            let response = match response.encode() {
                Ok(_) => response,
                Err(e) => {
                    tracing::warn!(
                        frame_number = request.frame_number,
                        error = %e,
                        "refusing oversized sync response"
                    );
                    FrameResponse { frame: None }
                }
            };
            if server.response_tx.send(response).await.is_err() {
                break;
            }
        }
    }
}
