//! Request/response channel between the page context and the capture
//! service.
//!
//! Each request carries its own `oneshot` reply slot, so one request gets
//! exactly one response or a channel-level failure.

use tokio::sync::{mpsc, oneshot};

use crate::protocol::{CaptureRequest, CaptureResponse};

/// A request in flight, as seen by the service.
pub struct CaptureEnvelope {
    pub request: CaptureRequest,
    reply: oneshot::Sender<CaptureResponse>,
}

impl CaptureEnvelope {
    /// Deliver the response. A requester that went away is not an error.
    pub fn respond(self, response: CaptureResponse) {
        if self.reply.send(response).is_err() {
            log::debug!("[CHANNEL] Requester dropped before the response arrived");
        }
    }
}

/// Page-side handle. Cheap to clone.
#[derive(Clone)]
pub struct CaptureClient {
    tx: mpsc::Sender<CaptureEnvelope>,
}

impl CaptureClient {
    pub async fn request(&self, request: CaptureRequest) -> Result<CaptureResponse, ChannelError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(CaptureEnvelope { request, reply })
            .await
            .map_err(|_| ChannelError::Unreachable)?;
        response.await.map_err(|_| ChannelError::Dropped)
    }
}

/// Service-side end.
pub struct CaptureInbox {
    rx: mpsc::Receiver<CaptureEnvelope>,
}

impl CaptureInbox {
    pub async fn recv(&mut self) -> Option<CaptureEnvelope> {
        self.rx.recv().await
    }
}

pub fn capture_channel(capacity: usize) -> (CaptureClient, CaptureInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CaptureClient { tx }, CaptureInbox { rx })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    Unreachable,

    #[error("The message port closed before a response was received.")]
    Dropped,
}
