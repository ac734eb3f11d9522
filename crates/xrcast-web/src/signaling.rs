//! In-process signaling: every channel forwards into one host-side receiver.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

use crate::{
    webrtc::{SignalingChannel, SignalingConnector},
    WebError, WebResult,
};

/// A message a channel sent towards its headset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSignal {
    pub endpoint: String,
    pub text: String,
}

#[derive(Clone)]
pub struct LocalSignaling {
    tx: mpsc::UnboundedSender<OutboundSignal>,
}

impl LocalSignaling {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalingConnector for LocalSignaling {
    fn connect<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> BoxFuture<'a, WebResult<Arc<dyn SignalingChannel>>> {
        async move {
            if endpoint.trim().is_empty() {
                return Err(WebError::Signaling("empty signaling endpoint".into()));
            }
            let channel: Arc<dyn SignalingChannel> = Arc::new(LocalChannel {
                endpoint: endpoint.to_string(),
                tx: self.tx.clone(),
            });
            Ok(channel)
        }
        .boxed()
    }
}

struct LocalChannel {
    endpoint: String,
    tx: mpsc::UnboundedSender<OutboundSignal>,
}

impl SignalingChannel for LocalChannel {
    fn send(&self, text: String) -> WebResult<()> {
        self.tx
            .send(OutboundSignal {
                endpoint: self.endpoint.clone(),
                text,
            })
            .map_err(|_| WebError::Signaling(format!("channel {} closed", self.endpoint)))
    }
}
