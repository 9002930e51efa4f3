//! Outbound messages to the host process

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Message posted to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Open an exported image; `payload` is a `data:image/png` reference
    OpenImage { payload: String },
}

impl HostMessage {
    /// Serialize for a JSON message channel
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fire-and-forget channel to the host
pub trait HostChannel {
    /// Post a message; no acknowledgement is awaited
    fn post(&self, message: HostMessage);
}

impl HostChannel for UnboundedSender<HostMessage> {
    fn post(&self, message: HostMessage) {
        if self.send(message).is_err() {
            log::debug!("Host channel closed, message dropped");
        }
    }
}
