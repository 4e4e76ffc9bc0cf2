//! Broadcast message channel between the page context (producer) and the
//! extension context (consumer).
//!
//! Only serialized JSON values travel on the bus, so each side always works
//! on its own copy. Every endpoint also hears its own posts and drops them.

use crate::config::EngineConfig;
use crate::domain::model::Snapshot;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextId {
    /// Page context: interception, page state, on-demand queries.
    Page,
    /// Extension context: renders badges from snapshots.
    Extension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Full accumulated state; receivers replace their view with it.
    #[serde(rename = "DATA_UPDATED", rename_all = "camelCase")]
    DataUpdated {
        snapshot: Snapshot,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        in_reply_to: Option<u64>,
    },
    /// Fire-and-forget; answered only through a later `DATA_UPDATED`.
    #[serde(rename = "REQUEST_DATA", rename_all = "camelCase")]
    RequestData {
        request_id: u64,
        identifiers: Vec<String>,
    },
    #[serde(rename = "EXTRACT_PAGE_DATA")]
    ExtractPageData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    origin: ContextId,
    message: Message,
}

/// The shared medium both contexts post to.
#[derive(Debug, Clone)]
pub struct ContextBus {
    tx: broadcast::Sender<Value>,
}

impl ContextBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.channel.capacity)
    }

    pub fn endpoint(&self, origin: ContextId) -> Endpoint {
        Endpoint {
            origin,
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }

    /// Posts an arbitrary value, as unrelated scripts on the page do.
    pub fn post_raw(&self, value: Value) -> usize {
        self.tx.send(value).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Endpoint {
    origin: ContextId,
    tx: broadcast::Sender<Value>,
    rx: broadcast::Receiver<Value>,
}

impl Endpoint {
    pub fn origin(&self) -> ContextId {
        self.origin
    }

    /// At-most-once: a post nobody hears is lost, not an error.
    pub fn send(&self, message: Message) -> Result<()> {
        let envelope = serde_json::to_value(Envelope {
            origin: self.origin,
            message,
        })?;

        match self.tx.send(envelope) {
            Ok(listeners) => tracing::trace!("posted message to {} listeners", listeners),
            Err(_) => tracing::debug!("no listeners on the bus; message dropped"),
        }
        Ok(())
    }

    /// Next message from the other context. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(value) => {
                    if let Some(message) = self.accept(value) {
                        return Some(message);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // 下一個 snapshot 會補回遺失的狀態
                    tracing::warn!("⚠️ {:?} endpoint lagged, {} messages skipped", self.origin, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Endpoint::recv`].
    pub fn try_recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => {
                    if let Some(message) = self.accept(value) {
                        return Some(message);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("⚠️ {:?} endpoint lagged, {} messages skipped", self.origin, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    fn accept(&self, value: Value) -> Option<Message> {
        match serde_json::from_value::<Envelope>(value) {
            Ok(envelope) if envelope.origin == self.origin => None,
            Ok(envelope) => Some(envelope.message),
            Err(e) => {
                tracing::trace!("ignoring foreign message: {}", e);
                None
            }
        }
    }
}
