use crate::core::channel::{ContextBus, ContextId, Endpoint, Message};
use crate::domain::model::{Snapshot, Venue};
use crate::utils::error::Result;
use std::collections::HashSet;

/// What the render layer needs to draw one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub venue: Venue,
    pub label: &'static str,
    pub title: &'static str,
}

impl Badge {
    pub fn for_venue(venue: Venue) -> Self {
        match venue {
            Venue::Getgems => Badge {
                venue,
                label: "Listed on Getgems",
                title: "Listed on Getgems (0.3 TON fee)",
            },
            Venue::Fragment => Badge {
                venue,
                label: "Listed on Fragment",
                title: "Listed on Fragment (no fee)",
            },
        }
    }
}

/// Extension-side view of the attributions.
///
/// Keeps only the latest snapshot received; every `DATA_UPDATED` replaces it
/// wholesale.
#[derive(Debug)]
pub struct ConsumerView {
    endpoint: Endpoint,
    view: Snapshot,
    next_request_id: u64,
}

impl ConsumerView {
    pub fn new(bus: &ContextBus) -> Self {
        Self {
            endpoint: bus.endpoint(ContextId::Extension),
            view: Snapshot::default(),
            next_request_id: 1,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.view
    }

    /// Applies one message; true when the view was replaced.
    pub fn apply(&mut self, message: Message) -> bool {
        match message {
            Message::DataUpdated { snapshot, .. } => {
                tracing::debug!("Received NFT data: {} items", snapshot.len());
                self.view = snapshot;
                true
            }
            _ => false,
        }
    }

    /// Waits for the next snapshot. `None` once the bus is gone.
    pub async fn next_update(&mut self) -> Option<&Snapshot> {
        loop {
            let message = self.endpoint.recv().await?;
            if self.apply(message) {
                return Some(&self.view);
            }
        }
    }

    /// Applies everything already queued without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.endpoint.try_recv() {
            if self.apply(message) {
                applied += 1;
            }
        }
        applied
    }

    pub fn badge_for(&self, item_id: &str) -> Option<Badge> {
        self.view
            .get(item_id)
            .map(|record| Badge::for_venue(record.venue))
    }

    /// Observed identifiers with no attribution yet, first occurrence order.
    pub fn missing<'a, I>(&self, observed: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        observed
            .into_iter()
            .filter(|id| !self.view.contains(id) && seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    /// Sends `REQUEST_DATA` for observed items that are still unattributed.
    /// Returns the request id, or `None` when nothing was missing.
    pub fn request_missing<'a, I>(&mut self, observed: I) -> Result<Option<u64>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let identifiers = self.missing(observed);
        if identifiers.is_empty() {
            return Ok(None);
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        tracing::info!("Found {} unmarked NFTs, requesting data...", identifiers.len());
        self.endpoint.send(Message::RequestData {
            request_id,
            identifiers,
        })?;
        Ok(Some(request_id))
    }

    pub fn request_page_extraction(&self) -> Result<()> {
        self.endpoint.send(Message::ExtractPageData)
    }
}
