//! Hand-off between discovery and enrichment
//!
//! Discovery pushes into an [`ItemSink`] and enrichment pulls from an
//! [`ItemSource`]. Batch mode uses a plain `Vec` for both ends; streaming
//! mode uses the single-producer/single-consumer queue built by [`handoff`].

use crate::item::DiscoveredItem;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Somewhere discovery can put items as soon as they are found
pub trait ItemSink: Send {
    /// Takes one item. Returns false once nobody will ever read it.
    fn accept(&mut self, item: DiscoveredItem) -> bool;
}

/// Somewhere enrichment can pull items from, in arrival order
#[async_trait]
pub trait ItemSource: Send {
    /// Next item, or `None` once the input is exhausted
    async fn next_item(&mut self) -> Option<DiscoveredItem>;
}

impl ItemSink for Vec<DiscoveredItem> {
    fn accept(&mut self, item: DiscoveredItem) -> bool {
        self.push(item);
        true
    }
}

#[async_trait]
impl ItemSource for std::vec::IntoIter<DiscoveredItem> {
    async fn next_item(&mut self) -> Option<DiscoveredItem> {
        self.next()
    }
}

/// Creates a connected, unbounded FIFO hand-off queue
pub fn handoff() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Producer end of the hand-off queue
#[derive(Debug)]
pub struct HandoffSender {
    tx: mpsc::UnboundedSender<DiscoveredItem>,
}

impl HandoffSender {
    /// Queues an item; gives it back if the consumer is gone
    pub fn push(&self, item: DiscoveredItem) -> Result<(), DiscoveredItem> {
        self.tx.send(item).map_err(|rejected| rejected.0)
    }

    /// Signals end-of-input
    ///
    /// Items already queued are still delivered; the consumer sees `None`
    /// only after draining them.
    pub fn close(self) {
        drop(self.tx);
    }
}

impl ItemSink for HandoffSender {
    fn accept(&mut self, item: DiscoveredItem) -> bool {
        self.push(item).is_ok()
    }
}

/// Consumer end of the hand-off queue
#[derive(Debug)]
pub struct HandoffReceiver {
    rx: mpsc::UnboundedReceiver<DiscoveredItem>,
}

impl HandoffReceiver {
    /// Waits for the next item; `None` after close once the queue is drained
    pub async fn next(&mut self) -> Option<DiscoveredItem> {
        self.rx.recv().await
    }
}

#[async_trait]
impl ItemSource for HandoffReceiver {
    async fn next_item(&mut self) -> Option<DiscoveredItem> {
        self.next().await
    }
}
