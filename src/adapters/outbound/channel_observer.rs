use crate::domains::bridge::{BridgeEvent, DynObserver, GateObserver};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Forwards gate events to an async consumer. The channel is unbounded so the
/// gate never blocks while holding its lock; a closed receiver drops events.
struct ChannelObserver {
    sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl GateObserver for ChannelObserver {
    fn on_event(&self, event: &BridgeEvent) {
        let _ = self.sender.send(event.clone());
    }
}

pub fn init_channel_observer() -> (DynObserver, mpsc::UnboundedReceiver<BridgeEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(ChannelObserver { sender }), receiver)
}
