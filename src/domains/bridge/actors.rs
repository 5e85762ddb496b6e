use super::agent::farmer_name;
use super::events::{BridgeEvent, WaitReason, Wake};
use super::projections::CrossingLedger;
use crate::common::DomainEvent;
use crate::domains::logger::DynLogger;
use tokio::sync::mpsc;

/// Consumes gate events off the lock, narrates them and folds them into a
/// [`CrossingLedger`]. Finishes once every sender (the gate's observer) is gone.
pub struct BridgeEventActor {
    logger: DynLogger,
    ledger: CrossingLedger,
    event_receiver: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl BridgeEventActor {
    pub fn new(logger: DynLogger, event_receiver: mpsc::UnboundedReceiver<BridgeEvent>) -> Self {
        Self {
            logger,
            ledger: CrossingLedger::new(),
            event_receiver,
        }
    }

    pub async fn run(mut self) -> CrossingLedger {
        while let Some(event) = self.event_receiver.recv().await {
            self.handle_event(&event);
        }
        self.ledger
    }

    fn handle_event(&mut self, event: &BridgeEvent) {
        let snapshot = event.snapshot();
        tracing::debug!(
            event = event.event_type(),
            direction = %event.direction(),
            occupants = snapshot.occupants,
            waiting_north = snapshot.waiting_north,
            waiting_south = snapshot.waiting_south,
            "bridge event"
        );

        match event {
            BridgeEvent::Parked {
                agent,
                direction,
                reason,
                ..
            } => {
                let who = farmer_name(*direction, *agent);
                let opposite = direction.opposite();
                let line = match reason {
                    WaitReason::OppositeOccupied => format!(
                        "{} is waiting (Current Direction: {}, On Bridge: {}).",
                        who, opposite, snapshot.occupants
                    ),
                    WaitReason::YieldToOpposite => format!(
                        "{} is waiting for waiting {} farmers to cross.",
                        who, opposite
                    ),
                    WaitReason::DrainFirst => format!(
                        "{} is holding back so waiting {} farmers can cross.",
                        who, opposite
                    ),
                    WaitReason::ReleasedAhead => format!(
                        "{} is waiting for released {} farmers to get on first.",
                        who, direction
                    ),
                };
                self.logger.info(&line);
            }
            BridgeEvent::Exited { direction, .. } if snapshot.occupants == 0 => {
                self.logger
                    .info(&format!("Bridge is now empty from {} direction.", direction));
            }
            BridgeEvent::Released {
                direction,
                wake: Wake::All,
                ..
            } => {
                self.logger
                    .info(&format!("Signaling waiting {} farmers.", direction));
            }
            _ => {}
        }

        self.ledger.apply_event(event);
        if !self.ledger.is_consistent() {
            if let Some(violation) = self.ledger.violations.last() {
                self.logger.error(violation);
            }
        }
    }
}
