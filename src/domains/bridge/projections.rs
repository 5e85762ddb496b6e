use super::direction::{Direction, DirectionTally};
use super::events::BridgeEvent;
use serde::{Deserialize, Serialize};

/// Read model folded from gate events. It re-derives bridge occupancy on its own
/// and records every point where the gate's snapshots disagree with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossingLedger {
    pub on_bridge: DirectionTally,
    pub entered: DirectionTally,
    pub exited: DirectionTally,
    pub peak_occupancy: DirectionTally,
    pub direction_changes: usize,
    pub parked: usize,
    pub violations: Vec<String>,
    last_direction: Option<Direction>,
}

impl CrossingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_event(&mut self, event: &BridgeEvent) {
        let snapshot = event.snapshot();
        if !snapshot.is_coherent() {
            self.violations.push(format!(
                "{:?} direction with {} occupants",
                snapshot.active, snapshot.occupants
            ));
        }

        match event {
            BridgeEvent::Entered { direction, snapshot, .. } => {
                let direction = *direction;
                if self.on_bridge.get(direction.opposite()) > 0 {
                    self.violations.push(format!(
                        "{} entered while {} {} agents were on the bridge",
                        direction,
                        self.on_bridge.get(direction.opposite()),
                        direction.opposite()
                    ));
                }
                if snapshot.active != Some(direction) {
                    self.violations.push(format!(
                        "{} entered but the gate reports {:?}",
                        direction, snapshot.active
                    ));
                }

                *self.on_bridge.get_mut(direction) += 1;
                *self.entered.get_mut(direction) += 1;
                let on_bridge = self.on_bridge.get(direction);
                if on_bridge > self.peak_occupancy.get(direction) {
                    *self.peak_occupancy.get_mut(direction) = on_bridge;
                }
                if self.last_direction.is_some_and(|last| last != direction) {
                    self.direction_changes += 1;
                }
                self.last_direction = Some(direction);
            }
            BridgeEvent::Exited { direction, .. } => {
                let counter = self.on_bridge.get_mut(*direction);
                if *counter == 0 {
                    self.violations
                        .push(format!("{} left with no such agent on the bridge", direction));
                } else {
                    *counter -= 1;
                }
                *self.exited.get_mut(*direction) += 1;
            }
            BridgeEvent::Parked { .. } => self.parked += 1,
            BridgeEvent::Queued { .. } | BridgeEvent::Released { .. } => {}
        }

        if matches!(event, BridgeEvent::Entered { .. } | BridgeEvent::Exited { .. })
            && snapshot.occupants != self.on_bridge.total()
        {
            self.violations.push(format!(
                "gate counts {} occupants, ledger counts {}",
                snapshot.occupants,
                self.on_bridge.total()
            ));
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn crossings(&self, direction: Direction) -> usize {
        self.exited.get(direction)
    }
}
