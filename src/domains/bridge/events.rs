use super::agent::AgentId;
use super::direction::Direction;
use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Gate counters as seen at one observation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub occupants: usize,
    pub active: Option<Direction>,
    pub waiting_north: usize,
    pub waiting_south: usize,
}

impl GateSnapshot {
    pub fn waiting(&self, direction: Direction) -> usize {
        match direction {
            Direction::Northbound => self.waiting_north,
            Direction::Southbound => self.waiting_south,
        }
    }

    /// An idle bridge has no direction, and a bridge with a direction is occupied.
    pub fn is_coherent(&self) -> bool {
        self.active.is_none() == (self.occupants == 0)
    }
}

/// Why an arriving agent parked instead of entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitReason {
    /// The bridge is occupied by the opposite direction.
    OppositeOccupied,
    /// The opposite direction still has waiters to drain.
    YieldToOpposite,
    /// The own direction holds the bridge but the opposite side is queued.
    DrainFirst,
    /// The bridge was just handed to this direction, and the agents released
    /// with it enter before later arrivals.
    ReleasedAhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wake {
    One,
    All,
}

/// A gate transition. `agent` is set when the caller identified itself on
/// entry or exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BridgeEvent {
    Queued {
        agent: Option<AgentId>,
        direction: Direction,
        snapshot: GateSnapshot,
        timestamp: DateTime<Utc>,
    },
    Parked {
        agent: Option<AgentId>,
        direction: Direction,
        reason: WaitReason,
        snapshot: GateSnapshot,
        timestamp: DateTime<Utc>,
    },
    Entered {
        agent: Option<AgentId>,
        direction: Direction,
        snapshot: GateSnapshot,
        timestamp: DateTime<Utc>,
    },
    Exited {
        agent: Option<AgentId>,
        direction: Direction,
        snapshot: GateSnapshot,
        timestamp: DateTime<Utc>,
    },
    Released {
        direction: Direction,
        wake: Wake,
        snapshot: GateSnapshot,
        timestamp: DateTime<Utc>,
    },
}

impl BridgeEvent {
    pub fn direction(&self) -> Direction {
        match self {
            BridgeEvent::Queued { direction, .. }
            | BridgeEvent::Parked { direction, .. }
            | BridgeEvent::Entered { direction, .. }
            | BridgeEvent::Exited { direction, .. }
            | BridgeEvent::Released { direction, .. } => *direction,
        }
    }

    pub fn agent(&self) -> Option<AgentId> {
        match self {
            BridgeEvent::Queued { agent, .. }
            | BridgeEvent::Parked { agent, .. }
            | BridgeEvent::Entered { agent, .. }
            | BridgeEvent::Exited { agent, .. } => *agent,
            BridgeEvent::Released { .. } => None,
        }
    }

    pub fn snapshot(&self) -> &GateSnapshot {
        match self {
            BridgeEvent::Queued { snapshot, .. }
            | BridgeEvent::Parked { snapshot, .. }
            | BridgeEvent::Entered { snapshot, .. }
            | BridgeEvent::Exited { snapshot, .. }
            | BridgeEvent::Released { snapshot, .. } => snapshot,
        }
    }
}

impl DomainEvent for BridgeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BridgeEvent::Queued { .. } => "Queued",
            BridgeEvent::Parked { .. } => "Parked",
            BridgeEvent::Entered { .. } => "Entered",
            BridgeEvent::Exited { .. } => "Exited",
            BridgeEvent::Released { .. } => "Released",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BridgeEvent::Queued { timestamp, .. }
            | BridgeEvent::Parked { timestamp, .. }
            | BridgeEvent::Entered { timestamp, .. }
            | BridgeEvent::Exited { timestamp, .. }
            | BridgeEvent::Released { timestamp, .. } => *timestamp,
        }
    }
}

/// Port for watching gate transitions.
///
/// `on_event` runs while the gate lock is held, so observers see transitions in
/// the exact order they happened. Implementations must not block and must not
/// call back into the gate.
pub trait GateObserver: Send + Sync + 'static {
    fn on_event(&self, event: &BridgeEvent);
}

pub type DynObserver = Arc<dyn GateObserver>;
