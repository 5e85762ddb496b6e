use super::direction::Direction;
use super::gate::BridgeGate;
use crate::domains::logger::DomainLogger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out agent ids starting at 1, shared by both directions.
#[derive(Debug)]
pub struct AgentIdAllocator {
    next: AtomicU64,
}

impl AgentIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> AgentId {
        AgentId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AgentIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One crossing as the agent experienced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingRecord {
    pub agent_id: AgentId,
    pub direction: Direction,
    pub crossing_time: Duration,
    pub waited: Duration,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
}

/// A farmer who needs to cross the bridge once in a fixed direction.
#[derive(Debug, Clone)]
pub struct Farmer {
    pub id: AgentId,
    pub direction: Direction,
    pub crossing_time: Duration,
}

impl Farmer {
    pub fn new(id: AgentId, direction: Direction, crossing_time: Duration) -> Self {
        Self {
            id,
            direction,
            crossing_time,
        }
    }

    /// Enters, crosses and leaves. Blocks the calling thread for the whole
    /// crossing, so it belongs on a blocking task.
    pub fn cross(&self, gate: &BridgeGate, logger: &dyn DomainLogger) -> CrossingRecord {
        logger.info(&format!("{} arrived at the bridge.", self));

        let arrived = Instant::now();
        let on_entry = gate.enter_as(self.id, self.direction);
        let waited = arrived.elapsed();
        let entered_at = Utc::now();
        logger.info(&format!(
            "{} entered the bridge. (On Bridge: {})",
            self, on_entry.occupants
        ));

        logger.info(&format!(
            "{} is crossing the bridge ({} ms)...",
            self,
            self.crossing_time.as_millis()
        ));
        std::thread::sleep(self.crossing_time);

        let on_exit = gate.leave_as(self.id, self.direction);
        logger.info(&format!(
            "{} exited the bridge. (On Bridge: {})",
            self, on_exit.occupants
        ));

        CrossingRecord {
            agent_id: self.id,
            direction: self.direction,
            crossing_time: self.crossing_time,
            waited,
            entered_at,
            exited_at: Utc::now(),
        }
    }
}

impl fmt::Display for Farmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", farmer_name(self.direction, Some(self.id)))
    }
}

/// "Northbound Farmer 3", or "Northbound farmer" when the agent is anonymous.
pub fn farmer_name(direction: Direction, agent: Option<AgentId>) -> String {
    match agent {
        Some(id) => format!("{} Farmer {}", direction, id),
        None => format!("{} farmer", direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::init_noop_logger;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = AgentIdAllocator::new();
        assert_eq!(ids.next_id(), AgentId(1));
        assert_eq!(ids.next_id(), AgentId(2));
        assert_eq!(ids.next_id(), AgentId(3));
    }

    #[test]
    fn crossing_leaves_the_gate_idle() {
        let gate = BridgeGate::new();
        let logger = init_noop_logger();
        let farmer = Farmer::new(AgentId(7), Direction::Southbound, Duration::from_millis(5));

        let record = farmer.cross(&gate, logger.as_ref());

        assert_eq!(record.agent_id, AgentId(7));
        assert_eq!(record.direction, Direction::Southbound);
        assert!(record.exited_at >= record.entered_at);
        assert_eq!(gate.snapshot().occupants, 0);
        assert_eq!(farmer.to_string(), "Southbound Farmer 7");
    }
}
