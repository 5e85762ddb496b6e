use super::agent::AgentId;
use super::direction::Direction;
use super::events::{BridgeEvent, DynObserver, GateSnapshot, WaitReason, Wake};
use crate::common::ConfigError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Condvar, Mutex, MutexGuard};

const POISONED: &str = "bridge gate lock poisoned by an earlier defect";

/// How the gate treats agents arriving while their own direction holds the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Same-direction arrivals join the current flow.
    #[default]
    Classic,
    /// Same-direction arrivals park while the opposite direction has waiters,
    /// so the current flow drains before the bridge turns. When the bridge
    /// empties it is held for the released waiters until they have all entered,
    /// and later arrivals from either side park until then.
    DrainFirst,
}

impl FromStr for AdmissionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "classic" => Ok(AdmissionPolicy::Classic),
            "drain_first" => Ok(AdmissionPolicy::DrainFirst),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Under [`AdmissionPolicy::DrainFirst`], the direction an empty bridge was
/// handed to and how many of its released waiters have yet to enter.
/// Released waiters are the ones holding a ticket below `cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handover {
    direction: Direction,
    cutoff: u64,
    remaining: usize,
}

impl Handover {
    fn covers(&self, direction: Direction, ticket: u64) -> bool {
        self.direction == direction && ticket < self.cutoff
    }
}

#[derive(Debug, Default)]
struct GateState {
    occupants: usize,
    active: Option<Direction>,
    waiting_north: usize,
    waiting_south: usize,
    next_ticket: u64,
    handover: Option<Handover>,
}

impl GateState {
    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn waiting(&self, direction: Direction) -> usize {
        match direction {
            Direction::Northbound => self.waiting_north,
            Direction::Southbound => self.waiting_south,
        }
    }

    fn waiting_mut(&mut self, direction: Direction) -> &mut usize {
        match direction {
            Direction::Northbound => &mut self.waiting_north,
            Direction::Southbound => &mut self.waiting_south,
        }
    }

    fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            occupants: self.occupants,
            active: self.active,
            waiting_north: self.waiting_north,
            waiting_south: self.waiting_south,
        }
    }

    fn assert_coherent(&self) {
        assert_eq!(
            self.active.is_none(),
            self.occupants == 0,
            "bridge direction {:?} disagrees with {} occupants",
            self.active,
            self.occupants
        );
    }

    /// Returns why an agent travelling in `direction` and holding `ticket` may
    /// not enter yet.
    fn blocked_by(
        &self,
        direction: Direction,
        ticket: u64,
        policy: AdmissionPolicy,
    ) -> Option<WaitReason> {
        let opposite = direction.opposite();
        if self.occupants > 0 && self.active == Some(opposite) {
            Some(WaitReason::OppositeOccupied)
        } else if self.active == Some(opposite) && self.waiting(opposite) > 0 {
            Some(WaitReason::YieldToOpposite)
        } else if policy == AdmissionPolicy::DrainFirst {
            match self.handover {
                Some(handover) if handover.direction == opposite => Some(WaitReason::DrainFirst),
                Some(handover) if !handover.covers(direction, ticket) => {
                    Some(WaitReason::ReleasedAhead)
                }
                Some(_) => None,
                None if self.active == Some(direction) && self.waiting(opposite) > 0 => {
                    Some(WaitReason::DrainFirst)
                }
                None => None,
            }
        } else {
            None
        }
    }

    /// Moves one waiter onto the bridge. Returns true when this was the last
    /// released waiter of a handover.
    fn admit(&mut self, direction: Direction, ticket: u64) -> bool {
        *self.waiting_mut(direction) -= 1;
        self.occupants += 1;
        self.active = Some(direction);
        match self.handover.as_mut() {
            Some(handover) if handover.covers(direction, ticket) => {
                handover.remaining = handover.remaining.saturating_sub(1);
                if handover.remaining == 0 {
                    self.handover = None;
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

/// Admission control for a single-lane bridge.
///
/// Any number of agents may be on the bridge as long as they all travel the same
/// way. When the bridge empties, agents queued in the direction that did not just
/// cross are released first.
pub struct BridgeGate {
    state: Mutex<GateState>,
    northbound: Condvar,
    southbound: Condvar,
    policy: AdmissionPolicy,
    observer: Option<DynObserver>,
}

impl BridgeGate {
    pub fn new() -> Self {
        Self::with_policy(AdmissionPolicy::default())
    }

    pub fn with_policy(policy: AdmissionPolicy) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            northbound: Condvar::new(),
            southbound: Condvar::new(),
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: DynObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.lock().snapshot()
    }

    /// Blocks until an agent travelling in `direction` may enter, then enters.
    /// Returns the gate state right after entry.
    ///
    /// Wakes can be spurious or overtaken by other agents, so every guard is
    /// evaluated again after each wake.
    pub fn enter(&self, direction: Direction) -> GateSnapshot {
        self.enter_agent(None, direction)
    }

    /// Same as [`enter`](Self::enter), with `agent` named in the emitted events.
    pub fn enter_as(&self, agent: AgentId, direction: Direction) -> GateSnapshot {
        self.enter_agent(Some(agent), direction)
    }

    /// Removes one agent travelling in `direction` from the bridge and releases
    /// whichever queue should go next. Returns the gate state right after exit.
    pub fn leave(&self, direction: Direction) -> GateSnapshot {
        self.leave_agent(None, direction)
    }

    /// Same as [`leave`](Self::leave), with `agent` named in the emitted events.
    pub fn leave_as(&self, agent: AgentId, direction: Direction) -> GateSnapshot {
        self.leave_agent(Some(agent), direction)
    }

    fn enter_agent(&self, agent: Option<AgentId>, direction: Direction) -> GateSnapshot {
        let mut state = self.lock();
        let ticket = state.take_ticket();
        *state.waiting_mut(direction) += 1;
        self.publish(|| BridgeEvent::Queued {
            agent,
            direction,
            snapshot: state.snapshot(),
            timestamp: Utc::now(),
        });

        while let Some(reason) = state.blocked_by(direction, ticket, self.policy) {
            if reason == WaitReason::YieldToOpposite {
                self.release(&state, direction.opposite(), Wake::One);
            }
            self.publish(|| BridgeEvent::Parked {
                agent,
                direction,
                reason,
                snapshot: state.snapshot(),
                timestamp: Utc::now(),
            });
            state = self.queue(direction).wait(state).expect(POISONED);
        }

        let handover_done = state.admit(direction, ticket);
        state.assert_coherent();
        let snapshot = state.snapshot();
        self.publish(|| BridgeEvent::Entered {
            agent,
            direction,
            snapshot,
            timestamp: Utc::now(),
        });

        // Arrivals held back during the handover re-check against the new state.
        if handover_done && state.waiting(direction) > 0 {
            self.release(&state, direction, Wake::All);
        }
        snapshot
    }

    fn leave_agent(&self, agent: Option<AgentId>, direction: Direction) -> GateSnapshot {
        let mut state = self.lock();
        assert!(
            state.occupants > 0,
            "{} agent left an empty bridge",
            direction
        );
        assert_eq!(
            state.active,
            Some(direction),
            "{} agent left a bridge held by {:?}",
            direction,
            state.active
        );

        state.occupants -= 1;
        if state.occupants == 0 {
            state.active = None;
        }
        let snapshot = state.snapshot();
        self.publish(|| BridgeEvent::Exited {
            agent,
            direction,
            snapshot,
            timestamp: Utc::now(),
        });

        let opposite = direction.opposite();
        // A handover whose released waiters have not all entered yet outlives
        // the bridge emptying.
        let unfinished = if state.occupants == 0 { state.handover } else { None };
        let release = if let Some(handover) = unfinished {
            Some((handover.direction, Wake::All))
        } else if state.occupants == 0 {
            if state.waiting(opposite) > 0 {
                Some((opposite, Wake::All))
            } else if state.waiting(direction) > 0 {
                Some((direction, Wake::All))
            } else {
                None
            }
        } else if state.waiting(direction) > 0 {
            Some((direction, Wake::One))
        } else {
            None
        };

        let emptied = state.occupants == 0 && unfinished.is_none();
        if emptied && self.policy == AdmissionPolicy::DrainFirst {
            let cutoff = state.next_ticket;
            let handover = release.map(|(released, _)| Handover {
                direction: released,
                cutoff,
                remaining: state.waiting(released),
            });
            state.handover = handover;
        }

        if let Some((released, wake)) = release {
            self.release(&state, released, wake);
        }
        state.assert_coherent();
        snapshot
    }

    /// Wakes every parked agent without changing any counter. Each one re-checks
    /// its guards and parks again unless the bridge state lets it in.
    pub fn wake_all(&self) {
        let _state = self.lock();
        self.northbound.notify_all();
        self.southbound.notify_all();
    }

    fn release(&self, state: &GateState, direction: Direction, wake: Wake) {
        match wake {
            Wake::One => self.queue(direction).notify_one(),
            Wake::All => self.queue(direction).notify_all(),
        }
        tracing::trace!(direction = %direction, ?wake, "released waiting agents");
        self.publish(|| BridgeEvent::Released {
            direction,
            wake,
            snapshot: state.snapshot(),
            timestamp: Utc::now(),
        });
    }

    fn queue(&self, direction: Direction) -> &Condvar {
        match direction {
            Direction::Northbound => &self.northbound,
            Direction::Southbound => &self.southbound,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().expect(POISONED)
    }

    fn publish(&self, event: impl FnOnce() -> BridgeEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event());
        }
    }
}

impl Default for BridgeGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BridgeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeGate")
            .field("state", &self.snapshot())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_until(gate: &BridgeGate, condition: impl Fn(&GateSnapshot) -> bool) -> GateSnapshot {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = gate.snapshot();
            if condition(&snapshot) {
                return snapshot;
            }
            assert!(Instant::now() < deadline, "gate never reached expected state: {:?}", snapshot);
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn idle_gate_is_empty_and_directionless() {
        let gate = BridgeGate::new();
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.occupants, 0);
        assert_eq!(snapshot.active, None);
        assert!(snapshot.is_coherent());
    }

    #[test]
    fn same_direction_agents_share_the_bridge() {
        let gate = BridgeGate::new();
        for expected in 1..=3 {
            gate.enter(Direction::Northbound);
            let snapshot = gate.snapshot();
            assert_eq!(snapshot.occupants, expected);
            assert_eq!(snapshot.active, Some(Direction::Northbound));
        }
        for remaining in (0..3).rev() {
            gate.leave(Direction::Northbound);
            assert_eq!(gate.snapshot().occupants, remaining);
        }
        assert_eq!(gate.snapshot().active, None);
    }

    #[test]
    fn direction_resets_to_none_when_last_agent_leaves() {
        let gate = BridgeGate::new();
        gate.enter(Direction::Southbound);
        gate.leave(Direction::Southbound);
        gate.enter(Direction::Northbound);
        assert_eq!(gate.snapshot().active, Some(Direction::Northbound));
        gate.leave(Direction::Northbound);
        assert_eq!(gate.snapshot().active, None);
    }

    #[test]
    fn spurious_wakes_do_not_let_opposite_direction_in() {
        let gate = Arc::new(BridgeGate::new());
        gate.enter(Direction::Northbound);

        let south = {
            let gate = gate.clone();
            thread::spawn(move || {
                gate.enter(Direction::Southbound);
                let snapshot = gate.snapshot();
                gate.leave(Direction::Southbound);
                snapshot
            })
        };
        wait_until(&gate, |s| s.waiting_south == 1);

        for _ in 0..50 {
            gate.wake_all();
            thread::sleep(Duration::from_millis(1));
            let snapshot = gate.snapshot();
            assert_eq!(snapshot.active, Some(Direction::Northbound));
            assert_eq!(snapshot.occupants, 1);
            assert_eq!(snapshot.waiting_south, 1);
        }

        gate.leave(Direction::Northbound);
        let seen_by_south = south.join().expect("southbound agent panicked");
        assert_eq!(seen_by_south.active, Some(Direction::Southbound));
        assert_eq!(gate.snapshot().occupants, 0);
    }

    #[test]
    fn classic_policy_lets_same_direction_join_while_opposite_waits() {
        let gate = Arc::new(BridgeGate::with_policy(AdmissionPolicy::Classic));
        gate.enter(Direction::Northbound);

        let south = {
            let gate = gate.clone();
            thread::spawn(move || {
                gate.enter(Direction::Southbound);
                gate.leave(Direction::Southbound);
            })
        };
        wait_until(&gate, |s| s.waiting_south == 1);

        gate.enter(Direction::Northbound);
        assert_eq!(gate.snapshot().occupants, 2);

        gate.leave(Direction::Northbound);
        gate.leave(Direction::Northbound);
        south.join().expect("southbound agent panicked");
    }

    #[test]
    fn drain_first_parks_same_direction_while_opposite_waits() {
        let gate = Arc::new(BridgeGate::with_policy(AdmissionPolicy::DrainFirst));
        gate.enter(Direction::Northbound);

        let south = {
            let gate = gate.clone();
            thread::spawn(move || gate.enter(Direction::Southbound))
        };
        wait_until(&gate, |s| s.waiting_south == 1);

        let late_north = {
            let gate = gate.clone();
            thread::spawn(move || gate.enter(Direction::Northbound))
        };
        let snapshot = wait_until(&gate, |s| s.waiting_north == 1);
        assert_eq!(snapshot.occupants, 1);

        gate.leave(Direction::Northbound);
        south.join().expect("southbound agent panicked");
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.active, Some(Direction::Southbound));
        assert_eq!(snapshot.waiting_north, 1);

        gate.leave(Direction::Southbound);
        late_north.join().expect("northbound agent panicked");
        assert_eq!(gate.snapshot().active, Some(Direction::Northbound));
        gate.leave(Direction::Northbound);
    }

    #[test]
    #[should_panic(expected = "left an empty bridge")]
    fn leaving_an_empty_bridge_is_a_defect() {
        BridgeGate::new().leave(Direction::Northbound);
    }

    #[test]
    #[should_panic(expected = "left a bridge held by")]
    fn leaving_in_the_wrong_direction_is_a_defect() {
        let gate = BridgeGate::new();
        gate.enter(Direction::Northbound);
        gate.leave(Direction::Southbound);
    }

    #[test]
    fn guards_are_checked_in_order() {
        let occupied_south = GateState {
            occupants: 2,
            active: Some(Direction::Southbound),
            waiting_north: 1,
            waiting_south: 1,
            ..GateState::default()
        };
        assert_eq!(
            occupied_south.blocked_by(Direction::Northbound, 0, AdmissionPolicy::Classic),
            Some(WaitReason::OppositeOccupied)
        );
        assert_eq!(occupied_south.blocked_by(Direction::Southbound, 0, AdmissionPolicy::Classic), None);
        assert_eq!(
            occupied_south.blocked_by(Direction::Southbound, 0, AdmissionPolicy::DrainFirst),
            Some(WaitReason::DrainFirst)
        );

        // Direction still reported while the opposite side has waiters left.
        let handing_over = GateState {
            occupants: 0,
            active: Some(Direction::Southbound),
            waiting_north: 1,
            waiting_south: 2,
            ..GateState::default()
        };
        assert_eq!(
            handing_over.blocked_by(Direction::Northbound, 0, AdmissionPolicy::Classic),
            Some(WaitReason::YieldToOpposite)
        );

        // Southbound tickets 3 and 4 were released; ticket 6 arrived afterwards.
        let reserved_for_south = GateState {
            waiting_north: 1,
            waiting_south: 3,
            next_ticket: 7,
            handover: Some(Handover {
                direction: Direction::Southbound,
                cutoff: 5,
                remaining: 2,
            }),
            ..GateState::default()
        };
        assert_eq!(
            reserved_for_south.blocked_by(Direction::Northbound, 6, AdmissionPolicy::DrainFirst),
            Some(WaitReason::DrainFirst)
        );
        assert_eq!(
            reserved_for_south.blocked_by(Direction::Southbound, 3, AdmissionPolicy::DrainFirst),
            None
        );
        assert_eq!(
            reserved_for_south.blocked_by(Direction::Southbound, 6, AdmissionPolicy::DrainFirst),
            Some(WaitReason::ReleasedAhead)
        );

        let idle = GateState {
            waiting_north: 3,
            waiting_south: 3,
            ..GateState::default()
        };
        for direction in Direction::ALL {
            assert_eq!(idle.blocked_by(direction, 0, AdmissionPolicy::DrainFirst), None);
        }
    }

    #[test]
    fn handover_ends_with_the_last_released_waiter() {
        let mut state = GateState {
            waiting_south: 3,
            next_ticket: 7,
            handover: Some(Handover {
                direction: Direction::Southbound,
                cutoff: 5,
                remaining: 2,
            }),
            ..GateState::default()
        };

        assert!(!state.admit(Direction::Southbound, 3));
        assert_eq!(state.handover.map(|h| h.remaining), Some(1));
        assert!(state.admit(Direction::Southbound, 4));
        assert_eq!(state.handover, None);
        assert_eq!((state.occupants, state.waiting_south), (2, 1));
    }

    #[test]
    fn unfinished_handover_survives_the_bridge_emptying() {
        let handover = Handover {
            direction: Direction::Southbound,
            cutoff: 5,
            remaining: 1,
        };
        let gate = BridgeGate::with_policy(AdmissionPolicy::DrainFirst);
        *gate.lock() = GateState {
            occupants: 1,
            active: Some(Direction::Southbound),
            waiting_north: 2,
            waiting_south: 1,
            next_ticket: 7,
            handover: Some(handover),
        };

        let snapshot = gate.leave(Direction::Southbound);

        assert_eq!(snapshot.occupants, 0);
        assert_eq!(gate.lock().handover, Some(handover));
        assert_eq!(
            gate.lock().blocked_by(Direction::Northbound, 7, AdmissionPolicy::DrainFirst),
            Some(WaitReason::DrainFirst)
        );
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("classic".parse::<AdmissionPolicy>().unwrap(), AdmissionPolicy::Classic);
        assert_eq!("drain-first".parse::<AdmissionPolicy>().unwrap(), AdmissionPolicy::DrainFirst);
        assert!("fifo".parse::<AdmissionPolicy>().is_err());
    }
}
