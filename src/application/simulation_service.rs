use super::arrival::{ArrivalMode, ArrivalSchedule, GroupedArrivals, StaggeredArrivals};
use super::crossing::{CrossingTimer, RandomCrossingTimer};
use crate::adapters::outbound::init_channel_observer;
use crate::common::{SimulationError, SimulationResult};
use crate::config::Config;
use crate::domains::bridge::{
    AdmissionPolicy, AgentIdAllocator, BridgeEventActor, BridgeGate, CrossingLedger,
    CrossingRecord, Direction, DirectionTally, Farmer,
};
use crate::domains::logger::DynLogger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub policy: AdmissionPolicy,
    pub crossings: DirectionTally,
    pub peak_occupancy: DirectionTally,
    pub direction_changes: usize,
    pub parked_waits: usize,
    pub records: Vec<CrossingRecord>,
    pub elapsed: Duration,
}

impl SimulationReport {
    fn new(
        run_id: Uuid,
        policy: AdmissionPolicy,
        records: Vec<CrossingRecord>,
        ledger: &CrossingLedger,
        elapsed: Duration,
    ) -> Self {
        Self {
            run_id,
            policy,
            crossings: ledger.exited,
            peak_occupancy: ledger.peak_occupancy,
            direction_changes: ledger.direction_changes,
            parked_waits: ledger.parked,
            records,
            elapsed,
        }
    }

    pub fn total_crossings(&self) -> usize {
        self.crossings.total()
    }

    pub fn longest_wait(&self, direction: Direction) -> Duration {
        self.records
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.waited)
            .max()
            .unwrap_or_default()
    }
}

/// Runs one farmer crossing simulation against a fresh [`BridgeGate`].
pub struct SimulationService {
    northbound: usize,
    southbound: usize,
    policy: AdmissionPolicy,
    timer: Arc<dyn CrossingTimer>,
    schedule: Arc<dyn ArrivalSchedule>,
    logger: DynLogger,
}

impl SimulationService {
    pub fn new(
        northbound: usize,
        southbound: usize,
        timer: Arc<dyn CrossingTimer>,
        schedule: Arc<dyn ArrivalSchedule>,
        logger: DynLogger,
    ) -> Self {
        Self {
            northbound,
            southbound,
            policy: AdmissionPolicy::default(),
            timer,
            schedule,
            logger,
        }
    }

    pub fn from_config(config: &Config, logger: DynLogger) -> SimulationResult<Self> {
        // Crossing times and arrival picks draw from separate streams.
        let timer = RandomCrossingTimer::new(
            config.crossing.min_ms,
            config.crossing.max_ms,
            config.arrival.seed,
        )?;
        let schedule: Arc<dyn ArrivalSchedule> = match config.arrival.mode {
            ArrivalMode::Grouped => Arc::new(GroupedArrivals),
            ArrivalMode::Staggered => Arc::new(StaggeredArrivals::new(
                Duration::from_millis(config.arrival.max_stagger_ms),
                config.arrival.seed.map(|seed| seed.wrapping_add(1)),
            )),
        };

        Ok(Self::new(
            config.simulation.northbound_agents,
            config.simulation.southbound_agents,
            Arc::new(timer),
            schedule,
            logger,
        )
        .with_policy(config.simulation.policy))
    }

    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawns every planned agent, waits for all of them to cross, and checks
    /// the event ledger before reporting.
    pub async fn run(&self) -> SimulationResult<SimulationReport> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%run_id, policy = ?self.policy, "starting bridge simulation");

        let (observer, events) = init_channel_observer();
        let gate = Arc::new(BridgeGate::with_policy(self.policy).with_observer(observer));
        let actor = tokio::spawn(BridgeEventActor::new(self.logger.clone(), events).run());

        let ids = AgentIdAllocator::new();
        let plan = self.schedule.plan(self.northbound, self.southbound);
        let mut agents = Vec::with_capacity(plan.len());
        for arrival in plan {
            let id = ids.next_id();
            let gate = gate.clone();
            let timer = self.timer.clone();
            let logger = self.logger.clone();
            agents.push(tokio::task::spawn_blocking(move || {
                let crossing_time = timer.crossing_time(arrival.direction);
                Farmer::new(id, arrival.direction, crossing_time).cross(&gate, logger.as_ref())
            }));

            if !arrival.delay_after.is_zero() {
                tokio::time::sleep(arrival.delay_after).await;
            }
        }

        let mut records = Vec::with_capacity(agents.len());
        for agent in agents {
            records.push(agent.await?);
        }

        // The actor finishes once the observer inside the gate is dropped.
        drop(gate);
        let ledger = actor.await.map_err(SimulationError::EventActor)?;
        if !ledger.is_consistent() {
            return Err(SimulationError::InvariantViolated(ledger.violations.join("; ")));
        }

        let report = SimulationReport::new(run_id, self.policy, records, &ledger, started.elapsed());
        tracing::info!(
            %run_id,
            north = report.crossings.north,
            south = report.crossings.south,
            direction_changes = report.direction_changes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "bridge simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::init_noop_logger;

    #[test]
    fn seeded_config_gives_timer_and_schedule_their_own_streams() {
        let mut config = Config::default();
        config.crossing.min_ms = 0;
        config.crossing.max_ms = 1_000_000;
        config.arrival.max_stagger_ms = 1_000_000;
        config.arrival.seed = Some(9);

        let service = SimulationService::from_config(&config, init_noop_logger()).unwrap();

        let expected_plan = StaggeredArrivals::new(Duration::from_millis(1_000_000), Some(10))
            .plan(4, 4);
        assert_eq!(service.schedule.plan(4, 4), expected_plan);

        let expected_timer = RandomCrossingTimer::new(0, 1_000_000, Some(9)).unwrap();
        let times: Vec<_> = (0..4)
            .map(|_| service.timer.crossing_time(Direction::Northbound))
            .collect();
        let expected: Vec<_> = (0..4)
            .map(|_| expected_timer.crossing_time(Direction::Northbound))
            .collect();
        assert_eq!(times, expected);

        let same_stream = RandomCrossingTimer::new(0, 1_000_000, Some(10)).unwrap();
        let shifted: Vec<_> = (0..4)
            .map(|_| same_stream.crossing_time(Direction::Northbound))
            .collect();
        assert_ne!(times, shifted);
    }
}
