use crate::common::ConfigError;
use crate::domains::bridge::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// One agent in the arrival plan: its direction and the pause before the next
/// agent is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub direction: Direction,
    pub delay_after: Duration,
}

impl Arrival {
    pub fn new(direction: Direction, delay_after: Duration) -> Self {
        Self {
            direction,
            delay_after,
        }
    }
}

/// Decides the order in which agents reach the bridge.
pub trait ArrivalSchedule: Send + Sync {
    fn plan(&self, northbound: usize, southbound: usize) -> Vec<Arrival>;
}

/// Every northbound agent, then every southbound agent, with no pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupedArrivals;

impl ArrivalSchedule for GroupedArrivals {
    fn plan(&self, northbound: usize, southbound: usize) -> Vec<Arrival> {
        std::iter::repeat(Direction::Northbound)
            .take(northbound)
            .chain(std::iter::repeat(Direction::Southbound).take(southbound))
            .map(|direction| Arrival::new(direction, Duration::ZERO))
            .collect()
    }
}

/// Random direction picks with a random pause of `0..max_stagger` after each
/// agent. Once one direction runs out, the rest come from the other.
#[derive(Debug, Clone, Copy)]
pub struct StaggeredArrivals {
    pub max_stagger: Duration,
    pub seed: Option<u64>,
}

impl StaggeredArrivals {
    pub fn new(max_stagger: Duration, seed: Option<u64>) -> Self {
        Self { max_stagger, seed }
    }
}

impl ArrivalSchedule for StaggeredArrivals {
    fn plan(&self, northbound: usize, southbound: usize) -> Vec<Arrival> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let max_ms = self.max_stagger.as_millis() as u64;

        let (mut north_left, mut south_left) = (northbound, southbound);
        let mut plan = Vec::with_capacity(northbound + southbound);
        while north_left > 0 || south_left > 0 {
            let pick_north = rng.gen_bool(0.5);
            let direction = if (pick_north && north_left > 0) || south_left == 0 {
                north_left -= 1;
                Direction::Northbound
            } else {
                south_left -= 1;
                Direction::Southbound
            };
            let delay = if max_ms == 0 { 0 } else { rng.gen_range(0..max_ms) };
            plan.push(Arrival::new(direction, Duration::from_millis(delay)));
        }
        plan
    }
}

/// A fixed plan, used as-is. The requested counts are ignored.
#[derive(Debug, Clone, Default)]
pub struct ExplicitArrivals(pub Vec<Arrival>);

impl ArrivalSchedule for ExplicitArrivals {
    fn plan(&self, _northbound: usize, _southbound: usize) -> Vec<Arrival> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalMode {
    #[default]
    Staggered,
    Grouped,
}

impl FromStr for ArrivalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staggered" => Ok(ArrivalMode::Staggered),
            "grouped" => Ok(ArrivalMode::Grouped),
            _ => Err(ConfigError::UnknownArrivalMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(plan: &[Arrival], direction: Direction) -> usize {
        plan.iter().filter(|a| a.direction == direction).count()
    }

    #[test]
    fn grouped_sends_all_north_first() {
        let plan = GroupedArrivals.plan(2, 3);
        let directions: Vec<_> = plan.iter().map(|a| a.direction).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Northbound,
                Direction::Northbound,
                Direction::Southbound,
                Direction::Southbound,
                Direction::Southbound,
            ]
        );
        assert!(plan.iter().all(|a| a.delay_after.is_zero()));
    }

    #[test]
    fn staggered_plan_has_exact_counts_and_bounded_delays() {
        let schedule = StaggeredArrivals::new(Duration::from_millis(500), Some(11));
        let plan = schedule.plan(5, 7);

        assert_eq!(plan.len(), 12);
        assert_eq!(count(&plan, Direction::Northbound), 5);
        assert_eq!(count(&plan, Direction::Southbound), 7);
        assert!(plan.iter().all(|a| a.delay_after < Duration::from_millis(500)));
    }

    #[test]
    fn staggered_plan_is_reproducible_with_a_seed() {
        let schedule = StaggeredArrivals::new(Duration::from_millis(50), Some(3));
        assert_eq!(schedule.plan(4, 4), schedule.plan(4, 4));
    }

    #[test]
    fn zero_stagger_means_no_pauses() {
        let plan = StaggeredArrivals::new(Duration::ZERO, None).plan(3, 3);
        assert!(plan.iter().all(|a| a.delay_after.is_zero()));
    }

    #[test]
    fn arrival_mode_parses() {
        assert_eq!("Grouped".parse::<ArrivalMode>().unwrap(), ArrivalMode::Grouped);
        assert_eq!("staggered".parse::<ArrivalMode>().unwrap(), ArrivalMode::Staggered);
        assert!("random".parse::<ArrivalMode>().is_err());
    }
}
