use crate::common::{ConfigError, ConfigResult};
use crate::domains::bridge::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Supplies how long an agent occupies the bridge. Called once per agent,
/// before the agent is spawned and never under the gate lock.
pub trait CrossingTimer: Send + Sync {
    fn crossing_time(&self, direction: Direction) -> Duration;
}

impl<F> CrossingTimer for F
where
    F: Fn(Direction) -> Duration + Send + Sync,
{
    fn crossing_time(&self, direction: Direction) -> Duration {
        self(direction)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedCrossingTimer(pub Duration);

impl CrossingTimer for FixedCrossingTimer {
    fn crossing_time(&self, _direction: Direction) -> Duration {
        self.0
    }
}

/// Uniformly random crossing times in `min_ms..=max_ms`.
#[derive(Debug)]
pub struct RandomCrossingTimer {
    min_ms: u64,
    max_ms: u64,
    rng: Mutex<StdRng>,
}

impl RandomCrossingTimer {
    pub fn new(min_ms: u64, max_ms: u64, seed: Option<u64>) -> ConfigResult<Self> {
        if min_ms > max_ms {
            return Err(ConfigError::InvalidCrossingWindow { min_ms, max_ms });
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            min_ms,
            max_ms,
            rng: Mutex::new(rng),
        })
    }
}

impl CrossingTimer for RandomCrossingTimer {
    fn crossing_time(&self, _direction: Direction) -> Duration {
        // A panic elsewhere cannot leave the generator in a bad state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}
