//! Energy gate and deadline arithmetic

use chrono::{DateTime, Utc};
use kombat_core::EnergyStatus;
use std::time::Duration;

/// Whether the battle loop may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyGate {
    Ready { energy: u32 },
    Depleted { wait: Duration },
}

/// Derives waits from the server's energy refill schedule
///
/// The fallback applies whenever the refill time is unknown: missing or
/// malformed timestamps never turn into an unbounded wait.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClock {
    fallback: Duration,
}

impl ResourceClock {
    pub fn new(fallback: Duration) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> Duration {
        self.fallback
    }

    pub fn assess(&self, status: &EnergyStatus, now: DateTime<Utc>) -> EnergyGate {
        if status.can_battle() {
            return EnergyGate::Ready {
                energy: status.current_energy,
            };
        }

        let wait = match status.next_refill {
            Some(next_refill) => time_until(next_refill, now),
            None => self.fallback,
        };
        EnergyGate::Depleted { wait }
    }
}

/// Time from `now` until `deadline`, zero if the deadline has passed
pub fn time_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn energy(current: u32, next_refill: Option<DateTime<Utc>>) -> EnergyStatus {
        EnergyStatus {
            current_energy: current,
            next_refill,
        }
    }

    #[test]
    fn test_ready_with_any_energy() {
        let clock = ResourceClock::new(Duration::from_secs(30));
        let now = Utc::now();

        for current in [1, 2, 50] {
            let gate = clock.assess(&energy(current, Some(now + TimeDelta::hours(1))), now);
            assert_eq!(gate, EnergyGate::Ready { energy: current });
        }
    }

    #[test]
    fn test_depleted_waits_until_refill() {
        let clock = ResourceClock::new(Duration::from_secs(30));
        let now = Utc::now();

        for delta in [1, 5, 3600, 86_400] {
            let gate = clock.assess(&energy(0, Some(now + TimeDelta::seconds(delta))), now);
            assert_eq!(
                gate,
                EnergyGate::Depleted {
                    wait: Duration::from_secs(delta as u64)
                }
            );
        }
    }

    #[test]
    fn test_past_refill_clamps_to_zero() {
        let clock = ResourceClock::new(Duration::from_secs(30));
        let now = Utc::now();
        let gate = clock.assess(&energy(0, Some(now - TimeDelta::seconds(10))), now);
        assert_eq!(gate, EnergyGate::Depleted { wait: Duration::ZERO });
    }

    #[test]
    fn test_unknown_refill_uses_fallback() {
        let clock = ResourceClock::new(Duration::from_secs(30));
        let gate = clock.assess(&energy(0, None), Utc::now());
        assert_eq!(
            gate,
            EnergyGate::Depleted {
                wait: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn test_time_until() {
        let now = Utc::now();
        assert_eq!(
            time_until(now + TimeDelta::milliseconds(1500), now),
            Duration::from_millis(1500)
        );
        assert_eq!(time_until(now, now), Duration::ZERO);
        assert_eq!(time_until(now - TimeDelta::days(1), now), Duration::ZERO);
    }
}
