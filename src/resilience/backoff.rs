//! Delays between silent restore attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::SessionConfig;

/// Delay before restore attempt `attempt` (0-based).
///
/// The first attempt runs immediately. Attempt `n` targets
/// `reconnect_base_delay_ms * 2^(n-1)`, capped at `reconnect_max_delay_ms`,
/// and waits a random duration between half the target and the target, so
/// several clients restoring against one wallet do not retry in lockstep.
pub fn restore_delay(config: &SessionConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let target = config
        .reconnect_base_delay_ms
        .saturating_mul(factor)
        .min(config.reconnect_max_delay_ms);

    let floor = target / 2;
    let millis = if target > floor {
        rand::thread_rng().gen_range(floor..=target)
    } else {
        target
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: u64, max: u64) -> SessionConfig {
        SessionConfig {
            reconnect_base_delay_ms: base,
            reconnect_max_delay_ms: max,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_first_attempt_is_immediate() {
        assert_eq!(restore_delay(&SessionConfig::default(), 0), Duration::ZERO);
    }

    #[test]
    fn test_delay_doubles_within_jitter_band() {
        let config = config(250, 2_000);
        for _ in 0..20 {
            let first = restore_delay(&config, 1).as_millis();
            assert!((125..=250).contains(&first), "{first}");

            let second = restore_delay(&config, 2).as_millis();
            assert!((250..=500).contains(&second), "{second}");
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let config = config(250, 2_000);
        let late = restore_delay(&config, 40).as_millis();
        assert!((1_000..=2_000).contains(&late), "{late}");

        // Shift past 64 bits saturates instead of wrapping.
        let huge = restore_delay(&config, 200).as_millis();
        assert!(huge <= 2_000);
    }

    #[test]
    fn test_zero_base_never_waits() {
        assert_eq!(restore_delay(&config(0, 2_000), 3), Duration::ZERO);
    }
}
