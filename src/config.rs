use std::time::Duration;

use crate::lightx::DEFAULT_API_BASE;
use crate::poller::PollPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub api_base: String,
    pub poll: PollPolicy,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Missing or unparseable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = PollPolicy::default();
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080);
        let api_base = lookup("LIGHTX_API_BASE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let max_attempts = lookup("LIGHTX_POLL_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_attempts);
        let interval = lookup("LIGHTX_POLL_INTERVAL_SECS")
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .unwrap_or(defaults.interval);

        Self { port, api_base, poll: PollPolicy { max_attempts, interval } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_vendor_and_fixed_poll_policy() {
        let s = settings(&[]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.api_base, "https://api.lightxeditor.com/external/api");
        assert_eq!(s.poll, PollPolicy { max_attempts: 5, interval: Duration::from_secs(3) });
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("PORT", "9000"),
            ("LIGHTX_API_BASE", "http://localhost:4000/api"),
            ("LIGHTX_POLL_ATTEMPTS", "8"),
            ("LIGHTX_POLL_INTERVAL_SECS", "0.5"),
        ]);
        assert_eq!(s.port, 9000);
        assert_eq!(s.api_base, "http://localhost:4000/api");
        assert_eq!(s.poll, PollPolicy { max_attempts: 8, interval: Duration::from_millis(500) });
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let s = settings(&[("PORT", "http"), ("LIGHTX_POLL_ATTEMPTS", "0"), ("LIGHTX_POLL_INTERVAL_SECS", "-1")]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.poll, PollPolicy::default());
    }

    #[test]
    fn interval_too_large_for_a_duration_falls_back() {
        let s = settings(&[("LIGHTX_POLL_INTERVAL_SECS", "1e30")]);
        assert_eq!(s.poll.interval, PollPolicy::default().interval);
        let s = settings(&[("LIGHTX_POLL_INTERVAL_SECS", "inf")]);
        assert_eq!(s.poll.interval, PollPolicy::default().interval);
    }
}
