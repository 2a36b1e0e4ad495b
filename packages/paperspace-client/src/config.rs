use std::env;
use std::time::Duration;

use crate::error::{PaperspaceError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.paperspace.com/v1";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed-interval polling bounded by a total timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    /// Whether `timeout` is also enforced as elapsed time. When false only
    /// the attempt count bounds the wait.
    pub timed: bool,
}

impl PollSettings {
    /// Poll every `interval` until `timeout` has elapsed, at most
    /// ⌊timeout / interval⌋ times.
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            timed: true,
        }
    }

    /// Poll every `interval`, exactly `max_attempts` times at most, however
    /// long each check takes.
    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            timeout: interval * max_attempts,
            timed: false,
        }
    }

    /// Upper bound on the fetches one wait performs: ⌊timeout / interval⌋,
    /// at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_nanos() / self.interval.as_nanos();
        attempts.clamp(1, u32::MAX as u128) as u32
    }
}

/// Poll cadences for every wait the client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Machine event completion
    pub event: PollSettings,
    /// Machine reaching a lifecycle state after create/start/stop
    pub machine_state: PollSettings,
    /// Machine disappearing after DELETE
    pub machine_delete: PollSettings,
    /// Startup script disappearing after DELETE
    pub startup_script_delete: PollSettings,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            event: PollSettings::new(Duration::from_secs(5), Duration::from_secs(30 * 60)),
            machine_state: PollSettings::new(
                Duration::from_secs(10),
                Duration::from_secs(30 * 60),
            ),
            machine_delete: PollSettings::attempts(Duration::from_secs(10), 30),
            startup_script_delete: PollSettings::attempts(Duration::from_secs(10), 18),
        }
    }
}

impl PollPolicy {
    /// Same cadence for every wait. Handy in tests.
    pub fn uniform(settings: PollSettings) -> Self {
        Self {
            event: settings,
            machine_state: settings,
            machine_delete: settings,
            startup_script_delete: settings,
        }
    }
}

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub http_timeout: Duration,
    pub poll: PollPolicy,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            poll: PollPolicy::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `PAPERSPACE_API_KEY` (or the legacy `PAPERSPACE_PASSWORD`) is required;
    /// `PAPERSPACE_API_URL` and `PAPERSPACE_HTTP_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("PAPERSPACE_API_KEY")
            .or_else(|_| env::var("PAPERSPACE_PASSWORD"))
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PaperspaceError::Config(
                    "PAPERSPACE_API_KEY (or PAPERSPACE_PASSWORD) must be set".into(),
                )
            })?;

        let mut config = Self::new(api_key);

        if let Ok(url) = env::var("PAPERSPACE_API_URL") {
            config.base_url = url;
        }
        if let Ok(secs) = env::var("PAPERSPACE_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PaperspaceError::Config("PAPERSPACE_HTTP_TIMEOUT_SECS must be a valid number".into())
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}
