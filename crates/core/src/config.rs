use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Deadline substituted when a run is invoked with a zero duration.
pub const DEFAULT_DEADLINE_SECS: u64 = 10;

/// Env var enabling diagnostic mode.
pub const ENV_DIAGNOSTIC: &str = "FUNCGROUPS_DIAGNOSTIC";

/// Env var overriding the default deadline, in whole seconds.
pub const ENV_DEFAULT_DEADLINE_SECS: &str = "FUNCGROUPS_DEFAULT_DEADLINE_SECS";

/// Group-wide configuration shared by every run of a job group.
///
/// Missing fields deserialize to their defaults, so the struct can be
/// embedded in a larger config file with only the keys a caller cares
/// about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Report each job's resolved name and elapsed time, and promote
    /// coordinator events from `debug` to `info` (default: `false`).
    pub diagnostic: bool,
    /// Floor used when `run` is called with a zero deadline (default: `10`).
    pub default_deadline_secs: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            diagnostic: false,
            default_deadline_secs: DEFAULT_DEADLINE_SECS,
        }
    }
}

impl GroupConfig {
    /// Diagnostic-mode config with the default deadline.
    pub fn diagnostic() -> Self {
        Self {
            diagnostic: true,
            ..Self::default()
        }
    }

    /// The default deadline as a [`Duration`].
    ///
    /// A configured value of zero falls back to [`DEFAULT_DEADLINE_SECS`]
    /// so a group can never end up with an instant timeout.
    pub fn default_deadline(&self) -> Duration {
        match self.default_deadline_secs {
            0 => Duration::from_secs(DEFAULT_DEADLINE_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Resolve the deadline for one run: zero means "use the default".
    pub fn effective_deadline(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.default_deadline()
        } else {
            requested
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default |
    /// |------------------------------------|---------|
    /// | `FUNCGROUPS_DIAGNOSTIC`            | `false` |
    /// | `FUNCGROUPS_DEFAULT_DEADLINE_SECS` | `10`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`, which keeps tests away from the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DIAGNOSTIC) {
            config.diagnostic = parse_bool(ENV_DIAGNOSTIC, &raw)?;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_DEADLINE_SECS) {
            config.default_deadline_secs =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    var: ENV_DEFAULT_DEADLINE_SECS,
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
