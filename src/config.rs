// Configuration for mdxref.
// Reads from environment variables with sensible defaults.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Default per-category result limit (MDXREF_DEFAULT_LIMIT)
    pub default_limit: usize,

    /// Hard cap on the reference-query limit (MDXREF_REFERENCE_LIMIT_MAX)
    pub reference_limit_max: usize,

    /// Hard cap on the caller-query limit (MDXREF_CALLER_LIMIT_MAX)
    pub caller_limit_max: usize,

    /// Over-collection headroom multiplier per pass (MDXREF_HEADROOM_FACTOR)
    pub headroom_factor: usize,

    /// Database connection pool size (MDXREF_POOL_SIZE)
    pub pool_size: u32,

    /// Database connection pool minimum idle connections (MDXREF_POOL_MIN_IDLE)
    pub pool_min_idle: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_limit: 100,
            reference_limit_max: 500,
            caller_limit_max: 1000,
            headroom_factor: 10,
            pool_size: 10,
            pool_min_idle: 2,
        }
    }
}

fn read_env<T: std::str::FromStr + std::fmt::Display>(name: &str, target: &mut T) {
    if let Ok(val) = env::var(name) {
        if let Ok(parsed) = val.parse() {
            *target = parsed;
        } else {
            eprintln!(
                "mdxref: Warning: Invalid {} value: {}, using default: {}",
                name, val, target
            );
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();
        read_env("MDXREF_DEFAULT_LIMIT", &mut config.default_limit);
        read_env("MDXREF_REFERENCE_LIMIT_MAX", &mut config.reference_limit_max);
        read_env("MDXREF_CALLER_LIMIT_MAX", &mut config.caller_limit_max);
        read_env("MDXREF_HEADROOM_FACTOR", &mut config.headroom_factor);
        read_env("MDXREF_POOL_SIZE", &mut config.pool_size);
        read_env("MDXREF_POOL_MIN_IDLE", &mut config.pool_min_idle);
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }

    /// Clamp a caller-supplied limit for the reference query.
    pub fn clamp_reference_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.reference_limit_max)
    }

    /// Clamp a caller-supplied limit for the caller query.
    pub fn clamp_caller_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.caller_limit_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.reference_limit_max, 500);
        assert_eq!(config.caller_limit_max, 1000);
        assert_eq!(config.headroom_factor, 10);
    }

    #[test]
    fn limits_are_clamped() {
        let config = Config::default();
        assert_eq!(config.clamp_reference_limit(None), 100);
        assert_eq!(config.clamp_reference_limit(Some(9999)), 500);
        assert_eq!(config.clamp_reference_limit(Some(0)), 1);
        assert_eq!(config.clamp_caller_limit(Some(9999)), 1000);
    }
}
