//! Configuration loading and resolution.
//!
//! Every setting resolves as explicit (CLI flag) > environment variable > default.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::protocol::DispatchOptions;
use crate::types::{McpError, McpResult};

pub const ENV_TIMEOUT_MS: &str = "MCP_RELAY_TIMEOUT_MS";
pub const ENV_MAX_FRAME_BYTES: &str = "MCP_RELAY_MAX_FRAME_BYTES";
pub const ENV_QUEUE_DEPTH: &str = "MCP_RELAY_QUEUE_DEPTH";
pub const ENV_ADDR: &str = "MCP_RELAY_ADDR";
pub const ENV_TOKEN: &str = "MCP_RELAY_TOKEN";
pub const ENV_ROOT: &str = "MCP_RELAY_ROOT";
pub const ENV_KV_FILE: &str = "MCP_RELAY_KV_FILE";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_FRAME_BYTES: usize = crate::transport::framing::DEFAULT_MAX_FRAME_BYTES;
pub const DEFAULT_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_ADDR: &str = "127.0.0.1:3100";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub timeout_ms: Option<u64>,
    pub max_frame_bytes: Option<usize>,
    pub queue_depth: Option<usize>,
    pub addr: Option<String>,
    pub token: Option<String>,
    pub root: Option<PathBuf>,
    pub kv_file: Option<PathBuf>,
}

/// Fully resolved relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub handler_timeout: Duration,
    pub max_frame_bytes: usize,
    pub queue_depth: usize,
    pub addr: String,
    pub token: Option<String>,
    pub root: PathBuf,
    pub kv_file: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            addr: DEFAULT_ADDR.to_string(),
            token: None,
            root: PathBuf::from("."),
            kv_file: None,
        }
    }
}

impl RelayConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> McpResult<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<E>(overrides: ConfigOverrides, env: E) -> McpResult<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let timeout_ms = resolve_positive(
            overrides.timeout_ms,
            ENV_TIMEOUT_MS,
            &env,
            DEFAULT_TIMEOUT_MS,
        )?;
        let max_frame_bytes = resolve_positive(
            overrides.max_frame_bytes,
            ENV_MAX_FRAME_BYTES,
            &env,
            DEFAULT_MAX_FRAME_BYTES,
        )?;
        let queue_depth = resolve_positive(
            overrides.queue_depth,
            ENV_QUEUE_DEPTH,
            &env,
            DEFAULT_QUEUE_DEPTH,
        )?;

        let addr = overrides
            .addr
            .or_else(|| non_empty(env(ENV_ADDR)))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let token = overrides.token.or_else(|| non_empty(env(ENV_TOKEN)));
        let root = overrides
            .root
            .or_else(|| non_empty(env(ENV_ROOT)).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        let kv_file = overrides
            .kv_file
            .or_else(|| non_empty(env(ENV_KV_FILE)).map(PathBuf::from));

        Ok(Self {
            handler_timeout: Duration::from_millis(timeout_ms),
            max_frame_bytes,
            queue_depth,
            addr,
            token,
            root,
            kv_file,
        })
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            handler_timeout: self.handler_timeout,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_positive<T, E>(explicit: Option<T>, key: &str, env: &E, default: T) -> McpResult<T>
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
    E: Fn(&str) -> Option<String>,
{
    let (value, source) = match explicit {
        Some(value) => (value, "command line"),
        None => match non_empty(env(key)) {
            Some(raw) => {
                let value = raw.trim().parse::<T>().map_err(|_| {
                    McpError::Config(format!("{key}={raw} is not a valid number"))
                })?;
                (value, key)
            }
            None => return Ok(default),
        },
    };

    if value <= T::default() {
        return Err(McpError::Config(format!(
            "{source}: value must be positive, got {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::resolve_with(ConfigOverrides::default(), env(&[])).unwrap();
        assert_eq!(config.handler_timeout, Duration::from_secs(30));
        assert_eq!(config.max_frame_bytes, 4 * 1024 * 1024);
        assert_eq!(config.queue_depth, 64);
        assert_eq!(config.addr, "127.0.0.1:3100");
        assert!(config.token.is_none());
        assert!(config.kv_file.is_none());
    }

    #[test]
    fn test_env_overrides_default() {
        let config = RelayConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[
                (ENV_TIMEOUT_MS, "250"),
                (ENV_ADDR, "0.0.0.0:9000"),
                (ENV_TOKEN, "abc"),
                (ENV_KV_FILE, "/tmp/kv.json"),
            ]),
        )
        .unwrap();
        assert_eq!(config.handler_timeout, Duration::from_millis(250));
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.kv_file, Some(PathBuf::from("/tmp/kv.json")));
    }

    #[test]
    fn test_explicit_beats_env() {
        let overrides = ConfigOverrides {
            timeout_ms: Some(1000),
            addr: Some("127.0.0.1:1".to_string()),
            ..Default::default()
        };
        let config = RelayConfig::resolve_with(
            overrides,
            env(&[(ENV_TIMEOUT_MS, "250"), (ENV_ADDR, "0.0.0.0:9000")]),
        )
        .unwrap();
        assert_eq!(config.handler_timeout, Duration::from_millis(1000));
        assert_eq!(config.addr, "127.0.0.1:1");
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = RelayConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[(ENV_QUEUE_DEPTH, "lots")]),
        )
        .unwrap_err();
        assert!(matches!(err, McpError::Config(_)));

        let err =
            RelayConfig::resolve_with(ConfigOverrides::default(), env(&[(ENV_TIMEOUT_MS, "0")]))
                .unwrap_err();
        assert!(matches!(err, McpError::Config(_)));

        let overrides = ConfigOverrides {
            max_frame_bytes: Some(0),
            ..Default::default()
        };
        assert!(RelayConfig::resolve_with(overrides, env(&[])).is_err());
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config =
            RelayConfig::resolve_with(ConfigOverrides::default(), env(&[(ENV_TOKEN, "  ")]))
                .unwrap();
        assert!(config.token.is_none());
    }
}
